//! Payment relay: forwards charges to the configured processor.

use std::sync::Arc;

use tracing::info;

use gig_models::{PaymentRequest, UserId};
use gig_payments::{to_minor_units, ChargeRequest, PaymentProcessor};

use crate::error::{ApiError, ApiResult};

/// Relays charges to a payment processor and returns its response as-is.
///
/// Without a processor every charge fails with `ProcessorUnavailable`.
#[derive(Clone)]
pub struct PaymentRelay {
    processor: Option<Arc<dyn PaymentProcessor>>,
}

impl PaymentRelay {
    pub fn new(processor: Option<Arc<dyn PaymentProcessor>>) -> Self {
        Self { processor }
    }

    pub fn is_configured(&self) -> bool {
        self.processor.is_some()
    }

    /// Charge `amount` major units to the payment method on behalf of `user_id`.
    pub async fn charge(&self, user_id: &UserId, request: PaymentRequest) -> ApiResult<serde_json::Value> {
        let payment_method_id = request.payment_method_id.trim();
        if payment_method_id.is_empty() {
            return Err(ApiError::validation("paymentMethodId is required"));
        }
        let amount_minor = to_minor_units(request.amount)?;

        let processor = self.processor.as_ref().ok_or(ApiError::ProcessorUnavailable)?;

        let charge = ChargeRequest {
            amount_minor,
            currency: processor.currency().to_string(),
            payment_method_id: payment_method_id.to_string(),
            user_id: user_id.to_string(),
        };

        let intent = processor.create_payment_intent(&charge).await?;
        info!(
            user_id = %user_id,
            processor = processor.name(),
            amount_minor,
            "Payment relayed"
        );
        Ok(intent)
    }
}
