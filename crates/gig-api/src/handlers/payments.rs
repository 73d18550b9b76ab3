//! Payment handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use gig_models::PaymentRequest;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub success: bool,
    /// Processor response, unmodified.
    pub payment_intent: serde_json::Value,
}

/// Charge the caller's payment method.
pub async fn pay(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<PaymentRequest>,
) -> ApiResult<Json<PaymentResponse>> {
    let payment_intent = state.payments.charge(&user.user_id, request).await?;

    Ok(Json(PaymentResponse {
        success: true,
        payment_intent,
    }))
}
