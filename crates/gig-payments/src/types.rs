//! Charge request types.

use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, PaymentResult};

/// A charge in minor currency units (cents for USD).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub payment_method_id: String,
    /// Paying user, attached as processor metadata.
    pub user_id: String,
}

/// Convert a major-unit amount to minor units, `round(amount * 100)`.
///
/// Rejects non-finite amounts and anything that rounds to zero or below.
pub fn to_minor_units(amount: f64) -> PaymentResult<i64> {
    if !amount.is_finite() {
        return Err(PaymentError::InvalidAmount(format!("{} is not a finite number", amount)));
    }

    let minor = (amount * 100.0).round();
    if minor <= 0.0 {
        return Err(PaymentError::InvalidAmount(format!("{} must be positive", amount)));
    }
    if minor >= i64::MAX as f64 {
        return Err(PaymentError::InvalidAmount(format!("{} is too large", amount)));
    }

    Ok(minor as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_err;

    #[test]
    fn test_to_minor_units_rounds() {
        assert_eq!(to_minor_units(100.0).unwrap(), 10_000);
        assert_eq!(to_minor_units(19.99).unwrap(), 1_999);
        assert_eq!(to_minor_units(0.005).unwrap(), 1);
    }

    #[test]
    fn test_to_minor_units_rejects_bad_amounts() {
        assert_err!(to_minor_units(0.0));
        assert_err!(to_minor_units(-5.0));
        assert_err!(to_minor_units(0.004));
        assert_err!(to_minor_units(f64::NAN));
        assert_err!(to_minor_units(f64::INFINITY));
        assert_err!(to_minor_units(1e300));
    }
}
