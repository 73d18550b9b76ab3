//! Request payloads accepted by the HTTP API.
//!
//! Field-level shape checks live here as `validator` rules; cross-cutting
//! rules (role parsing, finite amounts) are enforced by the services.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
    /// "freelancer" or "client"
    pub role: String,
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub portfolio: Option<String>,
}

impl RegisterRequest {
    /// Strip surrounding whitespace from the free-text fields so that
    /// length rules see what will be stored.
    pub fn trimmed(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_string();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    #[validate(range(exclusive_min = 0.0))]
    pub budget: f64,
}

impl CreateJobRequest {
    pub fn trimmed(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBidRequest {
    pub bid_amount: f64,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Major currency units (e.g. dollars).
    pub amount: f64,
    pub payment_method_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let ok = RegisterRequest {
            name: "Alice".into(),
            email: "alice@x.com".into(),
            password: "pw".into(),
            role: "client".into(),
            portfolio: None,
        };
        assert!(ok.validate().is_ok());

        let bad_email = RegisterRequest { email: "not-an-email".into(), ..ok.clone() };
        assert!(bad_email.validate().is_err());

        let empty_name = RegisterRequest { name: String::new(), ..ok.clone() };
        assert!(empty_name.validate().is_err());

        let long_password = RegisterRequest { password: "x".repeat(129), ..ok };
        assert!(long_password.validate().is_err());
    }

    #[test]
    fn test_blank_text_fails_after_trim() {
        let register = RegisterRequest {
            name: "   ".into(),
            email: " alice@x.com ".into(),
            password: "pw".into(),
            role: "client".into(),
            portfolio: None,
        }
        .trimmed();
        assert_eq!(register.email, "alice@x.com");
        assert!(register.validate().is_err());

        let job = CreateJobRequest {
            title: " \t ".into(),
            description: String::new(),
            budget: 10.0,
        }
        .trimmed();
        assert!(job.title.is_empty());
        assert!(job.validate().is_err());

        let padded = CreateJobRequest { title: "  Logo  ".into(), ..job }.trimmed();
        assert_eq!(padded.title, "Logo");
        assert!(padded.validate().is_ok());
    }

    #[test]
    fn test_create_job_budget_must_be_positive() {
        let job = |budget| CreateJobRequest {
            title: "Logo".into(),
            description: String::new(),
            budget,
        };
        assert!(job(100.0).validate().is_ok());
        assert!(job(0.0).validate().is_err());
        assert!(job(-5.0).validate().is_err());
    }

    #[test]
    fn test_camel_case_payloads() {
        let bid: SubmitBidRequest =
            serde_json::from_str(r#"{"bidAmount": 80, "message": "can do"}"#).unwrap();
        assert_eq!(bid.bid_amount, 80.0);
        assert_eq!(bid.message.as_deref(), Some("can do"));

        let pay: PaymentRequest =
            serde_json::from_str(r#"{"amount": 12.5, "paymentMethodId": "pm_card_visa"}"#).unwrap();
        assert_eq!(pay.payment_method_id, "pm_card_visa");

        let job: CreateJobRequest = serde_json::from_str(r#"{"title": "Logo", "budget": 100}"#).unwrap();
        assert!(job.description.is_empty());
    }
}
