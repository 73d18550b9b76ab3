//! Payment error types.

use thiserror::Error;

/// Result type for payment operations.
pub type PaymentResult<T> = Result<T, PaymentError>;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment processor is not configured")]
    NotConfigured,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The processor answered with an error; `message` is its own wording.
    #[error("{message}")]
    Processor {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid processor response: {0}")]
    InvalidResponse(String),
}

impl PaymentError {
    /// Build a processor error from a non-success response body.
    ///
    /// Stripe wraps failures as `{"error": {"message", "code", "type"}}`; any
    /// other body is carried as-is.
    pub fn from_processor_response(status: u16, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let error = parsed.as_ref().and_then(|v| v.get("error"));

        let message = error
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| {
                if body.is_empty() {
                    format!("Processor returned HTTP {}", status)
                } else {
                    body.to_string()
                }
            });

        let code = error
            .and_then(|e| e.get("code").or_else(|| e.get("type")))
            .and_then(|c| c.as_str())
            .map(str::to_string);

        Self::Processor { status, code, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stripe_error_body_is_unwrapped() {
        let body = r#"{"error":{"code":"card_declined","message":"Your card was declined.","type":"card_error"}}"#;
        match PaymentError::from_processor_response(402, body) {
            PaymentError::Processor { status, code, message } => {
                assert_eq!(status, 402);
                assert_eq!(code.as_deref(), Some("card_declined"));
                assert_eq!(message, "Your card was declined.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_non_json_body_is_kept_verbatim() {
        let err = PaymentError::from_processor_response(500, "upstream exploded");
        assert_eq!(err.to_string(), "upstream exploded");

        let err = PaymentError::from_processor_response(503, "");
        assert_eq!(err.to_string(), "Processor returned HTTP 503");
    }
}
