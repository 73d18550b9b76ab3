//! Stripe PaymentIntents client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Client;
use tracing::{info, info_span, warn, Instrument};

use crate::error::{PaymentError, PaymentResult};
use crate::types::ChargeRequest;

const DEFAULT_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_CURRENCY: &str = "usd";

/// External payment processor.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Processor name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Currency charges are made in.
    fn currency(&self) -> &str;

    /// Create and confirm a payment, returning the processor's response body
    /// unchanged.
    async fn create_payment_intent(&self, request: &ChargeRequest) -> PaymentResult<serde_json::Value>;
}

/// Stripe client configuration.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    /// API root, overridable for tests and proxies.
    pub api_base: String,
    pub currency: String,
    pub timeout: Duration,
}

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Create config from environment variables.
    ///
    /// Returns `NotConfigured` when `STRIPE_SECRET_KEY` is unset or empty.
    pub fn from_env() -> PaymentResult<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(PaymentError::NotConfigured)?;

        let defaults = Self::new(secret_key);
        Ok(Self {
            api_base: std::env::var("STRIPE_API_BASE")
                .ok()
                .filter(|b| !b.is_empty())
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base.clone()),
            currency: std::env::var("STRIPE_CURRENCY")
                .ok()
                .filter(|c| !c.is_empty())
                .map(|c| c.to_lowercase())
                .unwrap_or(defaults.currency.clone()),
            timeout: std::env::var("STRIPE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            ..defaults
        })
    }
}

/// Stripe PaymentIntents client.
#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    config: StripeConfig,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> PaymentResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("gig-payments/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> PaymentResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    fn record(outcome: &str, status: u16, started: Instant) {
        counter!(
            "gig_payment_requests_total",
            "processor" => "stripe",
            "outcome" => outcome.to_string(),
            "status" => status.to_string()
        )
        .increment(1);
        histogram!("gig_payment_latency_seconds", "processor" => "stripe")
            .record(started.elapsed().as_secs_f64());
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    fn name(&self) -> &'static str {
        "stripe"
    }

    fn currency(&self) -> &str {
        &self.config.currency
    }

    async fn create_payment_intent(&self, request: &ChargeRequest) -> PaymentResult<serde_json::Value> {
        let url = format!("{}/v1/payment_intents", self.config.api_base);
        let amount = request.amount_minor.to_string();
        let span = info_span!("stripe_request", operation = "create_payment_intent", user_id = %request.user_id);

        async {
            let started = Instant::now();
            let response = self
                .http
                .post(&url)
                .basic_auth(&self.config.secret_key, None::<&str>)
                .form(&[
                    ("amount", amount.as_str()),
                    ("currency", request.currency.as_str()),
                    ("payment_method", request.payment_method_id.as_str()),
                    ("confirm", "true"),
                    ("automatic_payment_methods[enabled]", "true"),
                    ("automatic_payment_methods[allow_redirects]", "never"),
                    ("metadata[user_id]", request.user_id.as_str()),
                ])
                .send()
                .await
                .inspect_err(|_| Self::record("network_error", 0, started))?;

            let status = response.status();
            let body = response.text().await?;

            if !status.is_success() {
                Self::record("declined", status.as_u16(), started);
                let err = PaymentError::from_processor_response(status.as_u16(), &body);
                warn!(status = status.as_u16(), "Stripe rejected payment intent: {}", err);
                return Err(err);
            }

            let intent: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
                Self::record("invalid_response", status.as_u16(), started);
                PaymentError::InvalidResponse(e.to_string())
            })?;

            Self::record("ok", status.as_u16(), started);
            info!(
                intent_id = intent.get("id").and_then(|v| v.as_str()).unwrap_or_default(),
                intent_status = intent.get("status").and_then(|v| v.as_str()).unwrap_or_default(),
                amount_minor = request.amount_minor,
                "Created payment intent"
            );
            Ok(intent)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> StripeClient {
        let mut config = StripeConfig::new("sk_test_123");
        config.api_base = server.uri();
        StripeClient::new(config).unwrap()
    }

    fn charge() -> ChargeRequest {
        ChargeRequest {
            amount_minor: 10_000,
            currency: "usd".to_string(),
            payment_method_id: "pm_card_visa".to_string(),
            user_id: "user-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_creates_confirmed_intent_and_relays_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header_exists("authorization"))
            .and(body_string_contains("amount=10000"))
            .and(body_string_contains("payment_method=pm_card_visa"))
            .and(body_string_contains("confirm=true"))
            .and(body_string_contains("metadata%5Buser_id%5D=user-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pi_123",
                "object": "payment_intent",
                "amount": 10000,
                "status": "succeeded"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let intent = client_for(&server).create_payment_intent(&charge()).await.unwrap();
        assert_eq!(intent["id"], "pi_123");
        assert_eq!(intent["status"], "succeeded");
    }

    #[tokio::test]
    async fn test_card_error_is_processor_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": {
                    "code": "card_declined",
                    "message": "Your card was declined.",
                    "type": "card_error"
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).create_payment_intent(&charge()).await.unwrap_err();
        match err {
            PaymentError::Processor { status, message, .. } => {
                assert_eq!(status, 402);
                assert_eq!(message, "Your card was declined.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_config_requires_secret_key() {
        std::env::remove_var("STRIPE_SECRET_KEY");
        assert!(matches!(StripeConfig::from_env(), Err(PaymentError::NotConfigured)));
    }

    #[test]
    #[serial]
    fn test_config_reads_overrides() {
        std::env::set_var("STRIPE_SECRET_KEY", "sk_test_abc");
        std::env::set_var("STRIPE_API_BASE", "http://localhost:12111/");
        std::env::set_var("STRIPE_CURRENCY", "EUR");
        let config = StripeConfig::from_env().unwrap();
        assert_eq!(config.api_base, "http://localhost:12111");
        assert_eq!(config.currency, "eur");
        assert_eq!(config.timeout, Duration::from_secs(30));
        for var in ["STRIPE_SECRET_KEY", "STRIPE_API_BASE", "STRIPE_CURRENCY"] {
            std::env::remove_var(var);
        }
    }
}
