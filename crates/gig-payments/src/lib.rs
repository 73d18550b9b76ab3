//! Payment processor client.
//!
//! Charges are forwarded to Stripe as confirmed PaymentIntents. The processor
//! response is returned untouched; no local payment ledger is kept.

pub mod client;
pub mod error;
pub mod types;

pub use client::{PaymentProcessor, StripeClient, StripeConfig};
pub use error::{PaymentError, PaymentResult};
pub use types::{to_minor_units, ChargeRequest};
