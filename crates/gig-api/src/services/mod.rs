//! Business logic services.

pub mod catalog;
pub mod credentials;
pub mod ledger;
pub mod payments;
pub mod tokens;

pub use catalog::JobCatalog;
pub use credentials::CredentialStore;
pub use ledger::BidLedger;
pub use payments::PaymentRelay;
pub use tokens::{Claims, TokenIssuer};
