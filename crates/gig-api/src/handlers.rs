//! Request handlers.

pub mod auth;
pub mod health;
pub mod jobs;
pub mod payments;

pub use auth::*;
pub use health::*;
pub use jobs::*;
pub use payments::*;
