//! Axum HTTP API server for the Gigboard marketplace.
//!
//! This crate provides:
//! - Registration, login and session tokens
//! - Job posting, listing and bidding
//! - Payment relay to the configured processor
//! - Rate limiting, security headers and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use auth::AuthUser;
pub use config::{ApiConfig, StoreBackend};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
