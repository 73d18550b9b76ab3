//! Shared data models for the Gigboard backend.
//!
//! This crate provides Serde-serializable types for:
//! - Users, roles and identity normalization
//! - Jobs and their embedded bid ledger
//! - HTTP request payloads with validation rules

pub mod job;
pub mod requests;
pub mod user;

// Re-export common types
pub use job::{Bid, BidView, Job, JobId, JobView};
pub use requests::{CreateJobRequest, LoginRequest, PaymentRequest, RegisterRequest, SubmitBidRequest};
pub use user::{normalize_email, ParseRoleError, Role, User, UserId, UserSummary};
