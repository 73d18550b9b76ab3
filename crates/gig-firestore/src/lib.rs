//! Document storage for the Gigboard backend.
//!
//! This crate provides:
//! - The `DocumentStore` abstraction with version-stamped documents
//! - A Firestore REST client (service account or emulator)
//! - An in-memory store for development and tests
//! - Typed repositories for users and jobs

pub mod client;
pub mod error;
pub mod job_repo;
pub mod memory;
pub mod metrics;
pub mod retry;
pub mod store;
pub mod token_cache;
pub mod types;
pub mod user_repo;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use job_repo::{JobRepository, VersionedJob};
pub use memory::MemoryStore;
pub use retry::RetryConfig;
pub use store::DocumentStore;
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
pub use user_repo::{StoredUser, UserRepository};
