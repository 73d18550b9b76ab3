//! Credential store: registration and password verification.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::Utc;
use rand_core::OsRng;
use tracing::{info, warn};
use validator::Validate;

use gig_firestore::{DocumentStore, FirestoreError, UserRepository};
use gig_models::{normalize_email, RegisterRequest, Role, User, UserId};

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// Verified against when the email is unknown, so both failure paths pay
/// for one Argon2 run. Matches no password.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Persists users with Argon2id password hashes and verifies logins.
#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<UserRepository>,
    params: Params,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_params(store, Params::default())
    }

    /// Use explicit Argon2 cost parameters for new hashes.
    pub fn with_params(store: Arc<dyn DocumentStore>, params: Params) -> Self {
        Self {
            users: Arc::new(UserRepository::new(store)),
            params,
        }
    }

    /// Register a new user. Fails with `DuplicateIdentity` if the email is
    /// already taken.
    pub async fn register(&self, request: RegisterRequest) -> ApiResult<User> {
        let request = request.trimmed();
        request.validate()?;
        let role: Role = request
            .role
            .parse()
            .map_err(|e: gig_models::ParseRoleError| ApiError::validation(e.to_string()))?;

        let password_hash = self.hash_password(request.password).await?;

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            name: request.name,
            email: normalize_email(&request.email),
            role,
            portfolio: request.portfolio.filter(|p| !p.trim().is_empty()),
            created_at: now,
            updated_at: now,
        };

        match self.users.create(&user, &password_hash).await {
            Ok(()) => {
                metrics::record_auth_event("register", "ok");
                info!(user_id = %user.id, role = %user.role, "Registered user");
                Ok(user)
            }
            Err(FirestoreError::AlreadyExists(_)) => {
                metrics::record_auth_event("register", "duplicate");
                Err(ApiError::DuplicateIdentity("Email is already registered".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verify an email and password pair, returning the user on success.
    pub async fn verify(&self, email: &str, password: &str) -> ApiResult<User> {
        let stored = self.users.find_by_email(email).await?;

        let (hash, user) = match stored {
            Some(stored) => (stored.password_hash, Some(stored.user)),
            None => (DUMMY_HASH.to_string(), None),
        };

        let matches = verify_password(password.to_string(), hash).await?;

        match user {
            Some(user) if matches => {
                metrics::record_auth_event("login", "ok");
                info!(user_id = %user.id, "User logged in");
                Ok(user)
            }
            _ => {
                metrics::record_auth_event("login", "rejected");
                warn!("Login rejected");
                Err(ApiError::InvalidCredentials)
            }
        }
    }

    /// Get a user's public projection.
    pub async fn get(&self, user_id: &UserId) -> ApiResult<User> {
        self.users
            .get(user_id)
            .await?
            .map(|stored| stored.user)
            .ok_or_else(|| ApiError::not_found("User"))
    }

    async fn hash_password(&self, password: String) -> ApiResult<String> {
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))
        })
        .await
        .map_err(|e| ApiError::internal(format!("Hashing task failed: {}", e)))?
    }
}

/// Check a password against a PHC string. Cost parameters come from the hash.
async fn verify_password(password: String, hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| ApiError::internal(format!("Stored password hash is malformed: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| ApiError::internal(format!("Verification task failed: {}", e)))?
}
