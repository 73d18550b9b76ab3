//! User repository.
//!
//! Uses a dual-document pattern:
//! - Profile doc at `users/{user_id}` (includes the password hash)
//! - Email index at `user_emails/{email}` pointing back at the user id
//!
//! Both are created in one commit with `exists = false` preconditions, so two
//! registrations racing for the same email cannot both succeed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use gig_models::{normalize_email, Role, User, UserId};

use crate::error::{FirestoreError, FirestoreResult};
use crate::store::{DocumentStore, MAX_BATCH_GET};
use crate::types::{Document, Fields, FromFirestoreValue, ToFirestoreValue, Write};

const USERS: &str = "users";
const USER_EMAILS: &str = "user_emails";

/// A user together with the stored credential hash.
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub user: User,
    pub password_hash: String,
}

/// Repository for user documents and the email uniqueness index.
pub struct UserRepository {
    store: Arc<dyn DocumentStore>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Email index document id for an address.
    fn email_doc_id(email: &str) -> String {
        urlencoding::encode(&normalize_email(email)).into_owned()
    }

    /// Create a user and claim its email atomically.
    ///
    /// Returns `AlreadyExists` if the email is taken.
    pub async fn create(&self, user: &User, password_hash: &str) -> FirestoreResult<()> {
        let user_name = self.store.full_document_name(USERS, user.id.as_str());
        let email_name = self
            .store
            .full_document_name(USER_EMAILS, &Self::email_doc_id(&user.email));

        let writes = vec![
            Write::create(user_name, user_to_fields(user, password_hash)),
            Write::create(email_name, email_index_fields(&user.id)),
        ];

        self.store.commit(writes).await?;

        info!(user_id = %user.id, role = %user.role, "Created user");
        Ok(())
    }

    /// Look up a user by email via the index.
    pub async fn find_by_email(&self, email: &str) -> FirestoreResult<Option<StoredUser>> {
        let Some(index) = self
            .store
            .get_document(USER_EMAILS, &Self::email_doc_id(email))
            .await?
        else {
            return Ok(None);
        };

        let user_id: String = index
            .get("user_id")
            .ok_or_else(|| FirestoreError::invalid_document("Email index without user_id"))?;

        self.get(&UserId::from_string(user_id)).await
    }

    /// Get a user by id.
    pub async fn get(&self, user_id: &UserId) -> FirestoreResult<Option<StoredUser>> {
        match self.store.get_document(USERS, user_id.as_str()).await? {
            Some(doc) => document_to_stored_user(&doc).map(Some),
            None => Ok(None),
        }
    }

    /// Fetch many users at once, keyed by id. Unknown ids are absent from
    /// the result.
    pub async fn get_many<'a, I>(&self, user_ids: I) -> FirestoreResult<HashMap<UserId, User>>
    where
        I: IntoIterator<Item = &'a UserId>,
    {
        let mut names: Vec<String> = user_ids
            .into_iter()
            .map(|id| self.store.full_document_name(USERS, id.as_str()))
            .collect();
        names.sort();
        names.dedup();

        let mut users = HashMap::with_capacity(names.len());
        for chunk in names.chunks(MAX_BATCH_GET) {
            for doc in self.store.batch_get_documents(chunk.to_vec()).await? {
                let stored = document_to_stored_user(&doc)?;
                users.insert(stored.user.id.clone(), stored.user);
            }
        }
        Ok(users)
    }
}

// ============================================================================
// Field Conversion Helpers
// ============================================================================

fn user_to_fields(user: &User, password_hash: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("name".to_string(), user.name.to_firestore_value());
    fields.insert("email".to_string(), user.email.to_firestore_value());
    fields.insert("password_hash".to_string(), password_hash.to_firestore_value());
    fields.insert("role".to_string(), user.role.as_str().to_firestore_value());
    fields.insert("portfolio".to_string(), user.portfolio.to_firestore_value());
    fields.insert("created_at".to_string(), user.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), user.updated_at.to_firestore_value());
    fields
}

fn email_index_fields(user_id: &UserId) -> Fields {
    let mut fields = Fields::new();
    fields.insert("user_id".to_string(), user_id.as_str().to_firestore_value());
    fields.insert("created_at".to_string(), Utc::now().to_firestore_value());
    fields
}

fn document_to_stored_user(doc: &Document) -> FirestoreResult<StoredUser> {
    let id = doc
        .id()
        .ok_or_else(|| FirestoreError::invalid_document("User document has no name"))?;
    let fields = doc
        .fields
        .as_ref()
        .ok_or_else(|| FirestoreError::invalid_document("User document has no fields"))?;

    let get_string = |key: &str| -> String {
        fields.get(key).and_then(String::from_firestore_value).unwrap_or_default()
    };
    let get_time = |key: &str| fields.get(key).and_then(DateTime::<Utc>::from_firestore_value);

    let role: Role = get_string("role")
        .parse()
        .map_err(|e| FirestoreError::invalid_document(format!("User {}: {}", id, e)))?;

    let created_at = get_time("created_at").unwrap_or_else(Utc::now);

    Ok(StoredUser {
        user: User {
            id: UserId::from_string(id),
            name: get_string("name"),
            email: get_string("email"),
            role,
            portfolio: fields.get("portfolio").and_then(String::from_firestore_value),
            created_at,
            updated_at: get_time("updated_at").unwrap_or(created_at),
        },
        password_hash: get_string("password_hash"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn user(name: &str, email: &str, role: Role) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            name: name.to_string(),
            email: normalize_email(email),
            role,
            portfolio: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn repo() -> UserRepository {
        UserRepository::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_and_find_by_email() {
        let repo = repo();
        let alice = user("Alice", "alice@example.com", Role::Client);
        repo.create(&alice, "$argon2id$hash").await.unwrap();

        let found = repo.find_by_email("  Alice@Example.com ").await.unwrap().unwrap();
        assert_eq!(found.user.id, alice.id);
        assert_eq!(found.user.role, Role::Client);
        assert_eq!(found.password_hash, "$argon2id$hash");

        assert!(repo.find_by_email("bob@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_atomically() {
        let store = Arc::new(MemoryStore::new());
        let repo = UserRepository::new(store.clone());
        repo.create(&user("Alice", "alice@example.com", Role::Client), "h1")
            .await
            .unwrap();

        let err = repo
            .create(&user("Impostor", "ALICE@example.com", Role::Freelancer), "h2")
            .await
            .unwrap_err();
        assert!(matches!(err, FirestoreError::AlreadyExists(_)));
        assert_eq!(store.count(USERS).await, 1);
    }

    #[tokio::test]
    async fn test_get_many_skips_unknown_ids() {
        let repo = repo();
        let alice = user("Alice", "alice@example.com", Role::Client);
        let bob = user("Bob", "bob@example.com", Role::Freelancer);
        repo.create(&alice, "h").await.unwrap();
        repo.create(&bob, "h").await.unwrap();

        let ghost = UserId::new();
        let users = repo.get_many([&alice.id, &bob.id, &ghost, &alice.id]).await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[&bob.id].name, "Bob");
        assert!(!users.contains_key(&ghost));
    }

    #[tokio::test]
    async fn test_portfolio_round_trips() {
        let repo = repo();
        let mut bob = user("Bob", "bob@example.com", Role::Freelancer);
        bob.portfolio = Some("https://bob.dev".to_string());
        repo.create(&bob, "h").await.unwrap();

        let found = repo.get(&bob.id).await.unwrap().unwrap();
        assert_eq!(found.user.portfolio.as_deref(), Some("https://bob.dev"));
    }
}
