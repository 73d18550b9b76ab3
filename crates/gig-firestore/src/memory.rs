//! In-memory document store.
//!
//! Implements the same contract as the Firestore client, including version
//! preconditions and atomic commits, so services run unchanged in local
//! development and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{FirestoreError, FirestoreResult};
use crate::store::{DocumentStore, MAX_BATCH_GET, MAX_COMMIT_WRITES};
use crate::types::{CommitResponse, Document, Fields, ListDocumentsResponse, Write, WriteResult};

const NAME_PREFIX: &str = "projects/memory/databases/(default)/documents";

type Key = (String, String);

#[derive(Default)]
struct Inner {
    docs: BTreeMap<Key, Document>,
    last_stamp: Option<DateTime<Utc>>,
}

impl Inner {
    /// Next version stamp, strictly after every stamp issued before.
    fn next_stamp(&mut self) -> String {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn apply(&mut self, key: Key, fields: Fields, mask: Option<&[String]>, stamp: &str) -> Document {
        let name = format!("{}/{}/{}", NAME_PREFIX, key.0, key.1);
        let doc = self.docs.entry(key).or_insert_with(|| Document {
            name: Some(name),
            fields: Some(Fields::new()),
            create_time: Some(stamp.to_string()),
            update_time: None,
        });

        match mask {
            Some(paths) => {
                let stored = doc.fields.get_or_insert_with(Fields::new);
                for path in paths {
                    match fields.get(path) {
                        Some(value) => {
                            stored.insert(path.clone(), value.clone());
                        }
                        None => {
                            stored.remove(path);
                        }
                    }
                }
            }
            None => doc.fields = Some(fields),
        }
        doc.update_time = Some(stamp.to_string());
        doc.clone()
    }
}

/// Document store held in process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        let inner = self.inner.read().await;
        inner.docs.keys().filter(|(c, _)| c == collection).count()
    }

    fn parse_name(name: &str) -> FirestoreResult<Key> {
        name.strip_prefix(NAME_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(|rest| rest.rsplit_once('/'))
            .map(|(collection, id)| (collection.to_string(), id.to_string()))
            .ok_or_else(|| FirestoreError::invalid_document(format!("Bad document name: {}", name)))
    }

    fn key(collection: &str, doc_id: &str) -> Key {
        (collection.to_string(), doc_id.to_string())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get_document(&self, collection: &str, doc_id: &str) -> FirestoreResult<Option<Document>> {
        let inner = self.inner.read().await;
        Ok(inner.docs.get(&Self::key(collection, doc_id)).cloned())
    }

    async fn create_document(&self, collection: &str, doc_id: &str, fields: Fields) -> FirestoreResult<Document> {
        let mut inner = self.inner.write().await;
        let key = Self::key(collection, doc_id);
        if inner.docs.contains_key(&key) {
            return Err(FirestoreError::AlreadyExists(format!("{}/{}", collection, doc_id)));
        }
        let stamp = inner.next_stamp();
        Ok(inner.apply(key, fields, None, &stamp))
    }

    async fn update_document_with_precondition(
        &self,
        collection: &str,
        doc_id: &str,
        fields: Fields,
        update_mask: Option<Vec<String>>,
        update_time: Option<&str>,
    ) -> FirestoreResult<Document> {
        let mut inner = self.inner.write().await;
        let key = Self::key(collection, doc_id);

        if let Some(expected) = update_time {
            let current = inner.docs.get(&key).and_then(|d| d.update_time.as_deref());
            if current != Some(expected) {
                debug!(collection, doc_id, "Version precondition failed");
                return Err(FirestoreError::PreconditionFailed(format!(
                    "{}/{} changed since {}",
                    collection, doc_id, expected
                )));
            }
        }

        let stamp = inner.next_stamp();
        Ok(inner.apply(key, fields, update_mask.as_deref(), &stamp))
    }

    async fn list_documents(
        &self,
        collection: &str,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> FirestoreResult<ListDocumentsResponse> {
        let inner = self.inner.read().await;
        let offset: usize = match page_token {
            Some(token) => token
                .parse()
                .map_err(|_| FirestoreError::request_failed(format!("Bad page token: {}", token)))?,
            None => 0,
        };
        let limit = page_size.map(|s| s as usize).unwrap_or(usize::MAX);

        let mut all = inner.docs.iter().filter(|((c, _), _)| c == collection).skip(offset);
        let documents: Vec<Document> = all.by_ref().take(limit).map(|(_, d)| d.clone()).collect();
        let next_page_token = all.next().map(|_| (offset + documents.len()).to_string());

        Ok(ListDocumentsResponse {
            documents: (!documents.is_empty()).then_some(documents),
            next_page_token,
        })
    }

    async fn batch_get_documents(&self, full_document_names: Vec<String>) -> FirestoreResult<Vec<Document>> {
        if full_document_names.len() > MAX_BATCH_GET {
            return Err(FirestoreError::request_failed(format!(
                "Batch get exceeds {} document limit",
                MAX_BATCH_GET
            )));
        }

        let inner = self.inner.read().await;
        let mut found = Vec::with_capacity(full_document_names.len());
        for name in &full_document_names {
            if let Some(doc) = inner.docs.get(&Self::parse_name(name)?) {
                found.push(doc.clone());
            }
        }
        Ok(found)
    }

    async fn commit(&self, writes: Vec<Write>) -> FirestoreResult<CommitResponse> {
        if writes.len() > MAX_COMMIT_WRITES {
            return Err(FirestoreError::request_failed(format!(
                "Commit exceeds {} write limit",
                MAX_COMMIT_WRITES
            )));
        }

        let mut inner = self.inner.write().await;

        // Validate every write before touching anything.
        let mut keys = Vec::with_capacity(writes.len());
        for write in &writes {
            let name = match (&write.update, &write.delete) {
                (Some(doc), None) => doc
                    .name
                    .as_deref()
                    .ok_or_else(|| FirestoreError::invalid_document("Write without document name"))?,
                (None, Some(name)) => name.as_str(),
                _ => return Err(FirestoreError::invalid_document("Write must update or delete")),
            };
            let key = Self::parse_name(name)?;
            let existing = inner.docs.get(&key);

            if let Some(pre) = &write.current_document {
                match pre.exists {
                    Some(false) if existing.is_some() => {
                        return Err(FirestoreError::AlreadyExists(name.to_string()));
                    }
                    Some(true) if existing.is_none() => {
                        return Err(FirestoreError::not_found(name.to_string()));
                    }
                    _ => {}
                }
                if let Some(expected) = pre.update_time.as_deref() {
                    if existing.and_then(|d| d.update_time.as_deref()) != Some(expected) {
                        return Err(FirestoreError::PreconditionFailed(name.to_string()));
                    }
                }
            }
            keys.push(key);
        }

        let stamp = inner.next_stamp();
        let mut write_results = Vec::with_capacity(writes.len());
        for (write, key) in writes.into_iter().zip(keys) {
            if let Some(doc) = write.update {
                let mask = write.update_mask.map(|m| m.field_paths);
                inner.apply(key, doc.fields.unwrap_or_default(), mask.as_deref(), &stamp);
                write_results.push(WriteResult {
                    update_time: Some(stamp.clone()),
                });
            } else {
                inner.docs.remove(&key);
                write_results.push(WriteResult { update_time: None });
            }
        }

        Ok(CommitResponse {
            write_results: Some(write_results),
            commit_time: Some(stamp),
        })
    }

    fn full_document_name(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", NAME_PREFIX, collection, doc_id)
    }

    async fn ping(&self) -> FirestoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToFirestoreValue;
    use tokio_test::assert_err;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_firestore_value()))
            .collect()
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MemoryStore::new();
        let created = store
            .create_document("users", "u1", fields(&[("name", "Alice")]))
            .await
            .unwrap();
        assert_eq!(created.id(), Some("u1"));
        assert!(created.update_time.is_some());

        let fetched = store.get_document("users", "u1").await.unwrap().unwrap();
        assert_eq!(fetched.get::<String>("name").as_deref(), Some("Alice"));
        assert!(store.get_document("users", "u2").await.unwrap().is_none());

        let err = assert_err!(store.create_document("users", "u1", Fields::new()).await);
        assert!(matches!(err, FirestoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_version_changes_on_every_write() {
        let store = MemoryStore::new();
        let v1 = store
            .create_document("jobs", "j1", fields(&[("title", "a")]))
            .await
            .unwrap()
            .update_time
            .unwrap();
        let v2 = store
            .update_document_with_precondition("jobs", "j1", fields(&[("title", "b")]), None, Some(&v1))
            .await
            .unwrap()
            .update_time
            .unwrap();
        assert_ne!(v1, v2);

        let err = store
            .update_document_with_precondition("jobs", "j1", fields(&[("title", "c")]), None, Some(&v1))
            .await
            .unwrap_err();
        assert!(err.is_precondition_failed());

        let doc = store.get_document("jobs", "j1").await.unwrap().unwrap();
        assert_eq!(doc.get::<String>("title").as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_precondition_on_missing_document_fails() {
        let store = MemoryStore::new();
        let err = store
            .update_document_with_precondition("jobs", "ghost", Fields::new(), None, Some("v"))
            .await
            .unwrap_err();
        assert!(err.is_precondition_failed());
        assert_eq!(store.count("jobs").await, 0);
    }

    #[tokio::test]
    async fn test_masked_update_keeps_other_fields() {
        let store = MemoryStore::new();
        store
            .create_document("jobs", "j1", fields(&[("title", "a"), ("description", "d")]))
            .await
            .unwrap();
        store
            .update_document_with_precondition(
                "jobs",
                "j1",
                fields(&[("title", "b")]),
                Some(vec!["title".to_string()]),
                None,
            )
            .await
            .unwrap();

        let doc = store.get_document("jobs", "j1").await.unwrap().unwrap();
        assert_eq!(doc.get::<String>("title").as_deref(), Some("b"));
        assert_eq!(doc.get::<String>("description").as_deref(), Some("d"));
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let store = MemoryStore::new();
        store.create_document("user_emails", "taken", Fields::new()).await.unwrap();

        let writes = vec![
            Write::create(store.full_document_name("users", "u1"), fields(&[("name", "A")])),
            Write::create(store.full_document_name("user_emails", "taken"), Fields::new()),
        ];
        let err = store.commit(writes).await.unwrap_err();
        assert!(matches!(err, FirestoreError::AlreadyExists(_)));
        assert!(store.get_document("users", "u1").await.unwrap().is_none());

        let writes = vec![
            Write::create(store.full_document_name("users", "u1"), fields(&[("name", "A")])),
            Write::create(store.full_document_name("user_emails", "free"), Fields::new()),
        ];
        let response = store.commit(writes).await.unwrap();
        assert_eq!(response.write_results.map(|r| r.len()), Some(2));
        assert!(store.get_document("users", "u1").await.unwrap().is_some());
        assert!(store.get_document("user_emails", "free").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_pages_through_collection() {
        let store = MemoryStore::new();
        for id in ["a", "b", "c"] {
            store.create_document("jobs", id, Fields::new()).await.unwrap();
        }
        store.create_document("users", "x", Fields::new()).await.unwrap();

        let first = store.list_documents("jobs", Some(2), None).await.unwrap();
        assert_eq!(first.documents.as_ref().map(|d| d.len()), Some(2));
        let token = first.next_page_token.unwrap();

        let second = store.list_documents("jobs", Some(2), Some(&token)).await.unwrap();
        let ids: Vec<_> = second
            .documents
            .unwrap()
            .iter()
            .filter_map(|d| d.id().map(str::to_string))
            .collect();
        assert_eq!(ids, vec!["c"]);
        assert!(second.next_page_token.is_none());
    }

    #[tokio::test]
    async fn test_batch_get_returns_existing_only() {
        let store = MemoryStore::new();
        store.create_document("users", "u1", Fields::new()).await.unwrap();
        let docs = store
            .batch_get_documents(vec![
                store.full_document_name("users", "u1"),
                store.full_document_name("users", "missing"),
            ])
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id(), Some("u1"));
    }
}
