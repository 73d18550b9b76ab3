//! Document store abstraction shared by the Firestore client and the
//! in-memory store.

use async_trait::async_trait;

use crate::error::FirestoreResult;
use crate::types::{CommitResponse, Document, Fields, ListDocumentsResponse, Write};

/// Maximum number of documents a single batch get may request.
pub const MAX_BATCH_GET: usize = 100;

/// Maximum number of writes in a single commit.
pub const MAX_COMMIT_WRITES: usize = 500;

/// Document-oriented storage with per-document version stamps.
///
/// Every stored document carries an `update_time` that changes on each write.
/// Passing the last observed value back as a precondition turns a write into
/// a compare-and-set.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs and metrics.
    fn backend(&self) -> &'static str;

    /// Fetch a document, `None` if it does not exist.
    async fn get_document(&self, collection: &str, doc_id: &str) -> FirestoreResult<Option<Document>>;

    /// Create a document; fails with `AlreadyExists` if the id is taken.
    async fn create_document(&self, collection: &str, doc_id: &str, fields: Fields) -> FirestoreResult<Document>;

    /// Update a document.
    ///
    /// With `update_mask` only the listed fields are written. With
    /// `update_time` the write only applies if the stored document still has
    /// that version, otherwise `PreconditionFailed` is returned.
    async fn update_document_with_precondition(
        &self,
        collection: &str,
        doc_id: &str,
        fields: Fields,
        update_mask: Option<Vec<String>>,
        update_time: Option<&str>,
    ) -> FirestoreResult<Document>;

    /// List one page of a collection.
    async fn list_documents(
        &self,
        collection: &str,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> FirestoreResult<ListDocumentsResponse>;

    /// Fetch up to [`MAX_BATCH_GET`] documents by full name. Missing
    /// documents are omitted.
    async fn batch_get_documents(&self, full_document_names: Vec<String>) -> FirestoreResult<Vec<Document>>;

    /// Apply writes atomically: either all preconditions hold and every write
    /// lands, or nothing changes.
    async fn commit(&self, writes: Vec<Write>) -> FirestoreResult<CommitResponse>;

    /// Full resource name used by batch gets and commits.
    fn full_document_name(&self, collection: &str, doc_id: &str) -> String;

    /// Cheap round trip used by readiness checks.
    async fn ping(&self) -> FirestoreResult<()>;
}
