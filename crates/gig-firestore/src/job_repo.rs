//! Job repository.
//!
//! Jobs live at `jobs/{job_id}` with their bids embedded as an array of maps.
//! The document `update_time` is the version stamp used to guard bid appends.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use gig_models::{Bid, Job, JobId, UserId};

use crate::error::{FirestoreError, FirestoreResult};
use crate::store::DocumentStore;
use crate::types::{Document, Fields, FromFirestoreValue, ToFirestoreValue, Value};

const JOBS: &str = "jobs";

/// Page size used when scanning the whole collection.
const LIST_PAGE_SIZE: u32 = 300;

/// A job together with the version it was read at.
#[derive(Debug, Clone)]
pub struct VersionedJob {
    pub job: Job,
    pub update_time: String,
}

/// Repository for job documents.
pub struct JobRepository {
    store: Arc<dyn DocumentStore>,
}

impl JobRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Persist a new job.
    pub async fn create(&self, job: &Job) -> FirestoreResult<()> {
        self.store
            .create_document(JOBS, job.id.as_str(), job_to_fields(job))
            .await?;
        info!(job_id = %job.id, client_id = %job.client, "Created job");
        Ok(())
    }

    /// Get a job by id.
    pub async fn get(&self, job_id: &JobId) -> FirestoreResult<Option<Job>> {
        Ok(self.get_versioned(job_id).await?.map(|v| v.job))
    }

    /// Get a job along with its current version stamp.
    pub async fn get_versioned(&self, job_id: &JobId) -> FirestoreResult<Option<VersionedJob>> {
        let Some(doc) = self.store.get_document(JOBS, job_id.as_str()).await? else {
            return Ok(None);
        };

        let update_time = doc
            .update_time
            .clone()
            .ok_or_else(|| FirestoreError::invalid_document(format!("Job {} has no update time", job_id)))?;

        Ok(Some(VersionedJob {
            job: document_to_job(&doc)?,
            update_time,
        }))
    }

    /// Read every job, following page tokens until the collection is exhausted.
    pub async fn list_all(&self) -> FirestoreResult<Vec<Job>> {
        let mut jobs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .store
                .list_documents(JOBS, Some(LIST_PAGE_SIZE), page_token.as_deref())
                .await?;

            for doc in page.documents.unwrap_or_default() {
                jobs.push(document_to_job(&doc)?);
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = jobs.len(), "Listed jobs");
        Ok(jobs)
    }

    /// Replace the bid sequence, but only if the job is still at
    /// `expected_update_time`.
    ///
    /// Returns the new version stamp. A concurrent writer surfaces as
    /// `PreconditionFailed`.
    pub async fn update_bids(
        &self,
        job_id: &JobId,
        bids: &[Bid],
        updated_at: DateTime<Utc>,
        expected_update_time: &str,
    ) -> FirestoreResult<String> {
        let mut fields = Fields::new();
        fields.insert("bids".to_string(), bids_to_value(bids));
        fields.insert("updated_at".to_string(), updated_at.to_firestore_value());

        let doc = self
            .store
            .update_document_with_precondition(
                JOBS,
                job_id.as_str(),
                fields,
                Some(vec!["bids".to_string(), "updated_at".to_string()]),
                Some(expected_update_time),
            )
            .await?;

        Ok(doc.update_time.unwrap_or_default())
    }
}

// ============================================================================
// Field Conversion Helpers
// ============================================================================

fn job_to_fields(job: &Job) -> Fields {
    let mut fields = Fields::new();
    fields.insert("title".to_string(), job.title.to_firestore_value());
    fields.insert("description".to_string(), job.description.to_firestore_value());
    fields.insert("budget".to_string(), job.budget.to_firestore_value());
    fields.insert("client_id".to_string(), job.client.as_str().to_firestore_value());
    fields.insert("bids".to_string(), bids_to_value(&job.bids));
    fields.insert("created_at".to_string(), job.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), job.updated_at.to_firestore_value());
    fields
}

fn bids_to_value(bids: &[Bid]) -> Value {
    Value::array(
        bids.iter()
            .map(|bid| {
                let mut fields = Fields::new();
                fields.insert("freelancer_id".to_string(), bid.freelancer.as_str().to_firestore_value());
                fields.insert("bid_amount".to_string(), bid.bid_amount.to_firestore_value());
                fields.insert("message".to_string(), bid.message.to_firestore_value());
                fields.insert("created_at".to_string(), bid.created_at.to_firestore_value());
                Value::map(fields)
            })
            .collect(),
    )
}

fn value_to_bid(value: &Value) -> FirestoreResult<Bid> {
    let fields = value
        .as_map()
        .ok_or_else(|| FirestoreError::invalid_document("Bid entry is not a map"))?;

    let freelancer = fields
        .get("freelancer_id")
        .and_then(String::from_firestore_value)
        .ok_or_else(|| FirestoreError::invalid_document("Bid without freelancer_id"))?;

    Ok(Bid {
        freelancer: UserId::from_string(freelancer),
        bid_amount: fields
            .get("bid_amount")
            .and_then(f64::from_firestore_value)
            .unwrap_or_default(),
        message: fields.get("message").and_then(String::from_firestore_value),
        created_at: fields
            .get("created_at")
            .and_then(DateTime::<Utc>::from_firestore_value)
            .unwrap_or_else(Utc::now),
    })
}

fn document_to_job(doc: &Document) -> FirestoreResult<Job> {
    let id = doc
        .id()
        .ok_or_else(|| FirestoreError::invalid_document("Job document has no name"))?;

    let client: String = doc
        .get("client_id")
        .ok_or_else(|| FirestoreError::invalid_document(format!("Job {} has no client_id", id)))?;

    let bids = match doc.field("bids").and_then(Value::as_array) {
        Some(values) => values.iter().map(value_to_bid).collect::<FirestoreResult<Vec<_>>>()?,
        None => Vec::new(),
    };

    let created_at = doc.get::<DateTime<Utc>>("created_at").unwrap_or_else(Utc::now);

    Ok(Job {
        id: JobId::from_string(id),
        title: doc.get("title").unwrap_or_default(),
        description: doc.get("description").unwrap_or_default(),
        budget: doc.get("budget").unwrap_or_default(),
        client: UserId::from_string(client),
        bids,
        created_at,
        updated_at: doc.get("updated_at").unwrap_or(created_at),
    })
}
