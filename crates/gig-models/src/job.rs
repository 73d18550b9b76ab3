//! Job postings and their embedded bid ledger.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::user::{UserId, UserSummary};

/// Unique identifier for a job posting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An offer by a freelancer, embedded in its job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    /// Bidder
    pub freelancer: UserId,
    pub bid_amount: f64,
    #[serde(default)]
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Bid {
    pub fn new(freelancer: UserId, bid_amount: f64, message: Option<String>) -> Self {
        Self {
            freelancer,
            bid_amount,
            message,
            created_at: Utc::now(),
        }
    }
}

/// A job posting as stored.
///
/// `bids` is ordered by submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub budget: f64,
    /// Owning client
    pub client: UserId,
    #[serde(default)]
    pub bids: Vec<Bid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Build a new job with an empty bid sequence.
    pub fn new(client: UserId, title: impl Into<String>, description: impl Into<String>, budget: f64) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            title: title.into(),
            description: description.into(),
            budget,
            client,
            bids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Every user referenced by this job: the client first, then bidders in order.
    pub fn referenced_users(&self) -> impl Iterator<Item = &UserId> {
        std::iter::once(&self.client).chain(self.bids.iter().map(|b| &b.freelancer))
    }
}

/// A bid with its freelancer resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BidView {
    /// `None` when the bidder no longer exists.
    pub freelancer: Option<UserSummary>,
    pub bid_amount: f64,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A job with its client and bid freelancers resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: JobId,
    pub title: String,
    pub description: String,
    pub budget: f64,
    pub client: Option<UserSummary>,
    pub bids: Vec<BidView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobView {
    /// Resolve a stored job using `lookup` for every user reference.
    pub fn resolve<F>(job: Job, mut lookup: F) -> Self
    where
        F: FnMut(&UserId) -> Option<UserSummary>,
    {
        let client = lookup(&job.client);
        let bids = job
            .bids
            .into_iter()
            .map(|bid| BidView {
                freelancer: lookup(&bid.freelancer),
                bid_amount: bid.bid_amount,
                message: bid.message,
                created_at: bid.created_at,
            })
            .collect();

        Self {
            id: job.id,
            title: job.title,
            description: job.description,
            budget: job.budget,
            client,
            bids,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
