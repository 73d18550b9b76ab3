//! Bid ledger: appending bids to a job.
//!
//! The append is a read-modify-write of the job's bid array, committed with
//! the job's `update_time` as a precondition. Losing the race re-reads and
//! re-applies; after `MAX_ATTEMPTS` losses the bid is reported as `Conflict`.
//! A bid is either persisted exactly once or not at all.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use validator::Validate;

use gig_firestore::{DocumentStore, JobRepository, VersionedJob};
use gig_models::{Bid, JobId, SubmitBidRequest, UserId};

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// Append attempts before giving up with `Conflict`.
const MAX_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct BidLedger {
    jobs: Arc<JobRepository>,
}

impl BidLedger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            jobs: Arc::new(JobRepository::new(store)),
        }
    }

    /// Append a bid from `freelancer` to the job. Never creates a job.
    pub async fn submit_bid(
        &self,
        job_id: &JobId,
        freelancer: &UserId,
        request: SubmitBidRequest,
    ) -> ApiResult<Bid> {
        request.validate()?;
        if !request.bid_amount.is_finite() {
            return Err(ApiError::validation("bidAmount must be a finite number"));
        }

        let bid = Bid::new(freelancer.clone(), request.bid_amount, request.message);

        for attempt in 1..=MAX_ATTEMPTS {
            let Some(VersionedJob { mut job, update_time }) = self.jobs.get_versioned(job_id).await? else {
                metrics::record_bid("not_found");
                return Err(ApiError::not_found("Job"));
            };

            job.bids.push(bid.clone());

            match self
                .jobs
                .update_bids(job_id, &job.bids, Utc::now(), &update_time)
                .await
            {
                Ok(_) => {
                    metrics::record_bid("ok");
                    info!(
                        job_id = %job_id,
                        freelancer_id = %freelancer,
                        bid_amount = bid.bid_amount,
                        bids = job.bids.len(),
                        "Bid submitted"
                    );
                    return Ok(bid);
                }
                Err(e) if e.is_precondition_failed() => {
                    metrics::record_bid_retry();
                    warn!(job_id = %job_id, attempt, "Job changed during bid, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        metrics::record_bid("conflict");
        Err(ApiError::conflict(
            "Job was modified by another request, please retry the bid",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gig_firestore::MemoryStore;
    use gig_models::Job;

    async fn setup() -> (BidLedger, JobRepository, Job) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let jobs = JobRepository::new(Arc::clone(&store));
        let job = Job::new(UserId::from("alice"), "Logo", "", 100.0);
        jobs.create(&job).await.unwrap();
        (BidLedger::new(store), jobs, job)
    }

    fn bid(amount: f64, message: &str) -> SubmitBidRequest {
        SubmitBidRequest {
            bid_amount: amount,
            message: Some(message.to_string()),
        }
    }

    #[tokio::test]
    async fn test_single_bid_is_persisted() {
        let (ledger, jobs, job) = setup().await;
        ledger
            .submit_bid(&job.id, &UserId::from("bob"), bid(500.0, "msg"))
            .await
            .unwrap();

        let stored = jobs.get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.bids.len(), 1);
        assert_eq!(stored.bids[0].bid_amount, 500.0);
        assert_eq!(stored.bids[0].message.as_deref(), Some("msg"));
        assert_eq!(stored.bids[0].freelancer, UserId::from("bob"));
    }

    #[tokio::test]
    async fn test_sequential_bids_keep_order() {
        let (ledger, jobs, job) = setup().await;
        ledger
            .submit_bid(&job.id, &UserId::from("bob"), bid(80.0, "first"))
            .await
            .unwrap();
        ledger
            .submit_bid(&job.id, &UserId::from("carol"), bid(90.0, "second"))
            .await
            .unwrap();

        let stored = jobs.get(&job.id).await.unwrap().unwrap();
        let messages: Vec<_> = stored.bids.iter().map(|b| b.message.clone().unwrap()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_created() {
        let (ledger, jobs, _) = setup().await;
        let missing = JobId::from("missing");

        let err = ledger
            .submit_bid(&missing, &UserId::from("bob"), bid(80.0, "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(jobs.get(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_bids_are_never_lost() {
        let (ledger, jobs, job) = setup().await;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = ledger.clone();
                let job_id = job.id.clone();
                tokio::spawn(async move {
                    ledger
                        .submit_bid(&job_id, &UserId::from(format!("f{}", i)), bid(10.0 + i as f64, "bid"))
                        .await
                })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(ApiError::Conflict(_)) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        let stored = jobs.get(&job.id).await.unwrap().unwrap();
        assert!(accepted >= 1);
        assert_eq!(stored.bids.len(), accepted);
    }
}
