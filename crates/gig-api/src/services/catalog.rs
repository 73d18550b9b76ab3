//! Job catalog: posting jobs and reading them back with users resolved.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};
use validator::Validate;

use gig_firestore::{DocumentStore, JobRepository, UserRepository};
use gig_models::{CreateJobRequest, Job, JobId, JobView, User, UserId};

use crate::error::{ApiError, ApiResult};
use crate::metrics;

#[derive(Clone)]
pub struct JobCatalog {
    jobs: Arc<JobRepository>,
    users: Arc<UserRepository>,
}

impl JobCatalog {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            jobs: Arc::new(JobRepository::new(Arc::clone(&store))),
            users: Arc::new(UserRepository::new(store)),
        }
    }

    /// Post a job owned by `client`. The job starts with no bids.
    pub async fn create_job(&self, client: &UserId, request: CreateJobRequest) -> ApiResult<Job> {
        let request = request.trimmed();
        request.validate()?;
        if !request.budget.is_finite() {
            return Err(ApiError::validation("budget must be a finite number"));
        }

        let job = Job::new(
            client.clone(),
            request.title,
            request.description,
            request.budget,
        );
        self.jobs.create(&job).await?;

        metrics::record_job_created();
        info!(job_id = %job.id, client_id = %client, budget = job.budget, "Job posted");
        Ok(job)
    }

    /// Every job, oldest first, with client and bidders resolved.
    pub async fn list_jobs(&self) -> ApiResult<Vec<JobView>> {
        let mut jobs = self.jobs.list_all().await?;
        jobs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });

        let users = self
            .users
            .get_many(jobs.iter().flat_map(|job| job.referenced_users()))
            .await?;
        debug!(jobs = jobs.len(), users = users.len(), "Resolved job listing");

        Ok(jobs.into_iter().map(|job| resolve(job, &users)).collect())
    }

    /// A single job with users resolved.
    pub async fn get_job(&self, job_id: &JobId) -> ApiResult<JobView> {
        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Job"))?;

        let users = self.users.get_many(job.referenced_users()).await?;
        Ok(resolve(job, &users))
    }
}

fn resolve(job: Job, users: &HashMap<UserId, User>) -> JobView {
    JobView::resolve(job, |id| users.get(id).map(User::summary))
}
