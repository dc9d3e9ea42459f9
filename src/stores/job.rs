use std::sync::Arc;

use log::{info, warn};

use crate::api::client::ApiClient;
use crate::api::models::{ContactId, Job, JobHandle, JobId, JobStatus, NewJob};
use crate::cache::ScopedCache;
use crate::error::{CrmError, Result};

/// Jobs partitioned by status filter; `None` is the unfiltered list.
/// Status transitions belong to the server, so every mutation here
/// invalidates every partition.
pub struct JobStore {
    api: Arc<ApiClient>,
    cache: ScopedCache<Option<JobStatus>, Job>,
}

impl JobStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            cache: ScopedCache::new(),
        }
    }

    /// Submits a job and returns once the server accepted it. Delivery happens
    /// later; poll [`list`](Self::list) for the outcome.
    pub async fn create(&self, message: &str, recipients: &[ContactId]) -> Result<JobHandle> {
        if message.trim().is_empty() {
            return Err(CrmError::validation("message cannot be empty"));
        }
        if recipients.is_empty() {
            return Err(CrmError::validation("a job needs at least one recipient"));
        }
        let _guard = self.cache.lock_scope(&None).await;
        let id = self
            .api
            .create_job(&NewJob {
                message,
                contact_ids: recipients,
            })
            .await?;
        info!("job {:?} accepted for {} recipients", id, recipients.len());
        self.cache.invalidate_all();
        Ok(JobHandle {
            id,
            recipient_count: recipients.len(),
        })
    }

    pub async fn list(&self, status: Option<JobStatus>) -> Result<Vec<Job>> {
        if let Some(jobs) = self.cache.get(&status) {
            return Ok(jobs);
        }
        self.refresh(status).await
    }

    /// Always goes to the server, for polling.
    pub async fn refresh(&self, status: Option<JobStatus>) -> Result<Vec<Job>> {
        let ticket = self.cache.begin_fetch(status);
        let mut jobs = self.api.jobs(status).await?;
        if let Some(status) = status {
            jobs.retain(|j| j.status == status);
        }
        self.cache.complete_fetch(ticket, jobs.clone());
        Ok(jobs)
    }

    /// Only pending jobs are meant to be deleted. The server decides; this
    /// just warns when the cache already says otherwise.
    pub async fn delete(&self, id: JobId) -> Result<()> {
        let known = JobStatus::ALL
            .into_iter()
            .map(Some)
            .chain([None])
            .filter_map(|scope| self.cache.peek(&scope))
            .flatten()
            .find(|j| j.id == id);
        if let Some(job) = known.filter(|j| !j.is_pending()) {
            warn!("deleting job {} which is {}, not PENDING", id, job.status);
        }

        let _guard = self.cache.lock_scope(&None).await;
        self.api.delete_job(id).await?;
        info!("deleted job {}", id);
        self.cache.invalidate_all();
        Ok(())
    }
}
