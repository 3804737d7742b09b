//! Worker pool
//!
//! Runs independent jobs concurrently under a semaphore bound. Jobs share
//! nothing but the orchestrator's dedup cache and the audit log; two jobs
//! for the same (panel, policy) coalesce there, not here.

use crate::error::PipelineError;
use crate::job::{CancelToken, JobId, JobOutcome, VariantJob};
use crate::pipeline::Pipeline;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Bounded concurrent executor for variant jobs
pub struct WorkerPool {
    pipeline: Arc<Pipeline>,
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    /// Create a pool; concurrency comes from the pipeline configuration
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        let permits = Arc::new(Semaphore::new(pipeline.config().worker_concurrency.max(1)));
        Self { pipeline, permits }
    }

    /// The pipeline this pool drives
    #[inline]
    #[must_use]
    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Run a batch of jobs to completion, in input order
    ///
    /// Each job gets the shared cancel token; cancellation lets in-flight
    /// stages finish and discards their results.
    pub async fn run_all(
        &self,
        jobs: Vec<VariantJob>,
        cancel: &CancelToken,
    ) -> Vec<(JobId, Result<JobOutcome, PipelineError>)> {
        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let id = job.id;
            let pipeline = self.pipeline.clone();
            let permits = self.permits.clone();
            let cancel = cancel.clone();
            let handle = tokio::spawn(async move {
                let permit = permits.acquire_owned().await;
                if permit.is_err() {
                    // Pool shut down while the job waited for a slot
                    return Ok(JobOutcome::Cancelled);
                }
                pipeline.run_job(&job, &cancel).await
            });
            handles.push((id, handle));
        }

        // One entry per input job, even when a task panics
        let mut outcomes = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push((id, outcome)),
                Err(join_error) => {
                    tracing::error!(job = %id, %join_error, "worker task panicked");
                    outcomes.push((id, Err(PipelineError::JobPanicked { job: id })));
                }
            }
        }
        outcomes
    }
}
