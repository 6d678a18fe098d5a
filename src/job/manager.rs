use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::job::{
    dependencies::JobDependencies,
    pipeline::run_job,
    types::{Job, JobReport, JobState},
};

/// Runs jobs concurrently, bounded by `upload.max_concurrent_jobs`.
#[derive(Clone)]
pub struct JobManager {
    dependencies: Arc<JobDependencies>,
    permits: Arc<Semaphore>,
}

impl JobManager {
    pub fn new(dependencies: JobDependencies) -> Self {
        let max_jobs = dependencies.config.upload.max_concurrent_jobs.max(1);
        Self {
            dependencies: Arc::new(dependencies),
            permits: Arc::new(Semaphore::new(max_jobs)),
        }
    }

    /// Runs all `jobs` at once (up to the concurrency limit) and returns their
    /// reports in submission order.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn run_batch(&self, jobs: Vec<Job>) -> Vec<JobReport> {
        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let job_id = job.id();
            let deps = self.dependencies.clone();
            let permits = self.permits.clone();
            let handle = tokio::spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                log::debug!("Job {} has a slot", job.id());
                run_job(job, &deps).await
            });
            handles.push((job_id, handle));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (job_id, handle) in handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    log::error!("Job {} task failed: {}", job_id, e);
                    let mut report = JobReport::new(job_id);
                    report.error = Some(format!("job task failed: {}", e));
                    report.enter(JobState::Failed);
                    reports.push(report);
                }
            }
        }
        reports
    }
}
