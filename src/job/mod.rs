//! Job orchestration: one pipeline run per job, batches run concurrently.

mod dependencies;
mod manager;
mod pipeline;
mod types;
#[cfg(test)]
mod tests;

pub use dependencies::JobDependencies;
pub use manager::JobManager;
pub use pipeline::run_job;
pub use types::{
    ClipboardContent, Job, JobError, JobKind, JobReport, JobState, OutputDestination,
    UploadOutcome, UploadResult, UploaderSelection,
};
