//! The per-job state machine.
//!
//! `Created -> Acquiring -> PostProcessing -> Persisting -> Uploading -> Publishing
//! -> Completed`. Only acquisition can end a job early (`Canceled` or `Failed`);
//! every later problem is recorded on the report and the job still completes.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use futures::future::join_all;
use image::RgbaImage;
use log::{error, info, warn};
use tokio::task;

use crate::artifact::{Artifact, ContentKind};
use crate::capture::ClipboardData;
use crate::job::dependencies::JobDependencies;
use crate::job::types::{
    ClipboardContent, Job, JobError, JobKind, JobReport, JobState, OutputDestination,
    UploadResult,
};
use crate::process::{ProcessedImage, decode_image};
use crate::upload::{Uploader, is_valid_link};

/// Content as it comes out of acquisition.
enum Acquired {
    /// Encoded image bytes from a screenshot or the clipboard.
    Image(Vec<u8>),
    Text(String),
    /// A file that already exists on disk.
    File(Artifact),
}

/// Content after post-processing, before encoding.
enum Prepared {
    Image {
        image: RgbaImage,
        original: Vec<u8>,
    },
    /// Bytes that could not be decoded; kept as they are.
    RawImage(Vec<u8>),
    Text(String),
    File(Artifact),
}

/// Runs `job` to a terminal state. Never fails; the report carries the outcome.
pub async fn run_job(job: Job, deps: &JobDependencies) -> JobReport {
    let mut report = JobReport::new(job.id());
    info!(
        "Job {} started ({:?}, created {})",
        job.id(),
        job.kind,
        job.created_at.format("%H:%M:%S")
    );

    report.enter(JobState::Acquiring);
    let acquired = match acquire(&job, deps, &mut report).await {
        Ok(acquired) => acquired,
        Err(JobError::Canceled(reason)) => {
            info!("Job {} canceled: {}", job.id(), reason);
            report.error = Some(reason);
            report.enter(JobState::Canceled);
            return report;
        }
        Err(err) => {
            error!("Job {} failed: {}", job.id(), err);
            report.error = Some(err.to_string());
            report.enter(JobState::Failed);
            return report;
        }
    };

    // Names and watermarks use the moment the content was taken, after any delay.
    let acquired_at = Local::now();

    report.enter(JobState::PostProcessing);
    let prepared = post_process(acquired, acquired_at, deps, &mut report).await;

    report.enter(JobState::Persisting);
    let artifact = persist(prepared, acquired_at, &job, deps, &mut report).await;

    report.enter(JobState::Uploading);
    let targets = fan_out_targets(&job, &artifact, &mut report);
    report.uploads = upload_all(&targets, &artifact, deps).await;

    report.enter(JobState::Publishing);
    publish(&job, &artifact, deps, &mut report).await;

    report.enter(JobState::Completed);
    info!(
        "Job {} completed: {} upload(s), {} warning(s)",
        job.id(),
        report.uploads.len(),
        report.warnings.len()
    );
    report
}

async fn acquire(
    job: &Job,
    deps: &JobDependencies,
    report: &mut JobReport,
) -> Result<Acquired, JobError> {
    match &job.kind {
        JobKind::File(path) => read_file(path.clone()).await,
        JobKind::Clipboard => match deps.clipboard.read().await? {
            ClipboardData::Image { data, .. } => Ok(Acquired::Image(data)),
            ClipboardData::Text(text) if text.trim().is_empty() => {
                Err(JobError::Acquisition("clipboard is empty".into()))
            }
            ClipboardData::Text(text) => Ok(Acquired::Text(text)),
            ClipboardData::Files(mut files) => {
                if files.is_empty() {
                    return Err(JobError::Acquisition("clipboard is empty".into()));
                }
                if files.len() > 1 {
                    report.warn(format!(
                        "Clipboard holds {} files; only {} is uploaded",
                        files.len(),
                        files[0].display()
                    ));
                }
                read_file(files.swap_remove(0)).await
            }
            ClipboardData::Empty => Err(JobError::Acquisition("clipboard is empty".into())),
        },
        kind => {
            let Some(capture_type) = kind.capture_type() else {
                return Err(JobError::Acquisition(format!("{:?} is not a capture", kind)));
            };
            if !job.capture_delay.is_zero() {
                info!("Waiting {:?} before capture", job.capture_delay);
                tokio::time::sleep(job.capture_delay).await;
            }
            let bytes = deps.source.capture(capture_type).await?;
            if bytes.is_empty() {
                return Err(JobError::Acquisition("capture returned no data".into()));
            }
            Ok(Acquired::Image(bytes))
        }
    }
}

async fn read_file(path: PathBuf) -> Result<Acquired, JobError> {
    let data = tokio::fs::read(&path)
        .await
        .map_err(|e| JobError::Acquisition(format!("cannot read {}: {}", path.display(), e)))?;
    Ok(Acquired::File(Artifact::from_file(&path, data)))
}

/// Runs the processor over image content. Image files that no stage changed stay as
/// they are on disk.
async fn post_process(
    acquired: Acquired,
    timestamp: DateTime<Local>,
    deps: &JobDependencies,
    report: &mut JobReport,
) -> Prepared {
    match acquired {
        Acquired::Text(text) => Prepared::Text(text),
        Acquired::Image(bytes) => match run_processor(bytes, timestamp, deps, report).await {
            (Some(processed), original) => Prepared::Image {
                image: processed.image,
                original,
            },
            (None, original) => Prepared::RawImage(original),
        },
        Acquired::File(mut artifact) if artifact.kind() == ContentKind::Image => {
            let bytes = std::mem::take(&mut artifact.data);
            match run_processor(bytes, timestamp, deps, report).await {
                (Some(processed), original) if !processed.applied.is_empty() => {
                    Prepared::Image {
                        image: processed.image,
                        original,
                    }
                }
                (_, original) => {
                    artifact.data = original;
                    Prepared::File(artifact)
                }
            }
        }
        Acquired::File(artifact) => Prepared::File(artifact),
    }
}

/// Decodes `bytes` and runs every stage. The image is `None` when decoding or the
/// processing task failed; the original bytes always come back.
async fn run_processor(
    bytes: Vec<u8>,
    timestamp: DateTime<Local>,
    deps: &JobDependencies,
    report: &mut JobReport,
) -> (Option<ProcessedImage>, Vec<u8>) {
    let shared = Arc::new(bytes);
    let input = Arc::clone(&shared);
    let processor = Arc::clone(&deps.processor);
    let outcome = task::spawn_blocking(move || {
        decode_image(&input).map(|image| processor.process(image, timestamp))
    })
    .await;
    let original = Arc::try_unwrap(shared).unwrap_or_else(|shared| shared.as_ref().clone());

    let processed = match outcome {
        Ok(Ok(mut processed)) => {
            for warning in std::mem::take(&mut processed.warnings) {
                report.warn(warning);
            }
            Some(processed)
        }
        Ok(Err(e)) => {
            report.warn(format!("Image could not be decoded, skipping post-processing: {}", e));
            None
        }
        Err(e) => {
            report.warn(format!("Post-processing task failed, keeping original image: {}", e));
            None
        }
    };
    (processed, original)
}

/// Encodes and names the artifact, and writes it when LocalDisk is requested.
async fn persist(
    prepared: Prepared,
    timestamp: DateTime<Local>,
    job: &Job,
    deps: &JobDependencies,
    report: &mut JobReport,
) -> Artifact {
    let artifact = match prepared {
        Prepared::File(artifact) => {
            report.local_path = artifact.source_path.clone();
            return artifact;
        }
        Prepared::Text(text) => deps.store.prepare_text(text, timestamp),
        Prepared::RawImage(bytes) => deps.store.prepare_raw_image(bytes, timestamp),
        Prepared::Image { image, original } => encode(image, original, timestamp, deps, report).await,
    };

    if !job.wants(OutputDestination::LocalDisk) {
        return artifact;
    }

    let directory = match artifact.kind() {
        ContentKind::Text => deps.config.text_dir(),
        _ => deps.config.images_dir(),
    };
    let store = deps.store.clone();
    let to_save = artifact.clone();
    let overwrite = job.overwrite;
    match task::spawn_blocking(move || store.save(&to_save, &directory, overwrite)).await {
        Ok(Ok(path)) => report.local_path = Some(path),
        Ok(Err(e)) => report.warn(format!("Could not save {}: {}", artifact.file_name, e)),
        Err(e) => report.warn(format!("Save task failed: {}", e)),
    }
    artifact
}

async fn encode(
    image: RgbaImage,
    original: Vec<u8>,
    timestamp: DateTime<Local>,
    deps: &JobDependencies,
    report: &mut JobReport,
) -> Artifact {
    let store = deps.store.clone();
    match task::spawn_blocking(move || store.prepare_image(&image, timestamp)).await {
        Ok(Ok(artifact)) => artifact,
        Ok(Err(e)) => {
            report.warn(format!("Encoding failed, keeping captured bytes: {}", e));
            deps.store.prepare_raw_image(original, timestamp)
        }
        Err(e) => {
            report.warn(format!("Encoding task failed, keeping captured bytes: {}", e));
            deps.store.prepare_raw_image(original, timestamp)
        }
    }
}

/// Adapters to call, in result order: remote adapters for the artifact's kind, then
/// the shared folder.
fn fan_out_targets(job: &Job, artifact: &Artifact, report: &mut JobReport) -> Vec<Arc<dyn Uploader>> {
    let selection = &job.uploaders;
    let mut targets = Vec::new();

    if job.wants(OutputDestination::RemoteHost) {
        let adapters = match artifact.kind() {
            ContentKind::Image => &selection.image,
            ContentKind::Text => {
                let is_link = artifact.as_text().is_some_and(is_valid_link);
                if is_link && !selection.link.is_empty() {
                    &selection.link
                } else {
                    &selection.text
                }
            }
            ContentKind::File => &selection.file,
        };
        if adapters.is_empty() {
            report.warn(format!(
                "Remote host requested but no {} uploader is selected",
                artifact.kind().label()
            ));
        }
        targets.extend(adapters.iter().cloned());
    }

    if job.wants(OutputDestination::SharedFolder) {
        match &selection.shared_folder {
            Some(folder) => targets.push(Arc::clone(folder)),
            None => report.warn("Shared folder requested but none is configured"),
        }
    }

    targets
}

/// Calls every adapter concurrently. Results keep the order of `targets`.
async fn upload_all(
    targets: &[Arc<dyn Uploader>],
    artifact: &Artifact,
    deps: &JobDependencies,
) -> Vec<UploadResult> {
    let calls = targets.iter().map(|uploader| async move {
        match deps.policy.run(uploader.as_ref(), artifact).await {
            Ok(location) => {
                info!("{} -> {}", uploader.name(), location);
                UploadResult::success(uploader.name(), location)
            }
            Err(e) => UploadResult::error(uploader.name(), e.to_string()),
        }
    });
    join_all(calls).await
}

async fn publish(job: &Job, artifact: &Artifact, deps: &JobDependencies, report: &mut JobReport) {
    if job.wants(OutputDestination::Clipboard)
        && let Err(e) = set_clipboard(job.clipboard_content, artifact, deps, report).await
    {
        report.warn(format!("Clipboard update failed: {}", e));
    }

    if job.wants(OutputDestination::Printer) {
        report.warn("Printing is not supported; printer output skipped");
    }

    if let Err(e) = deps.sink.display_results(report).await {
        warn!("Could not display results for job {}: {}", job.id(), e);
    }
}

enum ClipboardPayload {
    Text(String),
    Image { data: Vec<u8>, mime_type: String },
}

async fn set_clipboard(
    content: ClipboardContent,
    artifact: &Artifact,
    deps: &JobDependencies,
    report: &mut JobReport,
) -> Result<(), String> {
    let local = report.local_path.as_ref().map(|p| p.display().to_string());
    let payload = match content {
        ClipboardContent::Data => match (artifact.kind(), artifact.as_text()) {
            (ContentKind::Image, _) => Some(ClipboardPayload::Image {
                data: artifact.data.clone(),
                mime_type: artifact.mime_type.clone(),
            }),
            (_, Some(text)) => Some(ClipboardPayload::Text(text.to_string())),
            _ => local.map(ClipboardPayload::Text),
        },
        ClipboardContent::Local => local.map(ClipboardPayload::Text),
        ClipboardContent::Remote => report
            .first_link()
            .map(str::to_string)
            .or(local)
            .map(ClipboardPayload::Text),
    };

    let Some(payload) = payload else {
        report.warn(format!(
            "Nothing to put on the clipboard for {}",
            content.label()
        ));
        return Ok(());
    };

    let sink = Arc::clone(&deps.sink);
    task::spawn_blocking(move || match payload {
        ClipboardPayload::Text(text) => sink.set_clipboard_text(&text),
        ClipboardPayload::Image { data, mime_type } => sink.set_clipboard_image(&data, &mime_type),
    })
    .await
    .map_err(|e| e.to_string())?
    .map_err(|e| e.to_string())
}
