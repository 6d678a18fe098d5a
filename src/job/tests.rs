use std::{
    io::Cursor,
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{Local, TimeZone};
use image::{ImageFormat, Rgba, RgbaImage};
use tempfile::TempDir;
use tokio::time::sleep;

use super::{
    ClipboardContent, Job, JobDependencies, JobKind, JobManager, JobReport, JobState,
    OutputDestination, UploaderSelection, run_job,
};
use crate::artifact::{Artifact, ContentKind};
use crate::capture::{CaptureError, CaptureSource, CaptureType, ClipboardData, ClipboardReader};
use crate::config::{Config, SharedFolderConfig, WatermarkKind};
use crate::naming::NamingPolicy;
use crate::process::{ImagePostProcessor, ProcessingError, Stage, StageContext, StageOutcome};
use crate::publish::{PublishError, ResultSink};
use crate::upload::{SharedFolderUploader, UploadError, UploadPolicy, Uploader, UploaderKind};

const FULL_TRACE: [JobState; 7] = [
    JobState::Created,
    JobState::Acquiring,
    JobState::PostProcessing,
    JobState::Persisting,
    JobState::Uploading,
    JobState::Publishing,
    JobState::Completed,
];

#[derive(Clone)]
struct MockSource {
    data: Vec<u8>,
    error: Arc<Mutex<Option<CaptureError>>>,
    captured_types: Arc<Mutex<Vec<CaptureType>>>,
}

impl MockSource {
    fn returning(data: Vec<u8>) -> Self {
        Self {
            data,
            error: Arc::new(Mutex::new(None)),
            captured_types: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing(error: CaptureError) -> Self {
        let source = Self::returning(Vec::new());
        *source.error.lock().unwrap() = Some(error);
        source
    }
}

#[async_trait]
impl CaptureSource for MockSource {
    async fn capture(&self, capture_type: CaptureType) -> Result<Vec<u8>, CaptureError> {
        self.captured_types.lock().unwrap().push(capture_type);
        if let Some(err) = self.error.lock().unwrap().take() {
            Err(err)
        } else {
            Ok(self.data.clone())
        }
    }
}

struct MockClipboard(ClipboardData);

#[async_trait]
impl ClipboardReader for MockClipboard {
    async fn read(&self) -> Result<ClipboardData, CaptureError> {
        Ok(self.0.clone())
    }
}

#[derive(Clone, Default)]
struct MockSink {
    texts: Arc<Mutex<Vec<String>>>,
    images: Arc<Mutex<Vec<(usize, String)>>>,
    displayed: Arc<Mutex<Vec<u64>>>,
}

#[async_trait]
impl ResultSink for MockSink {
    fn set_clipboard_text(&self, text: &str) -> Result<(), PublishError> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn set_clipboard_image(&self, data: &[u8], mime_type: &str) -> Result<(), PublishError> {
        self.images
            .lock()
            .unwrap()
            .push((data.len(), mime_type.to_string()));
        Ok(())
    }

    async fn display_results(&self, report: &JobReport) -> Result<(), PublishError> {
        self.displayed.lock().unwrap().push(report.job_id);
        Ok(())
    }
}

struct MockUploader {
    name: String,
    kind: UploaderKind,
    result: Result<String, String>,
    delay: Duration,
    calls: Arc<Mutex<usize>>,
    received: Arc<Mutex<Vec<(ContentKind, String)>>>,
}

impl MockUploader {
    fn ok(name: &str, kind: UploaderKind, url: &str) -> Self {
        Self::new(name, kind, Ok(url.to_string()))
    }

    fn failing(name: &str, kind: UploaderKind, message: &str) -> Self {
        Self::new(name, kind, Err(message.to_string()))
    }

    fn new(name: &str, kind: UploaderKind, result: Result<String, String>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            result,
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(0)),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn delayed(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }
}

#[async_trait]
impl Uploader for MockUploader {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UploaderKind {
        self.kind
    }

    async fn upload(&self, artifact: &Artifact) -> Result<String, UploadError> {
        *self.calls.lock().unwrap() += 1;
        self.received
            .lock()
            .unwrap()
            .push((artifact.kind(), artifact.file_name.clone()));
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        match &self.result {
            Ok(url) => Ok(url.clone()),
            Err(message) => Err(UploadError::InvalidResponse(message.clone())),
        }
    }
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.paths.images_dir = root.join("images").to_string_lossy().into_owned();
    config.paths.text_dir = root.join("text").to_string_lossy().into_owned();
    config.naming.pattern = "shot".to_string();
    config
}

fn deps_with(config: Config, source: MockSource, sink: &MockSink) -> JobDependencies {
    let config = Arc::new(config);
    let naming = NamingPolicy::new(&config.naming);
    JobDependencies::desktop(config, naming)
        .with_source(Arc::new(source))
        .with_clipboard(Arc::new(MockClipboard(ClipboardData::Empty)))
        .with_sink(Arc::new(sink.clone()))
        .with_policy(UploadPolicy::new(
            Duration::from_secs(5),
            1,
            Duration::from_millis(1),
        ))
}

fn images(uploaders: Vec<Arc<dyn Uploader>>) -> UploaderSelection {
    UploaderSelection {
        image: uploaders,
        ..UploaderSelection::default()
    }
}

fn dir_is_empty_or_missing(dir: &Path) -> bool {
    std::fs::read_dir(dir).map(|mut d| d.next().is_none()).unwrap_or(true)
}

#[tokio::test]
async fn watermarked_capture_is_saved_and_path_copied() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(temp.path());
    config.watermark.mode = WatermarkKind::Text;
    config.watermark.text = "ZScreen".to_string();
    config.watermark.offset = 10;
    let sink = MockSink::default();
    let deps = deps_with(config, MockSource::returning(png(200, 200)), &sink);

    let job = Job::new(JobKind::Region)
        .with_outputs([OutputDestination::LocalDisk, OutputDestination::Clipboard]);
    let report = run_job(job, &deps).await;

    assert_eq!(report.state, JobState::Completed);
    assert_eq!(report.trace, FULL_TRACE.to_vec());
    assert!(report.uploads.is_empty());

    let expected = temp.path().join("images").join("shot.png");
    assert_eq!(report.local_path.as_deref(), Some(expected.as_path()));
    assert_eq!(
        *sink.texts.lock().unwrap(),
        vec![expected.display().to_string()]
    );

    let saved = image::open(&expected).unwrap().to_rgba8();
    assert_eq!(saved.dimensions(), (200, 200));
    assert!(
        saved.pixels().any(|p| p.0 != [255, 255, 255, 255]),
        "watermark should have been drawn"
    );
}

#[tokio::test]
async fn failing_adapters_do_not_cancel_siblings() {
    let temp = TempDir::new().unwrap();
    let sink = MockSink::default();
    let deps = deps_with(test_config(temp.path()), MockSource::returning(png(20, 20)), &sink);

    // Earlier adapters finish last, so completion order is the reverse of selection order.
    let uploaders: Vec<Arc<dyn Uploader>> = vec![
        Arc::new(MockUploader::ok("one", UploaderKind::Image, "https://h/1").delayed(60)),
        Arc::new(MockUploader::failing("two", UploaderKind::Image, "bad key").delayed(40)),
        Arc::new(MockUploader::ok("three", UploaderKind::Image, "https://h/3").delayed(20)),
        Arc::new(MockUploader::failing("four", UploaderKind::Image, "quota")),
    ];
    let job = Job::new(JobKind::EntireScreen)
        .with_outputs([OutputDestination::RemoteHost])
        .with_uploaders(images(uploaders));
    let report = run_job(job, &deps).await;

    assert_eq!(report.state, JobState::Completed);
    let names: Vec<&str> = report.uploads.iter().map(|u| u.destination.as_str()).collect();
    assert_eq!(names, vec!["one", "two", "three", "four"]);
    let errors: Vec<bool> = report.uploads.iter().map(|u| u.is_error()).collect();
    assert_eq!(errors, vec![false, true, false, true]);
    assert_eq!(report.links(), vec!["https://h/1", "https://h/3"]);
    assert!(report.local_path.is_none());
}

#[tokio::test]
async fn network_error_is_reported_next_to_success() {
    let temp = TempDir::new().unwrap();
    let sink = MockSink::default();
    let deps = deps_with(test_config(temp.path()), MockSource::returning(png(20, 20)), &sink);

    let b = MockUploader::failing("B", UploaderKind::Image, "network error");
    let b_calls = b.calls.clone();
    let job = Job::new(JobKind::ActiveWindow)
        .with_outputs([OutputDestination::RemoteHost, OutputDestination::Clipboard])
        .with_uploaders(images(vec![
            Arc::new(MockUploader::ok("A", UploaderKind::Image, "http://a/x.png")),
            Arc::new(b),
        ]));
    let report = run_job(job, &deps).await;

    assert_eq!(report.state, JobState::Completed);
    assert_eq!(report.uploads.len(), 2);
    assert_eq!(report.uploads[0].location(), Some("http://a/x.png"));
    assert!(report.uploads[1].is_error());
    assert!(format!("{:?}", report.uploads[1].outcome).contains("network error"));
    // Invalid responses are permanent: no retry.
    assert_eq!(*b_calls.lock().unwrap(), 1);
    assert_eq!(*sink.texts.lock().unwrap(), vec!["http://a/x.png".to_string()]);
    assert!(report.has_upload_errors());
}

#[tokio::test]
async fn dismissed_selection_cancels_without_side_effects() {
    let temp = TempDir::new().unwrap();
    let sink = MockSink::default();
    let uploader = MockUploader::ok("up", UploaderKind::Image, "https://h/1");
    let calls = uploader.calls.clone();
    let deps = deps_with(
        test_config(temp.path()),
        MockSource::failing(CaptureError::Cancelled("escape".into())),
        &sink,
    );

    let job = Job::new(JobKind::Region)
        .with_outputs(OutputDestination::ALL)
        .with_uploaders(images(vec![Arc::new(uploader)]));
    let report = run_job(job, &deps).await;

    assert_eq!(report.state, JobState::Canceled);
    assert_eq!(
        report.trace,
        vec![JobState::Created, JobState::Acquiring, JobState::Canceled]
    );
    assert_eq!(report.error.as_deref(), Some("escape"));
    assert_eq!(*calls.lock().unwrap(), 0);
    assert!(sink.texts.lock().unwrap().is_empty());
    assert!(sink.displayed.lock().unwrap().is_empty());
    assert!(dir_is_empty_or_missing(&temp.path().join("images")));
}

#[tokio::test]
async fn capture_tool_failure_fails_the_job() {
    let temp = TempDir::new().unwrap();
    let sink = MockSink::default();
    let deps = deps_with(
        test_config(temp.path()),
        MockSource::failing(CaptureError::ToolFailed("grim missing".into())),
        &sink,
    );

    let report = run_job(Job::new(JobKind::SelectedWindow), &deps).await;
    assert_eq!(report.state, JobState::Failed);
    assert!(report.error.unwrap().contains("grim missing"));
    assert!(sink.displayed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_file_fails_acquisition() {
    let temp = TempDir::new().unwrap();
    let sink = MockSink::default();
    let deps = deps_with(test_config(temp.path()), MockSource::returning(Vec::new()), &sink);

    let missing = temp.path().join("nope.png");
    let report = run_job(Job::new(JobKind::File(missing.clone())), &deps).await;

    assert_eq!(report.state, JobState::Failed);
    assert!(report.error.unwrap().contains("nope.png"));
}

#[tokio::test]
async fn empty_clipboard_fails_acquisition() {
    let temp = TempDir::new().unwrap();
    let sink = MockSink::default();
    let deps = deps_with(test_config(temp.path()), MockSource::returning(Vec::new()), &sink)
        .with_clipboard(Arc::new(MockClipboard(ClipboardData::Text("   ".into()))));

    let report = run_job(Job::new(JobKind::Clipboard), &deps).await;
    assert_eq!(report.state, JobState::Failed);
    assert!(report.error.unwrap().contains("clipboard is empty"));
}

#[tokio::test]
async fn unwritable_directory_still_uploads() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("images");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let sink = MockSink::default();
    let deps = deps_with(test_config(temp.path()), MockSource::returning(png(10, 10)), &sink);

    let job = Job::new(JobKind::EntireScreen)
        .with_outputs([OutputDestination::LocalDisk, OutputDestination::RemoteHost])
        .with_uploaders(images(vec![Arc::new(MockUploader::ok(
            "up",
            UploaderKind::Image,
            "https://h/ok",
        ))]));
    let report = run_job(job, &deps).await;

    assert_eq!(report.state, JobState::Completed);
    assert!(report.local_path.is_none());
    assert!(report.warnings.iter().any(|w| w.contains("Could not save")));
    assert_eq!(report.links(), vec!["https://h/ok"]);
}

#[tokio::test]
async fn file_jobs_are_uploaded_from_their_source() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("notes.txt");
    std::fs::write(&source, "meeting notes").unwrap();
    let sink = MockSink::default();
    let deps = deps_with(test_config(temp.path()), MockSource::returning(Vec::new()), &sink);

    let uploader = MockUploader::ok("paste", UploaderKind::Text, "https://paste/1");
    let received = uploader.received.clone();
    let job = Job::new(JobKind::File(source.clone()))
        .with_outputs([OutputDestination::LocalDisk, OutputDestination::RemoteHost])
        .with_uploaders(UploaderSelection {
            text: vec![Arc::new(uploader)],
            ..UploaderSelection::default()
        });
    let report = run_job(job, &deps).await;

    assert_eq!(report.state, JobState::Completed);
    assert_eq!(report.local_path.as_deref(), Some(source.as_path()));
    assert_eq!(
        *received.lock().unwrap(),
        vec![(ContentKind::Text, "notes.txt".to_string())]
    );
    assert!(dir_is_empty_or_missing(&temp.path().join("text")));
}

#[tokio::test]
async fn image_files_are_watermarked_before_upload() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("in.png");
    std::fs::write(&source, png(200, 200)).unwrap();
    let mut config = test_config(temp.path());
    config.watermark.mode = WatermarkKind::Text;
    config.watermark.text = "ZScreen".to_string();
    config.watermark.offset = 10;
    let sink = MockSink::default();
    let deps = deps_with(config, MockSource::returning(Vec::new()), &sink);

    let uploader = MockUploader::ok("imgur", UploaderKind::Image, "https://i/in");
    let received = uploader.received.clone();
    let job = Job::new(JobKind::File(source.clone()))
        .with_outputs([OutputDestination::LocalDisk, OutputDestination::RemoteHost])
        .with_uploaders(images(vec![Arc::new(uploader)]));
    let report = run_job(job, &deps).await;

    assert_eq!(report.state, JobState::Completed);
    let saved_path = temp.path().join("images").join("shot.png");
    assert_eq!(report.local_path.as_deref(), Some(saved_path.as_path()));
    assert_eq!(
        *received.lock().unwrap(),
        vec![(ContentKind::Image, "shot.png".to_string())]
    );

    let saved = image::open(&saved_path).unwrap().to_rgba8();
    assert_eq!(saved.dimensions(), (200, 200));
    assert!(saved.pixels().any(|p| p.0 != [255, 255, 255, 255]));
    // The source file itself is left alone.
    assert_eq!(std::fs::read(&source).unwrap(), png(200, 200));
}

#[tokio::test]
async fn untouched_image_files_keep_their_source_path() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("in.png");
    std::fs::write(&source, png(20, 20)).unwrap();
    let sink = MockSink::default();
    let deps = deps_with(test_config(temp.path()), MockSource::returning(Vec::new()), &sink);

    let report = run_job(
        Job::new(JobKind::File(source.clone())).with_outputs([OutputDestination::LocalDisk]),
        &deps,
    )
    .await;

    assert_eq!(report.local_path.as_deref(), Some(source.as_path()));
    assert!(dir_is_empty_or_missing(&temp.path().join("images")));
}

struct Explodes;

impl Stage for Explodes {
    fn name(&self) -> &'static str {
        "explodes"
    }

    fn apply(&self, _: &RgbaImage, _: &StageContext) -> Result<StageOutcome, ProcessingError> {
        panic!("stage blew up")
    }
}

#[tokio::test]
async fn panicking_stage_keeps_the_captured_image() {
    let temp = TempDir::new().unwrap();
    let sink = MockSink::default();
    let deps = deps_with(test_config(temp.path()), MockSource::returning(png(8, 8)), &sink)
        .with_processor(ImagePostProcessor::with_stages(vec![Box::new(Explodes)]));

    let report = run_job(
        Job::new(JobKind::Region).with_outputs([OutputDestination::LocalDisk]),
        &deps,
    )
    .await;

    assert_eq!(report.state, JobState::Completed);
    assert!(report.warnings.iter().any(|w| w.contains("stage blew up")));
    let saved = image::open(report.local_path.unwrap()).unwrap().to_rgba8();
    assert_eq!(saved, RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255])));
}

#[tokio::test]
async fn names_use_the_acquisition_time() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(temp.path());
    config.naming.pattern = "%Y".to_string();
    let sink = MockSink::default();
    let deps = deps_with(config, MockSource::returning(png(4, 4)), &sink);

    let mut job = Job::new(JobKind::EntireScreen).with_outputs([OutputDestination::LocalDisk]);
    job.created_at = Local.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
    let report = run_job(job, &deps).await;

    let name = report.local_path.unwrap().file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(name, format!("{}.png", Local::now().format("%Y")));
}

#[tokio::test]
async fn links_on_the_clipboard_go_to_link_adapters() {
    let temp = TempDir::new().unwrap();
    let sink = MockSink::default();
    let deps = deps_with(test_config(temp.path()), MockSource::returning(Vec::new()), &sink)
        .with_clipboard(Arc::new(MockClipboard(ClipboardData::Text(
            "https://example.com/a/very/long/path".into(),
        ))));

    let text = MockUploader::ok("paste", UploaderKind::Text, "https://paste/1");
    let text_calls = text.calls.clone();
    let job = Job::new(JobKind::Clipboard)
        .with_outputs([OutputDestination::RemoteHost])
        .with_uploaders(UploaderSelection {
            text: vec![Arc::new(text)],
            link: vec![Arc::new(MockUploader::ok(
                "is.gd",
                UploaderKind::Link,
                "https://is.gd/x",
            ))],
            ..UploaderSelection::default()
        });
    let report = run_job(job, &deps).await;

    assert_eq!(report.links(), vec!["https://is.gd/x"]);
    assert_eq!(*text_calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn undecodable_capture_passes_through() {
    let temp = TempDir::new().unwrap();
    let sink = MockSink::default();
    let deps = deps_with(
        test_config(temp.path()),
        MockSource::returning(b"definitely not an image".to_vec()),
        &sink,
    );

    let report = run_job(Job::new(JobKind::Freehand), &deps).await;

    assert_eq!(report.state, JobState::Completed);
    assert!(report.warnings.iter().any(|w| w.contains("could not be decoded")));
    let saved = report.local_path.unwrap();
    assert_eq!(std::fs::read(saved).unwrap(), b"definitely not an image");
}

#[tokio::test]
async fn data_policy_copies_the_image_and_printer_warns() {
    let temp = TempDir::new().unwrap();
    let sink = MockSink::default();
    let deps = deps_with(test_config(temp.path()), MockSource::returning(png(8, 8)), &sink);

    let job = Job::new(JobKind::EntireScreen)
        .with_outputs([OutputDestination::Clipboard, OutputDestination::Printer])
        .with_clipboard_content(ClipboardContent::Data);
    let report = run_job(job, &deps).await;

    assert_eq!(report.state, JobState::Completed);
    let copied = sink.images.lock().unwrap();
    assert_eq!(copied.len(), 1);
    assert_eq!(copied[0].1, "image/png");
    assert!(report.warnings.iter().any(|w| w.contains("Printing is not supported")));
    assert!(report.local_path.is_none());
}

#[tokio::test]
async fn shared_folder_runs_after_remote_hosts() {
    let temp = TempDir::new().unwrap();
    let sink = MockSink::default();
    let config = test_config(temp.path());
    let naming = NamingPolicy::new(&config.naming);
    let share = temp.path().join("share");
    let folder = SharedFolderUploader::new(
        &SharedFolderConfig {
            directory: share.to_string_lossy().into_owned(),
            base_url: String::new(),
        },
        naming,
    );
    let deps = deps_with(config, MockSource::returning(png(8, 8)), &sink);

    let job = Job::new(JobKind::EntireScreen)
        .with_outputs([OutputDestination::SharedFolder, OutputDestination::RemoteHost])
        .with_uploaders(UploaderSelection {
            image: vec![Arc::new(MockUploader::ok("imgur", UploaderKind::Image, "https://i/1"))],
            shared_folder: Some(Arc::new(folder)),
            ..UploaderSelection::default()
        });
    let report = run_job(job, &deps).await;

    let names: Vec<&str> = report.uploads.iter().map(|u| u.destination.as_str()).collect();
    assert_eq!(names, vec!["imgur", "shared-folder"]);
    assert!(share.join("shot.png").exists());
}

#[tokio::test]
async fn batch_reports_come_back_in_submission_order() {
    let temp = TempDir::new().unwrap();
    let sink = MockSink::default();
    let mut config = test_config(temp.path());
    config.upload.max_concurrent_jobs = 2;
    let deps = deps_with(config, MockSource::returning(png(4, 4)), &sink);
    let manager = JobManager::new(deps);

    let jobs: Vec<Job> = (0..4)
        .map(|i| {
            Job::new(JobKind::EntireScreen)
                .with_outputs([OutputDestination::RemoteHost])
                .with_uploaders(images(vec![Arc::new(
                    MockUploader::ok("up", UploaderKind::Image, &format!("https://h/{}", i))
                        .delayed(40 - i * 10),
                )]))
        })
        .collect();
    let ids: Vec<u64> = jobs.iter().map(Job::id).collect();

    let reports = manager.run_batch(jobs).await;
    let report_ids: Vec<u64> = reports.iter().map(|r| r.job_id).collect();
    assert_eq!(report_ids, ids);
    for (i, report) in reports.iter().enumerate() {
        assert_eq!(report.first_link(), Some(format!("https://h/{}", i).as_str()));
    }
}

#[tokio::test]
async fn capture_kind_reaches_the_source() {
    let temp = TempDir::new().unwrap();
    let sink = MockSink::default();
    let source = MockSource::returning(png(4, 4));
    let seen = source.captured_types.clone();
    let deps = deps_with(test_config(temp.path()), source, &sink);

    run_job(
        Job::new(JobKind::SelectedWindow).with_outputs(Vec::<OutputDestination>::new()),
        &deps,
    )
    .await;
    assert_eq!(*seen.lock().unwrap(), vec![CaptureType::SelectedWindow]);
}
