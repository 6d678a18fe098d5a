use std::sync::Arc;

use crate::capture::{CaptureSource, ClipboardReader, DesktopCaptureSource, WaylandClipboardReader};
use crate::config::Config;
use crate::naming::NamingPolicy;
use crate::process::ImagePostProcessor;
use crate::publish::{DesktopSink, ResultSink};
use crate::store::LocalStore;
use crate::upload::UploadPolicy;

/// Everything a job run needs besides the job itself. Each collaborator can be
/// swapped for a mock in tests.
#[derive(Clone)]
pub struct JobDependencies {
    pub config: Arc<Config>,
    pub source: Arc<dyn CaptureSource>,
    pub clipboard: Arc<dyn ClipboardReader>,
    pub sink: Arc<dyn ResultSink>,
    pub processor: Arc<ImagePostProcessor>,
    pub store: LocalStore,
    pub policy: UploadPolicy,
}

impl JobDependencies {
    /// Wayland capture, clipboard and notifications.
    ///
    /// `naming` must be the policy the uploader registry was built with so the
    /// shared folder and the local store share one counter.
    pub fn desktop(config: Arc<Config>, naming: NamingPolicy) -> Self {
        Self {
            source: Arc::new(DesktopCaptureSource),
            clipboard: Arc::new(WaylandClipboardReader),
            sink: Arc::new(DesktopSink::new(config.defaults.notifications)),
            processor: Arc::new(ImagePostProcessor::from_config(&config)),
            store: LocalStore::new(naming, &config.image),
            policy: UploadPolicy::from_config(&config.upload),
            config,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn CaptureSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_clipboard(mut self, clipboard: Arc<dyn ClipboardReader>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_processor(mut self, processor: ImagePostProcessor) -> Self {
        self.processor = Arc::new(processor);
        self
    }

    pub fn with_policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }
}
