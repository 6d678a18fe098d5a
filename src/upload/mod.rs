//! Upload destinations.
//!
//! Every destination implements [`Uploader`]. Adapters are built once from the
//! `[uploaders]` configuration and shared read-only by all jobs through the
//! [`UploaderRegistry`], which groups them by the content they accept and hands out
//! the numeric codes used on the command line.

pub mod custom;
pub mod imgur;
pub mod isgd;
pub mod paste;
pub mod policy;
pub mod shared_folder;

use crate::artifact::{Artifact, ContentKind};
use crate::config::{CustomUploaderKind, UploadersConfig};
use crate::naming::{NamingError, NamingPolicy};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub use custom::CustomUploader;
pub use imgur::ImgurUploader;
pub use isgd::IsgdUploader;
pub use paste::PasteUploader;
pub use policy::UploadPolicy;
pub use shared_folder::SharedFolderUploader;

/// Errors reported by a single upload attempt.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("{uploader} does not accept {kind} content")]
    Unsupported {
        uploader: String,
        kind: &'static str,
    },

    #[error(transparent)]
    Naming(#[from] NamingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Timeouts, connection failures and server-side (5xx) errors are worth one retry.
    pub fn is_transient(&self) -> bool {
        match self {
            UploadError::Timeout(_) | UploadError::Network(_) => true,
            UploadError::Http(e) => e.is_timeout() || e.is_connect(),
            UploadError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Which uploader category an adapter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploaderKind {
    Image,
    Text,
    File,
    /// URL shorteners; fed text artifacts that are links.
    Link,
    /// Accepts any content (the shared folder).
    Any,
}

impl UploaderKind {
    pub fn label(self) -> &'static str {
        match self {
            UploaderKind::Image => "image",
            UploaderKind::Text => "text",
            UploaderKind::File => "file",
            UploaderKind::Link => "link",
            UploaderKind::Any => "any",
        }
    }
}

impl From<CustomUploaderKind> for UploaderKind {
    fn from(kind: CustomUploaderKind) -> Self {
        match kind {
            CustomUploaderKind::Image => UploaderKind::Image,
            CustomUploaderKind::Text => UploaderKind::Text,
            CustomUploaderKind::File => UploaderKind::File,
        }
    }
}

impl fmt::Display for UploaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A destination content can be sent to.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Destination identifier shown in results and listings.
    fn name(&self) -> &str;

    fn kind(&self) -> UploaderKind;

    /// Whether credentials/endpoints needed for uploading are present.
    fn is_configured(&self) -> bool {
        true
    }

    /// Sends `artifact` and returns the URL (or path) where it can be found.
    async fn upload(&self, artifact: &Artifact) -> Result<String, UploadError>;
}

/// Absolute, well-formed URL with a host. `file://` URLs are rejected.
pub fn is_valid_link(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return false;
    }
    match Url::parse(trimmed) {
        Ok(url) => url.scheme() != "file" && url.has_host(),
        Err(_) => false,
    }
}

/// Returns `body` trimmed when it is a usable link.
pub(crate) fn link_from_body(uploader: &str, body: &str) -> Result<String, UploadError> {
    let link = body.trim();
    if is_valid_link(link) {
        Ok(link.to_string())
    } else {
        Err(UploadError::InvalidResponse(format!(
            "{} returned no link: {}",
            uploader,
            truncate_for_log(link)
        )))
    }
}

pub(crate) fn truncate_for_log(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Rejects content kinds an adapter cannot take.
pub(crate) fn ensure_accepts(uploader: &dyn Uploader, artifact: &Artifact) -> Result<(), UploadError> {
    let accepted = match uploader.kind() {
        UploaderKind::Any => true,
        UploaderKind::Image => artifact.kind() == ContentKind::Image,
        UploaderKind::Text | UploaderKind::Link => artifact.kind() == ContentKind::Text,
        UploaderKind::File => true,
    };
    if accepted {
        Ok(())
    } else {
        Err(UploadError::Unsupported {
            uploader: uploader.name().to_string(),
            kind: artifact.kind().label(),
        })
    }
}

/// Builds the HTTP client shared by all adapters.
pub fn http_client() -> Result<reqwest::Client, UploadError> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("capshare/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// One row of `--list` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploaderListing {
    pub kind: UploaderKind,
    pub code: usize,
    pub name: String,
    pub configured: bool,
}

/// All adapters known to the process, grouped by category.
///
/// Codes are positions inside a category: built-in adapters first, then custom
/// uploaders in configuration order.
#[derive(Clone, Default)]
pub struct UploaderRegistry {
    image: Vec<Arc<dyn Uploader>>,
    text: Vec<Arc<dyn Uploader>>,
    file: Vec<Arc<dyn Uploader>>,
    link: Vec<Arc<dyn Uploader>>,
    shared_folder: Option<Arc<dyn Uploader>>,
}

impl UploaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the built-in and custom adapters from configuration.
    pub fn from_config(config: &UploadersConfig, naming: &NamingPolicy) -> Result<Self, UploadError> {
        let client = http_client()?;
        let mut registry = Self::new();

        registry.register(Arc::new(ImgurUploader::new(client.clone(), &config.imgur)));
        registry.register(Arc::new(PasteUploader::new(client.clone(), &config.paste)));
        registry.register(Arc::new(IsgdUploader::new(client.clone(), &config.isgd)));

        for custom in &config.custom {
            match CustomUploader::new(client.clone(), custom) {
                Ok(uploader) => registry.register(Arc::new(uploader)),
                Err(e) => log::warn!("Skipping custom uploader '{}': {}", custom.name, e),
            }
        }

        registry.register(Arc::new(SharedFolderUploader::new(
            &config.shared_folder,
            naming.clone(),
        )));

        log::debug!(
            "Registered uploaders: {} image, {} text, {} file, {} link",
            registry.image.len(),
            registry.text.len(),
            registry.file.len(),
            registry.link.len()
        );
        Ok(registry)
    }

    /// Appends `uploader` to its category.
    pub fn register(&mut self, uploader: Arc<dyn Uploader>) {
        match uploader.kind() {
            UploaderKind::Image => self.image.push(uploader),
            UploaderKind::Text => self.text.push(uploader),
            UploaderKind::File => self.file.push(uploader),
            UploaderKind::Link => self.link.push(uploader),
            UploaderKind::Any => self.shared_folder = Some(uploader),
        }
    }

    fn category(&self, kind: UploaderKind) -> &[Arc<dyn Uploader>] {
        match kind {
            UploaderKind::Image => &self.image,
            UploaderKind::Text => &self.text,
            UploaderKind::File => &self.file,
            UploaderKind::Link => &self.link,
            UploaderKind::Any => std::slice::from_ref(match &self.shared_folder {
                Some(uploader) => uploader,
                None => return &[],
            }),
        }
    }

    pub fn by_code(&self, kind: UploaderKind, code: usize) -> Option<Arc<dyn Uploader>> {
        self.category(kind).get(code).cloned()
    }

    pub fn by_name(&self, kind: UploaderKind, name: &str) -> Option<Arc<dyn Uploader>> {
        self.category(kind)
            .iter()
            .find(|u| u.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn shared_folder(&self) -> Option<Arc<dyn Uploader>> {
        self.shared_folder.clone()
    }

    /// Every adapter with its code, for help output.
    pub fn listing(&self) -> Vec<UploaderListing> {
        [
            UploaderKind::Image,
            UploaderKind::Text,
            UploaderKind::File,
            UploaderKind::Link,
        ]
        .into_iter()
        .flat_map(|kind| {
            self.category(kind)
                .iter()
                .enumerate()
                .map(move |(code, uploader)| UploaderListing {
                    kind,
                    code,
                    name: uploader.name().to_string(),
                    configured: uploader.is_configured(),
                })
        })
        .collect()
    }
}

impl fmt::Debug for UploaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |list: &[Arc<dyn Uploader>]| {
            list.iter()
                .map(|u| u.name().to_string())
                .collect::<Vec<_>>()
        };
        f.debug_struct("UploaderRegistry")
            .field("image", &names(&self.image))
            .field("text", &names(&self.text))
            .field("file", &names(&self.file))
            .field("link", &names(&self.link))
            .field(
                "shared_folder",
                &self.shared_folder.as_ref().map(|u| u.name().to_string()),
            )
            .finish()
    }
}
