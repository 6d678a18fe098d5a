//! The payload a job carries from acquisition to upload.

use image::ImageFormat;
use std::path::{Path, PathBuf};

/// Content category of an [`Artifact`]. Fixed for the artifact's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Image,
    Text,
    File,
}

impl ContentKind {
    pub fn label(self) -> &'static str {
        match self {
            ContentKind::Image => "image",
            ContentKind::Text => "text",
            ContentKind::File => "file",
        }
    }
}

/// Captured, pasted or loaded content.
#[derive(Debug, Clone)]
pub struct Artifact {
    kind: ContentKind,
    pub data: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    /// Where the content already lives on disk (file jobs only).
    pub source_path: Option<PathBuf>,
}

impl Artifact {
    pub fn image(data: Vec<u8>, file_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Image,
            data,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            source_path: None,
        }
    }

    pub fn text(text: String, file_name: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Text,
            data: text.into_bytes(),
            file_name: file_name.into(),
            mime_type: "text/plain; charset=utf-8".to_string(),
            source_path: None,
        }
    }

    /// Wraps a file read from `path`. Recognised image files become image artifacts.
    pub fn from_file(path: &Path, data: Vec<u8>) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let image_format = ImageFormat::from_path(path).ok();
        let kind = match image_format {
            Some(_) => ContentKind::Image,
            None if is_text_extension(path) => ContentKind::Text,
            None => ContentKind::File,
        };
        let mime_type = image_format
            .map(|f| f.to_mime_type().to_string())
            .unwrap_or_else(|| mime_for_extension(path).to_string());

        Self {
            kind,
            data,
            file_name,
            mime_type,
            source_path: Some(path.to_path_buf()),
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    /// Content as UTF-8 text, for text artifacts.
    pub fn as_text(&self) -> Option<&str> {
        match self.kind {
            ContentKind::Text => std::str::from_utf8(&self.data).ok(),
            _ => None,
        }
    }

    /// Size of the payload in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn is_text_extension(path: &Path) -> bool {
    matches!(
        extension_lowercase(path).as_deref(),
        Some("txt" | "md" | "log" | "csv" | "json" | "toml" | "yaml" | "yml" | "xml" | "html" | "htm")
    )
}

fn mime_for_extension(path: &Path) -> &'static str {
    match extension_lowercase(path).as_deref() {
        Some("txt" | "log" | "md" | "csv" | "toml" | "yaml" | "yml") => "text/plain; charset=utf-8",
        Some("html" | "htm") => "text/html",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        _ => "application/octet-stream",
    }
}

fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_kind_follows_extension() {
        let png = Artifact::from_file(Path::new("/tmp/a/shot.PNG"), vec![1]);
        assert_eq!(png.kind(), ContentKind::Image);
        assert_eq!(png.mime_type, "image/png");
        assert_eq!(png.file_name, "shot.PNG");

        let notes = Artifact::from_file(Path::new("notes.txt"), b"hi".to_vec());
        assert_eq!(notes.kind(), ContentKind::Text);
        assert_eq!(notes.as_text(), Some("hi"));

        let archive = Artifact::from_file(Path::new("bundle.zip"), vec![0; 4]);
        assert_eq!(archive.kind(), ContentKind::File);
        assert_eq!(archive.mime_type, "application/zip");
        assert!(archive.as_text().is_none());
    }

    #[test]
    fn text_artifacts_expose_their_string() {
        let artifact = Artifact::text("https://example.com".into(), "link.txt");
        assert_eq!(artifact.as_text(), Some("https://example.com"));
        assert_eq!(artifact.len(), 19);
    }
}
