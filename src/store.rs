//! Encoding and saving artifacts to the local disk.

use crate::artifact::Artifact;
use crate::config::{ImageConfig, ImageFormatSpec};
use crate::naming::{NamingError, NamingPolicy};
use crate::util::format_file_size;
use chrono::{DateTime, Local};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while encoding or writing an artifact.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Naming(#[from] NamingError),

    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Image bytes in their final on-disk format.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormatSpec,
}

/// Turns processed content into files.
#[derive(Debug, Clone)]
pub struct LocalStore {
    naming: NamingPolicy,
    image: ImageConfig,
}

impl LocalStore {
    pub fn new(naming: NamingPolicy, image: &ImageConfig) -> Self {
        Self {
            naming,
            image: image.clone(),
        }
    }

    pub fn naming(&self) -> &NamingPolicy {
        &self.naming
    }

    /// Encodes with the configured format, switching to the fallback format when the
    /// result is larger than `switch_after_kb`.
    pub fn encode_image(&self, image: &RgbaImage) -> Result<EncodedImage, StoreError> {
        let primary = self.image.format;
        let bytes = encode_as(image, primary, self.image.jpeg_quality)?;

        let limit = self.image.switch_after_kb.saturating_mul(1024);
        if limit == 0 || (bytes.len() as u64) <= limit || self.image.switch_format == primary {
            return Ok(EncodedImage {
                bytes,
                format: primary,
            });
        }

        let fallback = self.image.switch_format;
        let switched = encode_as(image, fallback, self.image.jpeg_quality)?;
        log::info!(
            "Encoded {} is {} (limit {} KiB), switching to {}",
            primary.extension(),
            format_file_size(bytes.len() as u64),
            self.image.switch_after_kb,
            fallback.extension()
        );
        Ok(EncodedImage {
            bytes: switched,
            format: fallback,
        })
    }

    /// Encodes a processed image into an artifact named from the naming pattern.
    pub fn prepare_image(
        &self,
        image: &RgbaImage,
        timestamp: DateTime<Local>,
    ) -> Result<Artifact, StoreError> {
        let encoded = self.encode_image(image)?;
        let file_name = self
            .naming
            .file_name(timestamp, encoded.format.extension());
        Ok(Artifact::image(
            encoded.bytes,
            file_name,
            encoded.format.mime_type(),
        ))
    }

    /// Keeps already-encoded bytes that could not be decoded for processing.
    pub fn prepare_raw_image(&self, bytes: Vec<u8>, timestamp: DateTime<Local>) -> Artifact {
        let format = image::guess_format(&bytes).ok();
        let extension = format
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("png");
        let mime = format
            .map(|f| f.to_mime_type())
            .unwrap_or("image/png");
        Artifact::image(bytes, self.naming.file_name(timestamp, extension), mime)
    }

    pub fn prepare_text(&self, text: String, timestamp: DateTime<Local>) -> Artifact {
        let file_name = self.naming.file_name(timestamp, "txt");
        Artifact::text(text, file_name)
    }

    /// Writes `artifact` into `directory` under a unique (or overwritten) name.
    ///
    /// Allocation and write happen under the directory's lock. A failed write is
    /// retried once.
    pub fn save(
        &self,
        artifact: &Artifact,
        directory: &Path,
        overwrite: bool,
    ) -> Result<PathBuf, StoreError> {
        self.naming.state().with_directory_lock(directory, || {
            let path = self
                .naming
                .allocate(directory, &artifact.file_name, overwrite)?;

            log::info!(
                "Saving {} to {} ({})",
                artifact.kind().label(),
                path.display(),
                format_file_size(artifact.len() as u64)
            );

            if let Err(first) = write_file(&path, &artifact.data) {
                log::warn!("Write to {} failed, retrying: {}", path.display(), first);
                write_file(&path, &artifact.data).map_err(|source| StoreError::Io {
                    path: path.clone(),
                    source,
                })?;
            }

            log::debug!("Saved {}", path.display());
            Ok(path)
        })
    }
}

fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    fs::write(path, data)?;

    // User read/write only.
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, Permissions::from_mode(0o600))?;
    }

    Ok(())
}

fn encode_as(image: &RgbaImage, format: ImageFormatSpec, quality: u8) -> Result<Vec<u8>, StoreError> {
    let mut bytes = Vec::new();
    match format {
        ImageFormatSpec::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut bytes, quality).encode_image(&rgb)?;
        }
        other => {
            let target = match other {
                ImageFormatSpec::Gif => ImageFormat::Gif,
                ImageFormatSpec::Bmp => ImageFormat::Bmp,
                ImageFormatSpec::Tiff => ImageFormat::Tiff,
                _ => ImageFormat::Png,
            };
            image.write_to(&mut Cursor::new(&mut bytes), target)?;
        }
    }
    Ok(bytes)
}
