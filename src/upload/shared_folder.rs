//! Copies payloads into a shared (synced or web-served) directory.

use super::{UploadError, Uploader, UploaderKind};
use crate::artifact::Artifact;
use crate::config::SharedFolderConfig;
use crate::naming::NamingPolicy;
use crate::util::expand_tilde;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

pub struct SharedFolderUploader {
    directory: Option<PathBuf>,
    base_url: Option<String>,
    naming: NamingPolicy,
}

impl SharedFolderUploader {
    pub fn new(config: &SharedFolderConfig, naming: NamingPolicy) -> Self {
        let directory = config.directory.trim();
        let base_url = config.base_url.trim();
        Self {
            directory: (!directory.is_empty()).then(|| expand_tilde(directory)),
            base_url: (!base_url.is_empty()).then(|| base_url.to_string()),
            naming,
        }
    }

    fn public_location(&self, path: &Path) -> Result<String, UploadError> {
        let Some(base) = &self.base_url else {
            return Ok(path.display().to_string());
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut url = Url::parse(base)
            .map_err(|e| UploadError::InvalidResponse(format!("bad base_url '{}': {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| UploadError::InvalidResponse(format!("base_url '{}' cannot hold a path", base)))?
            .pop_if_empty()
            .push(&name);
        Ok(url.to_string())
    }
}

#[async_trait]
impl Uploader for SharedFolderUploader {
    fn name(&self) -> &str {
        "shared-folder"
    }

    fn kind(&self) -> UploaderKind {
        UploaderKind::Any
    }

    fn is_configured(&self) -> bool {
        self.directory.is_some()
    }

    async fn upload(&self, artifact: &Artifact) -> Result<String, UploadError> {
        let Some(directory) = self.directory.clone() else {
            return Err(UploadError::NotConfigured("shared_folder directory".to_string()));
        };

        let naming = self.naming.clone();
        let file_name = artifact.file_name.clone();
        let data = artifact.data.clone();

        let path = tokio::task::spawn_blocking(move || {
            naming.state().with_directory_lock(&directory, || {
                let path = naming.allocate(&directory, &file_name, naming.overwrite())?;
                fs::write(&path, &data)?;
                Ok::<_, UploadError>(path)
            })
        })
        .await
        .map_err(|e| UploadError::Io(std::io::Error::other(format!("copy task failed: {}", e))))??;

        log::info!("Copied {} to shared folder", path.display());
        self.public_location(&path)
    }
}
