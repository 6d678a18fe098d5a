//! is.gd URL shortener.

use super::{
    UploadError, Uploader, UploaderKind, ensure_accepts, is_valid_link, link_from_body,
    truncate_for_log,
};
use crate::artifact::Artifact;
use crate::config::IsgdConfig;
use async_trait::async_trait;

pub struct IsgdUploader {
    http: reqwest::Client,
    url: String,
}

impl IsgdUploader {
    pub fn new(http: reqwest::Client, config: &IsgdConfig) -> Self {
        Self {
            http,
            url: config.url.clone(),
        }
    }
}

#[async_trait]
impl Uploader for IsgdUploader {
    fn name(&self) -> &str {
        "is.gd"
    }

    fn kind(&self) -> UploaderKind {
        UploaderKind::Link
    }

    fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }

    async fn upload(&self, artifact: &Artifact) -> Result<String, UploadError> {
        ensure_accepts(self, artifact)?;
        let long_url = artifact.as_text().map(str::trim).unwrap_or_default();
        if !is_valid_link(long_url) {
            return Err(UploadError::Unsupported {
                uploader: self.name().to_string(),
                kind: "non-link text",
            });
        }

        let resp = self
            .http
            .get(&self.url)
            .query(&[("format", "simple"), ("url", long_url)])
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(UploadError::Api {
                status: status.as_u16(),
                body: truncate_for_log(&body),
            });
        }

        link_from_body(self.name(), &body)
    }
}
