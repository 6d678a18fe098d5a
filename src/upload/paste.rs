//! Plain-text paste service (paste.rs compatible: raw POST body, URL in the response).

use super::{UploadError, Uploader, UploaderKind, ensure_accepts, link_from_body, truncate_for_log};
use crate::artifact::Artifact;
use crate::config::PasteConfig;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

pub struct PasteUploader {
    http: reqwest::Client,
    url: String,
}

impl PasteUploader {
    pub fn new(http: reqwest::Client, config: &PasteConfig) -> Self {
        Self {
            http,
            url: config.url.clone(),
        }
    }
}

#[async_trait]
impl Uploader for PasteUploader {
    fn name(&self) -> &str {
        "paste"
    }

    fn kind(&self) -> UploaderKind {
        UploaderKind::Text
    }

    fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }

    async fn upload(&self, artifact: &Artifact) -> Result<String, UploadError> {
        if !self.is_configured() {
            return Err(UploadError::NotConfigured("paste url".to_string()));
        }
        ensure_accepts(self, artifact)?;

        let resp = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(artifact.data.clone())
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

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn posts_raw_text_and_reads_link() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body("hello world")
            .with_status(201)
            .with_body("https://paste.rs/Abc\n")
            .create_async()
            .await;

        let uploader = PasteUploader::new(
            reqwest::Client::new(),
            &PasteConfig {
                url: format!("{}/", server.url()),
            },
        );
        let link = uploader
            .upload(&Artifact::text("hello world".into(), "note.txt"))
            .await
            .unwrap();
        assert_eq!(link, "https://paste.rs/Abc");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_link_body_is_invalid() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let uploader = PasteUploader::new(
            reqwest::Client::new(),
            &PasteConfig {
                url: format!("{}/", server.url()),
            },
        );
        let err = uploader
            .upload(&Artifact::text("x".into(), "note.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::InvalidResponse(_)));
    }
}
