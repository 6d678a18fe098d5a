//! Anonymous Imgur image uploads.

use super::{UploadError, Uploader, UploaderKind, ensure_accepts, is_valid_link, truncate_for_log};
use crate::artifact::Artifact;
use crate::config::ImgurConfig;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ImgurResponse {
    data: ImgurData,
}

#[derive(Debug, Deserialize)]
struct ImgurData {
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

pub struct ImgurUploader {
    http: reqwest::Client,
    client_id: String,
    api_url: String,
}

impl ImgurUploader {
    pub fn new(http: reqwest::Client, config: &ImgurConfig) -> Self {
        Self {
            http,
            client_id: config.client_id.trim().to_string(),
            api_url: config.api_url.clone(),
        }
    }
}

#[async_trait]
impl Uploader for ImgurUploader {
    fn name(&self) -> &str {
        "imgur"
    }

    fn kind(&self) -> UploaderKind {
        UploaderKind::Image
    }

    fn is_configured(&self) -> bool {
        !self.client_id.is_empty()
    }

    async fn upload(&self, artifact: &Artifact) -> Result<String, UploadError> {
        if !self.is_configured() {
            return Err(UploadError::NotConfigured("imgur client_id".to_string()));
        }
        ensure_accepts(self, artifact)?;

        let part = Part::bytes(artifact.data.clone())
            .file_name(artifact.file_name.clone())
            .mime_str(&artifact.mime_type)?;
        let form = Form::new().part("image", part).text("type", "file");

        let resp = self
            .http
            .post(&self.api_url)
            .header(AUTHORIZATION, format!("Client-ID {}", self.client_id))
            .multipart(form)
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

        let parsed: ImgurResponse = serde_json::from_str(&body)
            .map_err(|e| UploadError::InvalidResponse(format!("imgur: {}", e)))?;
        match parsed.data.link {
            Some(link) if is_valid_link(&link) => Ok(link),
            _ => Err(UploadError::InvalidResponse(format!(
                "imgur returned no link{}",
                parsed
                    .data
                    .error
                    .map(|e| format!(": {}", e))
                    .unwrap_or_default()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn uploader(url: String, client_id: &str) -> ImgurUploader {
        ImgurUploader::new(
            reqwest::Client::new(),
            &ImgurConfig {
                client_id: client_id.to_string(),
                api_url: url,
            },
        )
    }

    fn png() -> Artifact {
        Artifact::image(vec![0x89, b'P', b'N', b'G'], "shot.png", "image/png")
    }

    #[tokio::test]
    async fn returns_link_from_json() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/3/image")
            .match_header("authorization", "Client-ID abc123")
            .match_header("content-type", Matcher::Regex("multipart/form-data".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":{"link":"https://i.imgur.com/xyz.png"},"success":true,"status":200}"#)
            .create_async()
            .await;

        let url = uploader(format!("{}/3/image", server.url()), "abc123")
            .upload(&png())
            .await
            .unwrap();
        assert_eq!(url, "https://i.imgur.com/xyz.png");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_are_transient() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/3/image")
            .with_status(503)
            .with_body("over capacity")
            .create_async()
            .await;

        let err = uploader(format!("{}/3/image", server.url()), "abc123")
            .upload(&png())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Api { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn missing_client_id_is_not_configured() {
        let err = uploader("http://127.0.0.1:9".into(), "  ")
            .upload(&png())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn text_is_rejected() {
        let err = uploader("http://127.0.0.1:9".into(), "abc")
            .upload(&Artifact::text("hello".into(), "a.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Unsupported { .. }));
    }
}
