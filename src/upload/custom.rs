//! User-defined multipart uploaders.
//!
//! The response URL is extracted with a JSON dot path (`data.files.0.url`), a regex whose
//! first capture group is the URL, or, when neither is set, the trimmed response body.

use super::{UploadError, Uploader, UploaderKind, ensure_accepts, link_from_body, truncate_for_log};
use crate::artifact::{Artifact, ContentKind};
use crate::config::CustomUploaderConfig;
use async_trait::async_trait;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
enum ResponseParser {
    JsonPath(Vec<String>),
    Regex(Regex),
    Body,
}

impl ResponseParser {
    fn extract(&self, uploader: &str, body: &str) -> Result<String, UploadError> {
        match self {
            ResponseParser::Body => link_from_body(uploader, body),
            ResponseParser::Regex(re) => {
                let link = re
                    .captures(body)
                    .and_then(|caps| caps.get(1).or_else(|| caps.get(0)))
                    .map(|m| m.as_str().to_string())
                    .ok_or_else(|| {
                        UploadError::InvalidResponse(format!(
                            "{}: pattern did not match {}",
                            uploader,
                            truncate_for_log(body)
                        ))
                    })?;
                link_from_body(uploader, &link)
            }
            ResponseParser::JsonPath(segments) => {
                let root: Value = serde_json::from_str(body).map_err(|e| {
                    UploadError::InvalidResponse(format!("{}: {}", uploader, e))
                })?;
                let found = json_lookup(&root, segments).ok_or_else(|| {
                    UploadError::InvalidResponse(format!(
                        "{}: no value at '{}'",
                        uploader,
                        segments.join(".")
                    ))
                })?;
                match found {
                    Value::String(s) => link_from_body(uploader, s),
                    other => link_from_body(uploader, &other.to_string()),
                }
            }
        }
    }
}

fn json_lookup<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

pub struct CustomUploader {
    http: reqwest::Client,
    name: String,
    kind: UploaderKind,
    request_url: String,
    file_form_name: String,
    arguments: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    parser: ResponseParser,
}

impl CustomUploader {
    /// Fails when the configured regex does not compile.
    pub fn new(http: reqwest::Client, config: &CustomUploaderConfig) -> Result<Self, regex::Error> {
        let parser = match (&config.json_path, &config.regex) {
            (Some(path), _) if !path.trim().is_empty() => ResponseParser::JsonPath(
                path.trim()
                    .split('.')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            (_, Some(pattern)) if !pattern.trim().is_empty() => {
                ResponseParser::Regex(Regex::new(pattern)?)
            }
            _ => ResponseParser::Body,
        };

        Ok(Self {
            http,
            name: config.name.clone(),
            kind: config.kind.into(),
            request_url: config.request_url.clone(),
            file_form_name: config.file_form_name.clone(),
            arguments: config.arguments.clone(),
            headers: config.headers.clone(),
            parser,
        })
    }

    fn form(&self, artifact: &Artifact) -> Result<Form, UploadError> {
        let mut form = Form::new();
        for (key, value) in &self.arguments {
            form = form.text(key.clone(), value.clone());
        }

        form = match (self.kind, artifact.kind()) {
            (UploaderKind::Text, ContentKind::Text) => form.text(
                self.file_form_name.clone(),
                artifact.as_text().unwrap_or_default().to_string(),
            ),
            _ => {
                let part = Part::bytes(artifact.data.clone())
                    .file_name(artifact.file_name.clone())
                    .mime_str(&artifact.mime_type)?;
                form.part(self.file_form_name.clone(), part)
            }
        };
        Ok(form)
    }
}

#[async_trait]
impl Uploader for CustomUploader {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UploaderKind {
        self.kind
    }

    async fn upload(&self, artifact: &Artifact) -> Result<String, UploadError> {
        ensure_accepts(self, artifact)?;

        let mut request = self.http.post(&self.request_url).multipart(self.form(artifact)?);
        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let resp = request.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(UploadError::Api {
                status: status.as_u16(),
                body: truncate_for_log(&body),
            });
        }

        self.parser.extract(&self.name, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CustomUploaderKind;
    use mockito::{Matcher, Server};

    fn config(url: String, kind: CustomUploaderKind) -> CustomUploaderConfig {
        CustomUploaderConfig {
            name: "host".into(),
            kind,
            request_url: url,
            file_form_name: "upload".into(),
            arguments: BTreeMap::from([("key".to_string(), "s3cret".to_string())]),
            headers: BTreeMap::from([("X-Token".to_string(), "t0k".to_string())]),
            json_path: None,
            regex: None,
        }
    }

    #[tokio::test]
    async fn json_path_extracts_nested_link() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/up")
            .match_header("x-token", "t0k")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="key""#.into()),
                Matcher::Regex("s3cret".into()),
                Matcher::Regex(r#"name="upload"; filename="shot.png""#.into()),
            ]))
            .with_status(200)
            .with_body(r#"{"files":[{"url":"https://cdn.example.com/shot.png"}]}"#)
            .create_async()
            .await;

        let mut cfg = config(format!("{}/up", server.url()), CustomUploaderKind::Image);
        cfg.json_path = Some("files.0.url".into());
        let uploader = CustomUploader::new(reqwest::Client::new(), &cfg).unwrap();

        let link = uploader
            .upload(&Artifact::image(vec![1, 2, 3], "shot.png", "image/png"))
            .await
            .unwrap();
        assert_eq!(link, "https://cdn.example.com/shot.png");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn regex_uses_first_capture_group() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/up")
            .with_status(200)
            .with_body("<a href=\"https://files.example.com/abc\">done</a>")
            .create_async()
            .await;

        let mut cfg = config(format!("{}/up", server.url()), CustomUploaderKind::Text);
        cfg.regex = Some(r#"href="([^"]+)""#.into());
        let uploader = CustomUploader::new(reqwest::Client::new(), &cfg).unwrap();

        let link = uploader
            .upload(&Artifact::text("notes".into(), "notes.txt"))
            .await
            .unwrap();
        assert_eq!(link, "https://files.example.com/abc");
    }

    #[tokio::test]
    async fn missing_json_key_is_invalid_response() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/up")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let mut cfg = config(format!("{}/up", server.url()), CustomUploaderKind::File);
        cfg.json_path = Some("data.link".into());
        let uploader = CustomUploader::new(reqwest::Client::new(), &cfg).unwrap();

        let err = uploader
            .upload(&Artifact::from_file(std::path::Path::new("a.zip"), vec![0]))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::InvalidResponse(_)));
    }

    #[test]
    fn bad_regex_is_rejected_at_construction() {
        let mut cfg = config("https://example.com".into(), CustomUploaderKind::Image);
        cfg.regex = Some("(unclosed".into());
        assert!(CustomUploader::new(reqwest::Client::new(), &cfg).is_err());
    }
}
