//! Timeout and retry wrapper around single adapter calls.

use super::{UploadError, Uploader};
use crate::artifact::Artifact;
use crate::config::UploadConfig;
use log::{error, warn};
use std::time::Duration;
use tokio::time::{sleep, timeout};

#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    timeout: Duration,
    retry_attempts: u32,
    retry_backoff: Duration,
}

impl UploadPolicy {
    pub fn new(timeout: Duration, retry_attempts: u32, retry_backoff: Duration) -> Self {
        Self {
            timeout,
            retry_attempts,
            retry_backoff,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(
            Duration::from_secs(config.timeout_secs),
            u32::from(config.retry_transient),
            Duration::from_millis(config.retry_backoff_ms),
        )
    }

    /// Calls `uploader`, bounding every attempt by the timeout and retrying transient
    /// failures.
    pub async fn run(&self, uploader: &dyn Uploader, artifact: &Artifact) -> Result<String, UploadError> {
        let op = uploader.name();
        let mut attempt = 0;
        loop {
            let result = match timeout(self.timeout, uploader.upload(artifact)).await {
                Ok(result) => result,
                Err(_) => Err(UploadError::Timeout(self.timeout)),
            };

            match result {
                Ok(url) => return Ok(url),
                Err(err) => {
                    if attempt == self.retry_attempts || !err.is_transient() {
                        error!("Upload to {} failed after {} attempts: {}", op, attempt + 1, err);
                        return Err(err);
                    }
                    let backoff = self.retry_backoff * (attempt + 1);
                    warn!(
                        "Upload to {} failed (attempt {}): {}. retrying in {:?}",
                        op,
                        attempt + 1,
                        err,
                        backoff
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::UploaderKind;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct Scripted {
        calls: Arc<Mutex<usize>>,
        responses: Mutex<Vec<Result<String, UploadError>>>,
        delay: Duration,
    }

    impl Scripted {
        fn new(responses: Vec<Result<String, UploadError>>) -> Self {
            Self {
                calls: Arc::new(Mutex::new(0)),
                responses: Mutex::new(responses),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl Uploader for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn kind(&self) -> UploaderKind {
            UploaderKind::Image
        }

        async fn upload(&self, _: &Artifact) -> Result<String, UploadError> {
            *self.calls.lock().unwrap() += 1;
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Err(UploadError::Network("script exhausted".into()))
            } else {
                responses.remove(0)
            }
        }
    }

    fn artifact() -> Artifact {
        Artifact::image(vec![1], "a.png", "image/png")
    }

    fn policy() -> UploadPolicy {
        UploadPolicy::new(Duration::from_secs(5), 1, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once() {
        let uploader = Scripted::new(vec![
            Err(UploadError::Network("reset".into())),
            Ok("https://x/1".into()),
        ]);
        let result = policy().run(&uploader, &artifact()).await.unwrap();
        assert_eq!(result, "https://x/1");
        assert_eq!(*uploader.calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let uploader = Scripted::new(vec![Err(UploadError::Api {
            status: 401,
            body: "nope".into(),
        })]);
        let err = policy().run(&uploader, &artifact()).await.unwrap_err();
        assert!(matches!(err, UploadError::Api { status: 401, .. }));
        assert_eq!(*uploader.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn retry_budget_is_one() {
        let uploader = Scripted::new(vec![
            Err(UploadError::Network("a".into())),
            Err(UploadError::Network("b".into())),
            Ok("never".into()),
        ]);
        let err = policy().run(&uploader, &artifact()).await.unwrap_err();
        assert!(err.to_string().contains("b"));
        assert_eq!(*uploader.calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn slow_adapter_times_out() {
        let mut uploader = Scripted::new(vec![Ok("late".into()), Ok("late".into())]);
        uploader.delay = Duration::from_secs(2);
        let policy = UploadPolicy::new(Duration::from_millis(20), 1, Duration::from_millis(1));

        let err = policy.run(&uploader, &artifact()).await.unwrap_err();
        assert!(matches!(err, UploadError::Timeout(_)));
        assert_eq!(*uploader.calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn retries_can_be_disabled() {
        let config = UploadConfig {
            retry_transient: false,
            ..UploadConfig::default()
        };
        let uploader = Scripted::new(vec![Err(UploadError::Network("down".into()))]);
        assert!(
            UploadPolicy::from_config(&config)
                .run(&uploader, &artifact())
                .await
                .is_err()
        );
        assert_eq!(*uploader.calls.lock().unwrap(), 1);
    }
}
