//! One-byte source probe run before a remux process is started.
//!
//! Signed stream locators expire. Probing them up front turns an expired
//! link into a clean error response instead of a failed ffmpeg run after the
//! download has already begun.

use std::time::Duration;

use reqwest::header::RANGE;
use tracing::debug;

use super::{InputRole, RemuxError};
use crate::catalog::redact_locator;

/// HTTP probe for remux inputs.
#[derive(Debug, Clone)]
pub struct SourceProbe {
    client: reqwest::Client,
}

impl SourceProbe {
    /// Creates a probe whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Requests the first byte of `locator`.
    ///
    /// Locators that are not http(s) URLs are left for the remuxer to open.
    ///
    /// # Errors
    ///
    /// - `RemuxError::SourceRejected` - Source answered 401, 403 or 410
    /// - `RemuxError::SourceUnavailable` - Source unreachable, timed out or
    ///   answered with another error status
    pub async fn check(&self, input: InputRole, locator: &str) -> Result<(), RemuxError> {
        let url = match url::Url::parse(locator) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => return Ok(()),
        };

        let response = self
            .client
            .get(url)
            .header(RANGE, "bytes=0-0")
            .send()
            .await
            .map_err(|e| RemuxError::SourceUnavailable {
                input,
                reason: if e.is_timeout() {
                    "probe timed out".to_string()
                } else {
                    e.without_url().to_string()
                },
            })?;

        let status = response.status();
        debug!(
            "Probed {} source at {}: HTTP {}",
            input,
            redact_locator(locator),
            status.as_u16()
        );

        match status.as_u16() {
            401 | 403 | 410 => Err(RemuxError::SourceRejected {
                input,
                status: status.as_u16(),
            }),
            _ if status.is_client_error() || status.is_server_error() => {
                Err(RemuxError::SourceUnavailable {
                    input,
                    reason: format!("HTTP {}", status.as_u16()),
                })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serves one canned HTTP response per connection.
    async fn serve_status(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 1024];
                let _ = socket.read(&mut request).await;
                let response =
                    format!("HTTP/1.1 {status_line}\r\nContent-Length: 1\r\nConnection: close\r\n\r\nx");
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{addr}/stream?sig=abc")
    }

    #[tokio::test]
    async fn test_forbidden_source_is_rejected() {
        let locator = serve_status("403 Forbidden").await;
        let probe = SourceProbe::new(Duration::from_secs(2)).unwrap();

        let result = probe.check(InputRole::Video, &locator).await;
        assert!(matches!(
            result,
            Err(RemuxError::SourceRejected {
                input: InputRole::Video,
                status: 403
            })
        ));
    }

    #[tokio::test]
    async fn test_partial_content_passes() {
        let locator = serve_status("206 Partial Content").await;
        let probe = SourceProbe::new(Duration::from_secs(2)).unwrap();
        assert!(probe.check(InputRole::Audio, &locator).await.is_ok());
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let locator = serve_status("503 Service Unavailable").await;
        let probe = SourceProbe::new(Duration::from_secs(2)).unwrap();
        assert!(matches!(
            probe.check(InputRole::Audio, &locator).await,
            Err(RemuxError::SourceUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_non_http_locators_are_skipped() {
        let probe = SourceProbe::new(Duration::from_millis(100)).unwrap();
        assert!(probe.check(InputRole::Video, "/tmp/video.mp4").await.is_ok());
        assert!(probe.check(InputRole::Audio, "file:///tmp/a.m4a").await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_source_is_unavailable() {
        let probe = SourceProbe::new(Duration::from_millis(500)).unwrap();
        // Port 9 on localhost is closed on test hosts
        let result = probe.check(InputRole::Audio, "http://127.0.0.1:9/audio").await;
        assert!(matches!(
            result,
            Err(RemuxError::SourceUnavailable {
                input: InputRole::Audio,
                ..
            })
        ));
    }
}
