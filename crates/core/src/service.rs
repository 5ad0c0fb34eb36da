use crate::asset::ImageAsset;
use crate::config::Config;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use url::Url;

/// Multipart field the segmentation service reads the upload from.
pub const UPLOAD_FIELD: &str = "file";

const ERROR_BODY_PREVIEW: usize = 256;

/// Remote background segmentation.
///
/// Implementations take the raw upload and return the encoded response
/// image, which is expected to carry an alpha channel.
#[async_trait]
pub trait SegmentationService: Send + Sync {
    async fn process_image(&self, raw: &ImageAsset) -> Result<Vec<u8>>;
}

pub struct HttpSegmentationClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpSegmentationClient {
    pub fn new(config: &Config) -> Result<Self> {
        let endpoint = config.process_endpoint()?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl SegmentationService for HttpSegmentationClient {
    /// Posts the raw bytes as a multipart form and returns the response body.
    async fn process_image(&self, raw: &ImageAsset) -> Result<Vec<u8>> {
        let part = Part::bytes(raw.bytes().to_vec())
            .file_name(raw.name().to_string())
            .mime_str(raw.mime_type())
            .map_err(|e| AppError::network(format!("Invalid upload MIME type: {}", e)))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        tracing::debug!(endpoint = %self.endpoint, bytes = raw.len(), "posting image");

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::network(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            return Err(AppError::ServiceStatus {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::network(format!("Failed to read response body: {}", e)))?;

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accepts one connection, captures the full request and answers with
    /// the given status line and body.
    async fn one_shot_server(status: &'static str, body: &'static [u8]) -> (Url, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];

            let header_end = loop {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed before sending headers");
                request.extend_from_slice(&buf[..n]);
                if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };

            let headers = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
            let content_length: usize = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse().unwrap())
                .unwrap_or(0);

            while request.len() < header_end + content_length {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let head = format!(
                "HTTP/1.1 {}\r\ncontent-length: {}\r\ncontent-type: application/octet-stream\r\nconnection: close\r\n\r\n",
                status,
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });

        (Url::parse(&format!("http://{}", addr)).unwrap(), handle)
    }

    fn client_for(base: &Url) -> HttpSegmentationClient {
        let config = Config::builder()
            .with_backend_url(base.as_str())
            .with_request_timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        HttpSegmentationClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn posts_multipart_file_field_and_returns_body() {
        let (base, server) = one_shot_server("200 OK", b"PROCESSED").await;
        let client = client_for(&base);

        let raw = ImageAsset::from_bytes("cat.jpg", b"RAWBYTES".to_vec());
        let body = client.process_image(&raw).await.unwrap();
        assert_eq!(body, b"PROCESSED");

        let request = String::from_utf8_lossy(&server.await.unwrap()).into_owned();
        assert!(request.starts_with("POST /process-image HTTP/1.1"));
        assert!(request.contains("multipart/form-data"));
        assert!(request.contains("name=\"file\""));
        assert!(request.contains("filename=\"cat.jpg\""));
        assert!(request.contains("RAWBYTES"));
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let (base, server) = one_shot_server("500 Internal Server Error", b"model crashed").await;
        let client = client_for(&base);

        let raw = ImageAsset::from_bytes("cat.jpg", b"RAWBYTES".to_vec());
        let err = client.process_image(&raw).await.unwrap_err();
        match err {
            AppError::ServiceStatus { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "model crashed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_network_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(&Url::parse(&format!("http://{}", addr)).unwrap());
        let raw = ImageAsset::from_bytes("cat.jpg", b"RAWBYTES".to_vec());
        assert!(matches!(client.process_image(&raw).await, Err(AppError::Network(_))));
    }
}
