use crate::error::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;
use url::Url;

/// Backend used when `BACKDROP_BACKEND_URL` is not set.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Path of the segmentation endpoint, relative to the backend base URL.
pub const PROCESS_IMAGE_PATH: &str = "process-image";

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_WINDOW_SIZE: [f32; 2] = [1280.0, 860.0];

#[derive(Clone, Debug)]
pub struct Config {
    pub backend_url: Url,
    pub request_timeout: Duration,
    pub window_size: [f32; 2],
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();

        let mut builder = Self::builder();

        if let Ok(url) = env::var("BACKDROP_BACKEND_URL") {
            builder = builder.with_backend_url(url);
        }

        if let Ok(raw) = env::var("BACKDROP_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                AppError::Config(format!(
                    "BACKDROP_REQUEST_TIMEOUT_SECS must be a whole number of seconds, got {:?}",
                    raw
                ))
            })?;
            builder = builder.with_request_timeout(Duration::from_secs(secs));
        }

        builder.build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Full URL of the `process-image` endpoint.
    ///
    /// The base URL may carry a path prefix (`https://host/api`), with or
    /// without a trailing slash; the endpoint is always appended to it.
    pub fn process_endpoint(&self) -> Result<Url> {
        let mut base = self.backend_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(PROCESS_IMAGE_PATH)
            .map_err(|e| AppError::Config(format!("Invalid endpoint URL: {}", e)))
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    backend_url: Option<String>,
    request_timeout: Option<Duration>,
    window_size: Option<[f32; 2]>,
}

impl ConfigBuilder {
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_window_size(mut self, width: f32, height: f32) -> Self {
        self.window_size = Some([width, height]);
        self
    }

    pub fn build(self) -> Result<Config> {
        let raw = self
            .backend_url
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let backend_url = Url::parse(raw.trim())
            .map_err(|e| AppError::Config(format!("Invalid backend URL {:?}: {}", raw, e)))?;
        if !matches!(backend_url.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "Backend URL must use http or https, got {:?}",
                backend_url.scheme()
            )));
        }

        let request_timeout = self
            .request_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        if request_timeout.is_zero() {
            return Err(AppError::config("Request timeout must be greater than zero"));
        }

        Ok(Config {
            backend_url,
            request_timeout,
            window_size: self.window_size.unwrap_or(DEFAULT_WINDOW_SIZE),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(base: &str) -> String {
        Config::builder()
            .with_backend_url(base)
            .build()
            .unwrap()
            .process_endpoint()
            .unwrap()
            .to_string()
    }

    #[test]
    fn endpoint_is_appended_to_base() {
        assert_eq!(endpoint("http://localhost:8000"), "http://localhost:8000/process-image");
        assert_eq!(endpoint("http://localhost:8000/"), "http://localhost:8000/process-image");
    }

    #[test]
    fn endpoint_keeps_path_prefix() {
        assert_eq!(endpoint("https://example.com/api"), "https://example.com/api/process-image");
        assert_eq!(endpoint("https://example.com/api/"), "https://example.com/api/process-image");
    }

    #[test]
    fn rejects_non_http_schemes() {
        let err = Config::builder().with_backend_url("ftp://example.com").build();
        assert!(matches!(err, Err(AppError::Config(_))));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = Config::builder().with_request_timeout(Duration::ZERO).build();
        assert!(matches!(err, Err(AppError::Config(_))));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::builder().build().unwrap();
        assert_eq!(config.backend_url.as_str(), "http://localhost:8000/");
        assert_eq!(config.request_timeout, Duration::from_secs(120));
    }
}
