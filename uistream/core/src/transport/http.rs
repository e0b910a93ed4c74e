//! HTTP Patch Source
//!
//! POSTs a [`GenerateRequest`] as JSON to a generator endpoint and streams
//! the newline-delimited response body. Request signing and auth live in
//! front of the endpoint, not here.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use super::traits::{ByteStream, GenerateRequest, PatchSource, TransportError};
use crate::config::TransportSettings;

/// Streaming HTTP client for a patch generator
#[derive(Clone, Debug)]
pub struct HttpSource {
    /// Generator URL
    endpoint: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpSource {
    /// Create a source from transport settings
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Request` if the HTTP client cannot be built.
    pub fn new(settings: &TransportSettings) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(settings.connect_timeout_ms));
        // Zero disables the overall timeout; long generations are normal
        if settings.request_timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(settings.request_timeout_ms));
        }
        let http_client = builder
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            endpoint: settings.endpoint.clone(),
            http_client,
        })
    }

    /// Generator URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PatchSource for HttpSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn open(&self, request: &GenerateRequest) -> Result<ByteStream, TransportError> {
        tracing::debug!(endpoint = %self.endpoint, prompt_len = request.prompt.len(), "Opening patch stream");

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        // The body of an error response is never parsed as patches
        if !response.status().is_success() {
            return Err(TransportError::Status {
                status: response.status().as_u16(),
            });
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| TransportError::Stream(e.to_string()))
        });

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_source_creation() {
        let settings = TransportSettings {
            endpoint: "http://example.com/api/generate".to_string(),
            ..Default::default()
        };
        let source = HttpSource::new(&settings).unwrap();
        assert_eq!(source.endpoint(), "http://example.com/api/generate");
        assert_eq!(source.name(), "http");
    }

    #[tokio::test]
    async fn test_connection_refused_is_request_error() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let settings = TransportSettings {
            endpoint: format!("http://127.0.0.1:{port}/generate"),
            connect_timeout_ms: 1000,
            ..Default::default()
        };
        let source = HttpSource::new(&settings).unwrap();
        let result = source.open(&GenerateRequest::new("x")).await;
        assert!(matches!(result, Err(TransportError::Request(_))));
    }
}
