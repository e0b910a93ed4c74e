//! Transport Traits
//!
//! A [`PatchSource`] turns a [`GenerateRequest`] into a stream of raw byte
//! chunks. Chunk boundaries are arbitrary; framing happens downstream.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use thiserror::Error;

/// Chunked response body
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

/// Errors raised by a patch source
#[derive(Debug, Error)]
pub enum TransportError {
    /// The producer answered with a non-success status
    #[error("producer returned status {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// The request could not be sent
    #[error("request failed: {0}")]
    Request(String),

    /// The body failed mid-stream
    #[error("stream failed: {0}")]
    Stream(String),

    /// Local I/O failure (file replay)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A generation request handed to the producer
///
/// The prompt length cap is the caller's responsibility.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GenerateRequest {
    /// Free-text instruction
    pub prompt: String,
}

impl GenerateRequest {
    /// Create a request for `prompt`
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

/// Source of patch bytes
///
/// Implement this trait to plug a different producer into the session
/// controller.
#[async_trait]
pub trait PatchSource: Send + Sync {
    /// Source name for logs (e.g. "http", "memory")
    fn name(&self) -> &str;

    /// Open a response stream for `request`
    ///
    /// A non-success status must be reported here, before any body is read.
    async fn open(&self, request: &GenerateRequest) -> Result<ByteStream, TransportError>;
}
