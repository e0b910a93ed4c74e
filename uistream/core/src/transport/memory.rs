//! In-Memory Patch Source
//!
//! Replays a fixed list of chunks for every request. Used to replay recorded
//! streams through the full pipeline and as a deterministic producer in tests.

use async_trait::async_trait;
use futures::StreamExt;

use super::traits::{ByteStream, GenerateRequest, PatchSource, TransportError};

/// Fixed-chunk patch source
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    chunks: Vec<Vec<u8>>,
}

impl MemorySource {
    /// Replay exactly these chunks
    #[must_use]
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self { chunks }
    }

    /// Split `data` into chunks of `chunk_size` bytes (at least one byte)
    #[must_use]
    pub fn chunked(data: &[u8], chunk_size: usize) -> Self {
        let size = chunk_size.max(1);
        Self {
            chunks: data.chunks(size).map(<[u8]>::to_vec).collect(),
        }
    }

    /// Read a recorded stream from disk
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Io` if the file cannot be read.
    pub async fn from_file(
        path: impl AsRef<std::path::Path>,
        chunk_size: usize,
    ) -> Result<Self, TransportError> {
        let data = tokio::fs::read(path).await?;
        Ok(Self::chunked(&data, chunk_size))
    }

    /// Number of chunks replayed per request
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

#[async_trait]
impl PatchSource for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn open(&self, _request: &GenerateRequest) -> Result<ByteStream, TransportError> {
        let chunks = self.chunks.clone();
        Ok(futures::stream::iter(chunks.into_iter().map(Ok)).boxed())
    }
}
