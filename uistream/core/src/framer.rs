//! Line Framing
//!
//! Recovers newline-delimited records from a byte stream whose chunking has
//! nothing to do with record boundaries.
//!
//! ```text
//! chunk 1: {"op":"set","pa
//! chunk 2: th":"/root","value":"form"}\n{"op":"add",
//! chunk 3: ...}\n
//!          └──────────── carried in `pending` ────────────┘
//! ```
//!
//! The unterminated tail of every chunk is carried into the next one. Lines
//! are decoded only once complete, so a multi-byte UTF-8 character split
//! across two chunks is reassembled before decoding.

/// Minimum buffer capacity for the pending tail
const MIN_BUFFER_CAPACITY: usize = 1024;

/// Incremental newline framer
#[derive(Debug)]
pub struct LineFramer {
    /// Bytes received after the last newline
    pending: Vec<u8>,
    /// Complete lines emitted so far
    emitted: usize,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    /// Create an empty framer
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(MIN_BUFFER_CAPACITY),
            emitted: 0,
        }
    }

    /// Feed a chunk of bytes, returning every line it completed
    ///
    /// Lines exclude the terminating `\n`. Empty lines are emitted too; the
    /// parser decides what to skip.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let line = if self.pending.is_empty() {
                String::from_utf8_lossy(&rest[..pos]).into_owned()
            } else {
                self.pending.extend_from_slice(&rest[..pos]);
                let line = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                line
            };
            lines.push(line);
            rest = &rest[pos + 1..];
        }

        self.pending.extend_from_slice(rest);
        self.emitted += lines.len();
        lines
    }

    /// Feed a chunk of text
    pub fn push_str(&mut self, chunk: &str) -> Vec<String> {
        self.push(chunk.as_bytes())
    }

    /// Signal end of stream
    ///
    /// Returns the unterminated tail if it holds anything besides whitespace.
    /// The framer is empty afterwards and can be reused.
    pub fn finish(&mut self) -> Option<String> {
        let tail = std::mem::take(&mut self.pending);
        let text = String::from_utf8_lossy(&tail);
        if text.trim().is_empty() {
            return None;
        }
        self.emitted += 1;
        Some(text.into_owned())
    }

    /// Bytes buffered waiting for a newline
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Total lines emitted, including a flushed tail
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}
