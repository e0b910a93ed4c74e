//! Observer Events
//!
//! Everything a renderer learns about a running session arrives as a
//! [`StreamEvent`]. The stream controller and the playback engine emit the
//! same events, so one consumer loop (typically feeding a
//! [`SessionView`](crate::view::SessionView)) handles both.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::tree::Tree;

/// Session identifier
///
/// Allocated from a process-wide counter, so a larger id always belongs to a
/// later session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Allocate the next session id
    #[must_use]
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session_{}", self.0)
    }
}

/// Event published to observers
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A session or playback began
    Started {
        /// Session this event belongs to
        session: SessionId,
        /// Producer instruction
        prompt: String,
    },

    /// Playback revealed more of its prompt
    PromptTyped {
        /// Session this event belongs to
        session: SessionId,
        /// Prompt text revealed so far
        typed: String,
    },

    /// One line was processed; `tree` is the snapshot after it
    Patch {
        /// Session this event belongs to
        session: SessionId,
        /// Snapshot after applying the line
        tree: Tree,
        /// Raw line text
        line: String,
    },

    /// The producer finished and the tail was flushed
    Completed {
        /// Session this event belongs to
        session: SessionId,
        /// Number of lines processed
        lines: usize,
    },

    /// The session was cancelled explicitly (not superseded)
    Cancelled {
        /// Session this event belongs to
        session: SessionId,
    },

    /// The transport failed
    Failed {
        /// Session this event belongs to
        session: SessionId,
        /// Error description
        error: String,
    },
}

impl StreamEvent {
    /// Session this event belongs to
    #[must_use]
    pub fn session(&self) -> SessionId {
        match self {
            Self::Started { session, .. }
            | Self::PromptTyped { session, .. }
            | Self::Patch { session, .. }
            | Self::Completed { session, .. }
            | Self::Cancelled { session }
            | Self::Failed { session, .. } => *session,
        }
    }

    /// Whether this event ends its session
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Cancelled { .. } | Self::Failed { .. }
        )
    }
}
