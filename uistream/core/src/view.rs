//! Session View
//!
//! Consumer-side accumulator for [`StreamEvent`]s: the current snapshot, the
//! ordered raw-line log, and a coarse status a renderer can switch on. Both
//! the live controller and playback feed it, so it is the uniform shape the
//! rest of a UI sees.

use crate::events::{SessionId, StreamEvent};
use crate::tree::Tree;

/// Coarse display status
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ViewStatus {
    /// Nothing running
    #[default]
    Idle,
    /// Playback is revealing its prompt
    Typing,
    /// Lines are arriving
    Streaming,
    /// The last session finished normally
    Completed,
    /// The last session was cancelled; not an error
    Cancelled,
    /// The last session failed
    Failed(String),
}

impl ViewStatus {
    /// Whether a session is still running
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Typing | Self::Streaming)
    }
}

/// Accumulated state of the most recent session
#[derive(Clone, Debug, Default)]
pub struct SessionView {
    session: Option<SessionId>,
    prompt: String,
    typed: String,
    tree: Tree,
    lines: Vec<String>,
    status: ViewStatus,
}

impl SessionView {
    /// Create an idle view
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the view
    ///
    /// A `Started` event for a newer session resets the view. Events from any
    /// other session are ignored. Returns whether the view changed.
    pub fn apply(&mut self, event: &StreamEvent) -> bool {
        if let StreamEvent::Started { session, prompt } = event {
            if self.session.is_some_and(|current| current > *session) {
                return false;
            }
            *self = Self {
                session: Some(*session),
                prompt: prompt.clone(),
                ..Self::default()
            };
            self.status = ViewStatus::Streaming;
            return true;
        }

        if self.session != Some(event.session()) {
            return false;
        }

        match event {
            StreamEvent::PromptTyped { typed, .. } => {
                self.typed.clone_from(typed);
                self.status = ViewStatus::Typing;
            }
            StreamEvent::Patch { tree, line, .. } => {
                self.tree = tree.clone();
                self.lines.push(line.clone());
                self.status = ViewStatus::Streaming;
            }
            StreamEvent::Completed { .. } => self.status = ViewStatus::Completed,
            StreamEvent::Cancelled { .. } => self.status = ViewStatus::Cancelled,
            StreamEvent::Failed { error, .. } => self.status = ViewStatus::Failed(error.clone()),
            StreamEvent::Started { .. } => return false,
        }
        true
    }

    /// Session currently shown
    #[must_use]
    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    /// Prompt of the current session
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Prompt text revealed so far (playback only)
    #[must_use]
    pub fn typed(&self) -> &str {
        &self.typed
    }

    /// Latest snapshot
    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Raw lines in arrival order
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Raw lines joined for raw-stream display
    #[must_use]
    pub fn raw_text(&self) -> String {
        self.lines.join("\n")
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> &ViewStatus {
        &self.status
    }
}
