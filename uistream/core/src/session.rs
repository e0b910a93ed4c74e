//! Stream Session Controller
//!
//! Orchestrates one generation request at a time:
//!
//! ```text
//!   PatchSource ──bytes──► LineFramer ──lines──► classify_line ──► Tree::apply
//!                                                                    │
//!                                      mpsc::Sender<StreamEvent> ◄───┘ (per line)
//! ```
//!
//! # Lifecycle
//!
//! `Idle → Active → Completed | Cancelled | Failed`. Starting a new session
//! cancels the active one (last request wins). A failed or cancelled session
//! leaves the controller ready for the next `start`.
//!
//! # Ordering
//!
//! Every publish goes through a gate shared by all sessions of one
//! controller, and re-checks the session's cancel flag while holding it. A
//! superseded session is cancelled before its successor is spawned, so it
//! can never publish after the successor's first event. A superseded
//! session publishes nothing further; an explicitly cancelled one publishes
//! `Cancelled`.

use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

use crate::cancel::{send_cancel_notice, CancelSignal};
use crate::events::{SessionId, StreamEvent};
use crate::framer::LineFramer;
use crate::patch::{classify_line, LineKind};
use crate::transport::{GenerateRequest, PatchSource, TransportError};
use crate::tree::Tree;

/// Controller state, as seen by callers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No session has been started
    #[default]
    Idle,
    /// A session is streaming
    Active,
    /// The last session finished normally
    Completed,
    /// The last session was cancelled
    Cancelled,
    /// The last session hit a transport fault
    Failed,
}

impl SessionState {
    /// Whether this is a terminal state
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// Final state of one session
#[derive(Clone, Debug)]
pub struct SessionOutcome {
    /// Session id
    pub id: SessionId,
    /// Terminal state
    pub state: SessionState,
    /// Last published snapshot
    pub tree: Tree,
    /// Raw lines published, in order
    pub lines: Vec<String>,
    /// Transport error description, for `Failed`
    pub error: Option<String>,
}

/// Handle to one running session
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    cancel: CancelSignal,
    task: JoinHandle<SessionOutcome>,
}

impl SessionHandle {
    /// Session id
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Cancel this session; idempotent
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A clone of the cancel signal (e.g. for a Ctrl-C handler)
    #[must_use]
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Wait for the session to finish
    ///
    /// # Errors
    ///
    /// Returns the join error if the session task panicked.
    pub async fn join(self) -> Result<SessionOutcome, JoinError> {
        self.task.await
    }
}

struct Current {
    id: SessionId,
    cancel: CancelSignal,
    state: SessionState,
}

#[derive(Default)]
struct Shared {
    current: Mutex<Option<Current>>,
    gate: tokio::sync::Mutex<()>,
}

impl Shared {
    fn is_current(&self, id: SessionId) -> bool {
        self.current.lock().as_ref().is_some_and(|c| c.id == id)
    }

    fn set_state(&self, id: SessionId, state: SessionState) {
        if let Some(current) = self.current.lock().as_mut() {
            if current.id == id {
                current.state = state;
            }
        }
    }
}

/// Runs generation sessions against a [`PatchSource`]
pub struct SessionController<S> {
    source: Arc<S>,
    tx: mpsc::Sender<StreamEvent>,
    shared: Arc<Shared>,
}

impl<S: PatchSource + 'static> SessionController<S> {
    /// Create a controller publishing to `tx`
    pub fn new(source: S, tx: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            source: Arc::new(source),
            tx,
            shared: Arc::new(Shared::default()),
        }
    }

    /// Start a session, cancelling any active one
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, prompt: impl Into<String>) -> SessionHandle {
        let prompt = prompt.into();
        let cancel = CancelSignal::new();

        let (id, previous) = {
            let mut current = self.shared.current.lock();
            let id = SessionId::next();
            let previous = current.replace(Current {
                id,
                cancel: cancel.clone(),
                state: SessionState::Active,
            });
            (id, previous)
        };

        if let Some(previous) = previous {
            if previous.cancel.cancel() {
                tracing::debug!(session = %previous.id, by = %id, "Session superseded");
            }
        }

        tracing::info!(
            session = %id,
            source = self.source.name(),
            prompt_chars = prompt.chars().count(),
            "Session started"
        );

        let pipeline = Pipeline {
            id,
            source: Arc::clone(&self.source),
            shared: Arc::clone(&self.shared),
            tx: self.tx.clone(),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(pipeline.run(prompt));

        SessionHandle { id, cancel, task }
    }

    /// Cancel the current session; no-op if none is active
    pub fn cancel(&self) {
        if let Some(current) = self.shared.current.lock().as_ref() {
            if current.cancel.cancel() {
                tracing::debug!(session = %current.id, "Session cancel requested");
            }
        }
    }

    /// State of the most recently started session
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared
            .current
            .lock()
            .as_ref()
            .map_or(SessionState::Idle, |c| c.state)
    }

    /// Id of the most recently started session
    #[must_use]
    pub fn current_id(&self) -> Option<SessionId> {
        self.shared.current.lock().as_ref().map(|c| c.id)
    }
}

/// Why a session stopped early
enum Interrupt {
    Cancelled,
    Failed(TransportError),
}

/// The per-session pipeline, owned by its task
struct Pipeline<S> {
    id: SessionId,
    source: Arc<S>,
    shared: Arc<Shared>,
    tx: mpsc::Sender<StreamEvent>,
    cancel: CancelSignal,
}

impl<S: PatchSource + 'static> Pipeline<S> {
    async fn run(self, prompt: String) -> SessionOutcome {
        let mut tree = Tree::new();
        let mut lines = Vec::new();

        let mut result = self.stream(&prompt, &mut tree, &mut lines).await;
        if result.is_ok() {
            let completed = StreamEvent::Completed {
                session: self.id,
                lines: lines.len(),
            };
            result = self.publish(completed).await;
        }

        let (state, error) = match result {
            Ok(()) => {
                tracing::info!(session = %self.id, lines = lines.len(), "Session completed");
                (SessionState::Completed, None)
            }
            Err(Interrupt::Cancelled) => {
                tracing::info!(session = %self.id, lines = lines.len(), "Session cancelled");
                self.publish_cancelled().await;
                (SessionState::Cancelled, None)
            }
            Err(Interrupt::Failed(e)) => {
                tracing::warn!(session = %self.id, error = %e, "Session failed");
                let error = e.to_string();
                let failed = StreamEvent::Failed {
                    session: self.id,
                    error: error.clone(),
                };
                if self.publish(failed).await.is_err() {
                    tracing::debug!(session = %self.id, "Failure not published");
                }
                (SessionState::Failed, Some(error))
            }
        };

        self.shared.set_state(self.id, state);

        SessionOutcome {
            id: self.id,
            state,
            tree,
            lines,
            error,
        }
    }

    async fn stream(
        &self,
        prompt: &str,
        tree: &mut Tree,
        lines: &mut Vec<String>,
    ) -> Result<(), Interrupt> {
        self.publish(StreamEvent::Started {
            session: self.id,
            prompt: prompt.to_string(),
        })
        .await?;

        let request = GenerateRequest::new(prompt);
        let mut stream = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(Interrupt::Cancelled),
            opened = self.source.open(&request) => opened.map_err(Interrupt::Failed)?,
        };

        let mut framer = LineFramer::new();
        loop {
            let chunk = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(Interrupt::Cancelled),
                chunk = stream.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    for line in framer.push(&bytes) {
                        self.process(line, tree, lines).await?;
                    }
                }
                Some(Err(e)) => return Err(Interrupt::Failed(e)),
                None => break,
            }
        }

        if let Some(tail) = framer.finish() {
            tracing::trace!(session = %self.id, "Flushing unterminated tail");
            self.process(tail, tree, lines).await?;
        }

        Ok(())
    }

    /// Parse, reduce and publish one framed line
    ///
    /// `tree` and `lines` only advance once the event is published, so they
    /// always match what observers last saw.
    async fn process(
        &self,
        line: String,
        tree: &mut Tree,
        lines: &mut Vec<String>,
    ) -> Result<(), Interrupt> {
        let next = match classify_line(&line) {
            LineKind::Blank => return Ok(()),
            LineKind::Comment => tree.clone(),
            LineKind::Invalid => {
                tracing::debug!(session = %self.id, line = lines.len() + 1, "Skipping malformed line");
                tree.clone()
            }
            LineKind::Patch(op) => tree.apply(&op),
        };

        self.publish(StreamEvent::Patch {
            session: self.id,
            tree: next.clone(),
            line: line.clone(),
        })
        .await?;

        *tree = next;
        lines.push(line);
        Ok(())
    }

    async fn publish(&self, event: StreamEvent) -> Result<(), Interrupt> {
        let _gate = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(Interrupt::Cancelled),
            gate = self.shared.gate.lock() => gate,
        };

        if self.cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Interrupt::Cancelled),
            sent = self.tx.send(event) => sent.map_err(|_| {
                tracing::debug!(session = %self.id, "Observer dropped, stopping session");
                Interrupt::Cancelled
            }),
        }
    }

    /// Tell observers about an explicit cancel; superseded sessions stay quiet
    async fn publish_cancelled(&self) {
        if !self.shared.is_current(self.id) {
            return;
        }

        let _gate = self.shared.gate.lock().await;
        if !self.shared.is_current(self.id) {
            return;
        }

        if !send_cancel_notice(&self.tx, StreamEvent::Cancelled { session: self.id }).await {
            tracing::debug!(session = %self.id, "Cancel notice dropped");
        }
    }
}
