//! Scripted Playback
//!
//! Replays a fixed script of pre-built snapshots on a timer, with no
//! transport involved. It publishes the same [`StreamEvent`]s as the live
//! session controller, so a renderer cannot tell the two apart.
//!
//! # Phases
//!
//! ```text
//!  Typing ──(prompt fully typed, typing_pause)──► Streaming
//!    │                                               │
//!    │ cancel                       (last stage, completion_pause)
//!    ▼                                               ▼
//!  Complete { truncated: true } ◄── cancel ──  Complete { truncated: false }
//! ```
//!
//! [`PlaybackMachine`] is the pure state machine: it says how long to wait
//! and what to emit next. [`PlaybackEngine`] drives it with tokio timers and
//! races every wait against the cancel signal, so cancellation is one edge
//! of the machine and no timer outlives it.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

use crate::cancel::{send_cancel_notice, CancelSignal};
use crate::events::{SessionId, StreamEvent};
use crate::tree::{Element, Tree};

// ============================================================================
// Timing
// ============================================================================

/// Timer settings for playback
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackTiming {
    /// Delay before each prompt character is revealed
    pub char_interval: Duration,
    /// Pause between the fully typed prompt and streaming
    pub typing_pause: Duration,
    /// Delay before each stage is published
    pub stage_interval: Duration,
    /// Pause between the last stage and completion
    pub completion_pause: Duration,
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            char_interval: Duration::from_millis(40),
            typing_pause: Duration::from_millis(600),
            stage_interval: Duration::from_millis(700),
            completion_pause: Duration::from_millis(500),
        }
    }
}

// ============================================================================
// Script
// ============================================================================

/// One pre-built step of a script
#[derive(Clone, Debug)]
pub struct PlaybackStage {
    /// Snapshot published at this stage
    pub tree: Tree,
    /// Raw line appended to the log at this stage
    pub line: String,
}

/// An ordered playback script
#[derive(Clone, Debug)]
pub struct PlaybackScript {
    /// Prompt revealed during the typing phase
    pub prompt: String,
    /// Stages, in publication order
    pub stages: Vec<PlaybackStage>,
}

impl PlaybackScript {
    /// Create a script
    pub fn new(prompt: impl Into<String>, stages: Vec<PlaybackStage>) -> Self {
        Self {
            prompt: prompt.into(),
            stages,
        }
    }

    /// The built-in contact form script
    ///
    /// Five stages: the form shell, then the name, email and message fields,
    /// then the submit button. The form lists all four children up front, so
    /// early stages exercise forward references.
    #[must_use]
    pub fn contact_form() -> Self {
        let elements = [
            (
                "contact-form",
                json!({
                    "key": "contact-form",
                    "type": "Form",
                    "props": { "title": "Contact us" },
                    "children": ["name", "email", "message", "submit"]
                }),
            ),
            (
                "name",
                json!({
                    "key": "name",
                    "type": "TextField",
                    "props": { "label": "Name", "placeholder": "Jane Doe", "required": true }
                }),
            ),
            (
                "email",
                json!({
                    "key": "email",
                    "type": "TextField",
                    "props": { "label": "Email", "inputType": "email", "required": true }
                }),
            ),
            (
                "message",
                json!({
                    "key": "message",
                    "type": "TextArea",
                    "props": { "label": "Message", "rows": 4 }
                }),
            ),
            (
                "submit",
                json!({
                    "key": "submit",
                    "type": "Button",
                    "props": { "label": "Send", "variant": "primary" }
                }),
            ),
        ];

        let mut tree = Tree::new().with_root("contact-form");
        let stages = elements
            .into_iter()
            .filter_map(|(key, value)| {
                let element = Element::from_patch_value(key, &value)?;
                tree = tree.with_element(key, element);
                Some(PlaybackStage {
                    tree: tree.clone(),
                    line: element_line(key, value),
                })
            })
            .collect();

        Self::new(
            "Create a contact form with name, email, and message fields",
            stages,
        )
    }

    /// Number of stages
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the script has no stages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

fn element_line(key: &str, value: Value) -> String {
    json!({ "op": "add", "path": format!("/elements/{key}"), "value": value }).to_string()
}

// ============================================================================
// State Machine
// ============================================================================

/// Playback phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// Revealing the prompt; `revealed` characters shown so far
    Typing {
        /// Characters revealed
        revealed: usize,
    },
    /// Publishing stages; `next_stage` is the next index to publish
    Streaming {
        /// Next stage index
        next_stage: usize,
    },
    /// Finished, either normally or by cancellation
    Complete {
        /// Whether cancellation cut the script short
        truncated: bool,
    },
}

/// What the machine produced on an `advance`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackStep {
    /// The prompt revealed so far
    Typed(String),
    /// Typing finished; streaming begins
    StreamingStarted,
    /// Publish the stage at this index
    Stage(usize),
    /// The script ran to completion
    Finished,
}

/// Pure playback state machine
#[derive(Clone, Debug)]
pub struct PlaybackMachine {
    prompt: Vec<char>,
    stage_count: usize,
    timing: PlaybackTiming,
    phase: PlaybackPhase,
}

impl PlaybackMachine {
    /// Create a machine for `script`
    #[must_use]
    pub fn new(script: &PlaybackScript, timing: PlaybackTiming) -> Self {
        Self {
            prompt: script.prompt.chars().collect(),
            stage_count: script.len(),
            timing,
            phase: PlaybackPhase::Typing { revealed: 0 },
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    /// How long to wait before the next `advance`, `None` once complete
    #[must_use]
    pub fn next_delay(&self) -> Option<Duration> {
        match self.phase {
            PlaybackPhase::Typing { revealed } if revealed < self.prompt.len() => {
                Some(self.timing.char_interval)
            }
            PlaybackPhase::Typing { .. } => Some(self.timing.typing_pause),
            PlaybackPhase::Streaming { next_stage } if next_stage < self.stage_count => {
                Some(self.timing.stage_interval)
            }
            PlaybackPhase::Streaming { .. } => Some(self.timing.completion_pause),
            PlaybackPhase::Complete { .. } => None,
        }
    }

    /// Take the transition whose delay has elapsed
    pub fn advance(&mut self) -> Option<PlaybackStep> {
        match self.phase {
            PlaybackPhase::Typing { revealed } if revealed < self.prompt.len() => {
                let revealed = revealed + 1;
                self.phase = PlaybackPhase::Typing { revealed };
                Some(PlaybackStep::Typed(self.prompt[..revealed].iter().collect()))
            }
            PlaybackPhase::Typing { .. } => {
                self.phase = PlaybackPhase::Streaming { next_stage: 0 };
                Some(PlaybackStep::StreamingStarted)
            }
            PlaybackPhase::Streaming { next_stage } if next_stage < self.stage_count => {
                self.phase = PlaybackPhase::Streaming {
                    next_stage: next_stage + 1,
                };
                Some(PlaybackStep::Stage(next_stage))
            }
            PlaybackPhase::Streaming { .. } => {
                self.phase = PlaybackPhase::Complete { truncated: false };
                Some(PlaybackStep::Finished)
            }
            PlaybackPhase::Complete { .. } => None,
        }
    }

    /// Cut the script short
    ///
    /// Returns `false` if the machine was already complete.
    pub fn cancel(&mut self) -> bool {
        if matches!(self.phase, PlaybackPhase::Complete { .. }) {
            return false;
        }
        self.phase = PlaybackPhase::Complete { truncated: true };
        true
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Final state of a playback run
#[derive(Clone, Debug)]
pub struct PlaybackOutcome {
    /// Session id used for events
    pub session: SessionId,
    /// Whether cancellation cut the script short
    pub truncated: bool,
    /// Number of stages published
    pub stages_published: usize,
    /// Last published snapshot
    pub tree: Tree,
    /// Raw lines published, in order
    pub lines: Vec<String>,
}

/// Handle to a running playback
#[derive(Debug)]
pub struct PlaybackHandle {
    session: SessionId,
    cancel: CancelSignal,
    task: JoinHandle<PlaybackOutcome>,
}

impl PlaybackHandle {
    /// Session id used for events
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.session
    }

    /// Stop playback at the current stage; idempotent
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the cancel signal (e.g. for a Ctrl-C handler)
    #[must_use]
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Wait for playback to finish
    ///
    /// # Errors
    ///
    /// Returns the join error if the playback task panicked.
    pub async fn join(self) -> Result<PlaybackOutcome, JoinError> {
        self.task.await
    }
}

/// Spawns scripted playback runs
pub struct PlaybackEngine;

impl PlaybackEngine {
    /// Start playing `script`, publishing events to `tx`
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        script: PlaybackScript,
        timing: PlaybackTiming,
        tx: mpsc::Sender<StreamEvent>,
    ) -> PlaybackHandle {
        let session = SessionId::next();
        let cancel = CancelSignal::new();
        let task = tokio::spawn(run_playback(
            session,
            Arc::new(script),
            timing,
            tx,
            cancel.clone(),
        ));

        PlaybackHandle {
            session,
            cancel,
            task,
        }
    }
}

async fn run_playback(
    session: SessionId,
    script: Arc<PlaybackScript>,
    timing: PlaybackTiming,
    tx: mpsc::Sender<StreamEvent>,
    cancel: CancelSignal,
) -> PlaybackOutcome {
    let mut machine = PlaybackMachine::new(&script, timing);
    let mut tree = Tree::new();
    let mut lines = Vec::new();

    tracing::info!(session = %session, stages = script.len(), "Playback started");

    let started = StreamEvent::Started {
        session,
        prompt: script.prompt.clone(),
    };
    if !publish(&tx, &cancel, started).await {
        machine.cancel();
    }

    while let Some(delay) = machine.next_delay() {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                machine.cancel();
                break;
            }
            () = tokio::time::sleep(delay) => {}
        }

        let mut reached = None;
        let event = match machine.advance() {
            Some(PlaybackStep::Typed(typed)) => StreamEvent::PromptTyped { session, typed },
            Some(PlaybackStep::StreamingStarted) => {
                tracing::debug!(session = %session, "Playback typing finished");
                continue;
            }
            Some(PlaybackStep::Stage(index)) => {
                let stage = &script.stages[index];
                reached = Some(stage);
                StreamEvent::Patch {
                    session,
                    tree: stage.tree.clone(),
                    line: stage.line.clone(),
                }
            }
            Some(PlaybackStep::Finished) => StreamEvent::Completed {
                session,
                lines: lines.len(),
            },
            None => break,
        };

        if !publish(&tx, &cancel, event).await {
            machine.cancel();
            break;
        }

        // Only a published stage moves the outcome forward
        if let Some(stage) = reached {
            tree = stage.tree.clone();
            lines.push(stage.line.clone());
        }
    }

    let truncated = matches!(machine.phase(), PlaybackPhase::Complete { truncated: true });
    if truncated {
        tracing::info!(session = %session, stages = lines.len(), "Playback cancelled");
        if !send_cancel_notice(&tx, StreamEvent::Cancelled { session }).await {
            tracing::debug!(session = %session, "Cancel notice dropped");
        }
    } else {
        tracing::info!(session = %session, "Playback complete");
    }

    PlaybackOutcome {
        session,
        truncated,
        stages_published: lines.len(),
        tree,
        lines,
    }
}

/// Send an event unless cancelled first; `false` means stop
async fn publish(tx: &mpsc::Sender<StreamEvent>, cancel: &CancelSignal, event: StreamEvent) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        sent = tx.send(event) => sent.is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn quick_timing() -> PlaybackTiming {
        PlaybackTiming {
            char_interval: Duration::from_millis(10),
            typing_pause: Duration::from_millis(50),
            stage_interval: Duration::from_millis(100),
            completion_pause: Duration::from_millis(30),
        }
    }

    #[test]
    fn test_contact_form_script() {
        let script = PlaybackScript::contact_form();
        assert_eq!(script.len(), 5);

        let keys: Vec<usize> = script.stages.iter().map(|s| s.tree.len()).collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5]);

        for stage in &script.stages {
            assert_eq!(stage.tree.root(), Some("contact-form"));
            assert!(stage.tree.is_ready());
        }
        assert!(script.stages[4].tree.contains("submit"));
        assert!(script.stages[1].line.contains("/elements/name"));
    }

    #[test]
    fn test_stage_lines_reduce_to_stage_trees() {
        let script = PlaybackScript::contact_form();
        let mut tree = Tree::new().with_root("contact-form");
        for stage in &script.stages {
            tree = tree.apply_line(&stage.line);
            assert_eq!(tree, stage.tree);
        }
    }

    #[test]
    fn test_machine_runs_through_all_phases() {
        let script = PlaybackScript::new(
            "hi",
            PlaybackScript::contact_form().stages.into_iter().take(2).collect(),
        );
        let timing = quick_timing();
        let mut machine = PlaybackMachine::new(&script, timing);

        let mut trace = Vec::new();
        while let Some(delay) = machine.next_delay() {
            trace.push((delay, machine.advance().unwrap()));
        }

        assert_eq!(
            trace,
            vec![
                (timing.char_interval, PlaybackStep::Typed("h".to_string())),
                (timing.char_interval, PlaybackStep::Typed("hi".to_string())),
                (timing.typing_pause, PlaybackStep::StreamingStarted),
                (timing.stage_interval, PlaybackStep::Stage(0)),
                (timing.stage_interval, PlaybackStep::Stage(1)),
                (timing.completion_pause, PlaybackStep::Finished),
            ]
        );
        assert_eq!(machine.phase(), PlaybackPhase::Complete { truncated: false });
        assert!(machine.advance().is_none());
    }

    #[test]
    fn test_machine_reveals_multibyte_prompt_by_char() {
        let script = PlaybackScript::new("é✉", Vec::new());
        let mut machine = PlaybackMachine::new(&script, quick_timing());
        assert_eq!(machine.advance(), Some(PlaybackStep::Typed("é".to_string())));
        assert_eq!(machine.advance(), Some(PlaybackStep::Typed("é✉".to_string())));
    }

    #[test]
    fn test_machine_cancel() {
        let script = PlaybackScript::contact_form();
        let mut machine = PlaybackMachine::new(&script, quick_timing());
        machine.advance();

        assert!(machine.cancel());
        assert_eq!(machine.phase(), PlaybackPhase::Complete { truncated: true });
        assert!(machine.next_delay().is_none());
        assert!(!machine.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_publishes_every_stage() {
        // Room for every event, since nothing drains until join
        let (tx, mut rx) = mpsc::channel(256);
        let handle = PlaybackEngine::start(PlaybackScript::contact_form(), quick_timing(), tx);
        let outcome = handle.join().await.unwrap();

        assert!(!outcome.truncated);
        assert_eq!(outcome.stages_published, 5);
        assert!(outcome.tree.contains("submit"));

        let mut patches = 0;
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, StreamEvent::Patch { .. }) {
                patches += 1;
            }
            last = Some(event);
        }
        assert_eq!(patches, 5);
        assert!(matches!(last, Some(StreamEvent::Completed { lines: 5, .. })));
    }
}
