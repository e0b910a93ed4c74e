//! uistream Core - Streaming JSON-Patch UI Tree Reconciliation
//!
//! This crate turns a chunked, newline-delimited stream of JSON patch
//! operations into a sequence of immutable UI tree snapshots, publishing each
//! one as soon as its line is complete. It has no terminal or UI
//! dependencies; a renderer only ever sees [`StreamEvent`]s.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Renderers                                 │
//! │      CLI outline  ·  raw line log  ·  JSON snapshot  ·  tests    │
//! │                           ▲                                      │
//! │                  StreamEvent / SessionView                       │
//! └───────────────────────────┼──────────────────────────────────────┘
//!                             │
//! ┌───────────────────────────┼──────────────────────────────────────┐
//! │                      UISTREAM CORE                               │
//! │  ┌────────────────────────┴───────────┐  ┌─────────────────────┐ │
//! │  │        SessionController           │  │   PlaybackEngine    │ │
//! │  │ ┌───────────┐ ┌────────┐ ┌───────┐ │  │  Typing → Streaming │ │
//! │  │ │LineFramer │→│ parse  │→│ Tree  │ │  │    → Complete       │ │
//! │  │ │           │ │ _line  │ │ apply │ │  │  (pre-built trees)  │ │
//! │  │ └─────▲─────┘ └────────┘ └───────┘ │  └─────────────────────┘ │
//! │  └───────┼────────────────────────────┘                          │
//! │          │ ByteStream                                            │
//! │  ┌───────┴──────────────────────────┐                            │
//! │  │ PatchSource: HttpSource, Memory  │                            │
//! │  └──────────────────────────────────┘                            │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Tree`]: Immutable snapshot with copy-on-write element sharing
//! - [`PatchOp`]: One `set`/`add` operation on `/root` or `/elements/{key}`
//! - [`LineFramer`]: Reassembles lines across arbitrary chunk boundaries
//! - [`SessionController`]: Runs live sessions, last request wins
//! - [`PlaybackEngine`]: Replays a fixed script on timers
//! - [`SessionView`]: Consumer-side accumulator of [`StreamEvent`]s
//!
//! # Quick Start
//!
//! ```ignore
//! use uistream_core::{MemorySource, SessionController, SessionView};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (tx, mut rx) = mpsc::channel(256);
//!     let source = MemorySource::chunked(br#"{"op":"set","path":"/root","value":"form"}"#, 8);
//!     let controller = SessionController::new(source, tx);
//!
//!     let handle = controller.start("Build a form");
//!     let mut view = SessionView::new();
//!     while let Some(event) = rx.recv().await {
//!         view.apply(&event);
//!         println!("{}", view.tree().resolve().outline());
//!         if event.is_terminal() {
//!             break;
//!         }
//!     }
//!     handle.join().await.unwrap();
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`tree`]: Snapshot data model
//! - [`render`]: Root-down resolution for renderers
//! - [`patch`]: Line classification and the pure reducer
//! - [`framer`]: Chunk-to-line framing
//! - [`transport`]: Byte sources (HTTP, in-memory)
//! - [`events`]: Observer events and session ids
//! - [`view`]: Consumer-side session state
//! - [`cancel`]: Cooperative cancellation
//! - [`session`]: Live session controller
//! - [`playback`]: Scripted playback
//! - [`config`]: TOML/env configuration

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cancel;
pub mod config;
pub mod events;
pub mod framer;
pub mod patch;
pub mod playback;
pub mod render;
pub mod session;
pub mod transport;
pub mod tree;
pub mod view;

// Re-exports for convenience
pub use cancel::{CancelSignal, CANCEL_NOTICE_TIMEOUT};
pub use events::{SessionId, StreamEvent};
pub use framer::LineFramer;
pub use patch::{apply_patch, classify_line, parse_line, LineKind, PatchKind, PatchOp, PatchPath};
pub use render::{Resolved, ResolvedNode};
pub use tree::{Element, Tree};
pub use view::{SessionView, ViewStatus};

// Session exports
pub use session::{SessionController, SessionHandle, SessionOutcome, SessionState};

// Playback exports
pub use playback::{
    PlaybackEngine, PlaybackHandle, PlaybackMachine, PlaybackOutcome, PlaybackPhase,
    PlaybackScript, PlaybackStage, PlaybackStep, PlaybackTiming,
};

// Transport exports
pub use transport::{
    ByteStream, GenerateRequest, HttpSource, MemorySource, PatchSource, TransportError,
};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, SessionSettings, TransportSettings, UiStreamConfig, UiStreamToml,
};
