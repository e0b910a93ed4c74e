//! Terminal output for stream events
//!
//! Three modes:
//! - outline: the resolved tree after every line, plus status lines
//! - raw: the raw patch lines only, as they arrive
//! - json: nothing while streaming, the final snapshot as JSON at the end

use std::io::{self, Write};

use uistream_core::{SessionView, StreamEvent};

/// How snapshots are printed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Outline,
    Raw,
    Json,
}

impl OutputMode {
    pub fn from_flags(raw: bool, json: bool) -> Self {
        if json {
            Self::Json
        } else if raw {
            Self::Raw
        } else {
            Self::Outline
        }
    }
}

pub struct Printer<W: Write> {
    mode: OutputMode,
    out: W,
    typing: bool,
}

impl<W: Write> Printer<W> {
    pub fn new(mode: OutputMode, out: W) -> Self {
        Self {
            mode,
            out,
            typing: false,
        }
    }

    /// Print one event; `view` already includes it
    pub fn event(&mut self, event: &StreamEvent, view: &SessionView) -> io::Result<()> {
        match self.mode {
            OutputMode::Outline => self.outline_event(event, view)?,
            OutputMode::Raw => {
                if let StreamEvent::Patch { line, .. } = event {
                    writeln!(self.out, "{line}")?;
                }
            }
            OutputMode::Json => {}
        }
        self.out.flush()
    }

    fn outline_event(&mut self, event: &StreamEvent, view: &SessionView) -> io::Result<()> {
        if self.typing && !matches!(event, StreamEvent::PromptTyped { .. }) {
            writeln!(self.out)?;
            self.typing = false;
        }

        match event {
            StreamEvent::Started { session, prompt } => {
                writeln!(self.out, "[{session}] {prompt}")?;
            }
            StreamEvent::PromptTyped { typed, .. } => {
                write!(self.out, "\r> {typed}")?;
                self.typing = true;
            }
            StreamEvent::Patch { tree, .. } => {
                writeln!(self.out, "--- line {} ---", view.lines().len())?;
                write!(self.out, "{}", tree.resolve().outline())?;
            }
            StreamEvent::Completed { lines, .. } => {
                writeln!(self.out, "completed ({lines} lines)")?;
            }
            StreamEvent::Cancelled { .. } => {
                writeln!(self.out, "cancelled after {} lines", view.lines().len())?;
            }
            StreamEvent::Failed { error, .. } => {
                writeln!(self.out, "failed: {error}")?;
            }
        }
        Ok(())
    }

    /// Print whatever the mode shows once a session is over
    pub fn finish(&mut self, view: &SessionView) -> anyhow::Result<()> {
        if self.mode == OutputMode::Json {
            serde_json::to_writer_pretty(&mut self.out, view.tree())?;
            writeln!(self.out)?;
        }
        self.out.flush()?;
        Ok(())
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}
