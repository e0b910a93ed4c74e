//! uistream - Streaming UI Patch Viewer
//!
//! Command-line front end for `uistream-core`. Streams newline-delimited
//! JSON patches from a generator (or a recorded file, or the built-in demo
//! script) and prints each intermediate UI tree as it is built.
//!
//! # Usage
//!
//! ```bash
//! # Scripted demo, then live prompts from stdin
//! uistream demo --interactive
//!
//! # One live generation
//! uistream generate "A signup form with email and password" --endpoint http://localhost:3000/api/generate
//!
//! # Replay a recorded stream in 16-byte chunks, raw lines only
//! uistream --raw replay session.ndjson --chunk-size 16
//!
//! # Verbose logging (to stderr)
//! RUST_LOG=debug uistream demo
//! ```
//!
//! # Signals
//!
//! - `SIGINT` (Ctrl-C): cancels the running session or playback; the last
//!   snapshot stays on screen

mod output;

use std::future::Future;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use uistream_core::{
    load_config, load_config_from_path, CancelSignal, ConfigOverrides, HttpSource, MemorySource,
    PatchSource, PlaybackEngine, PlaybackScript, SessionController, SessionId, SessionState,
    SessionView, StreamEvent, UiStreamConfig,
};

use output::{OutputMode, Printer};

/// uistream - watch a UI tree assemble itself from a patch stream
#[derive(Parser, Debug)]
#[command(name = "uistream")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "UISTREAM_CONFIG", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "UISTREAM_LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    /// Print raw patch lines instead of tree outlines
    #[arg(long, global = true, conflicts_with = "json")]
    raw: bool,

    /// Print the final snapshot as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play the built-in contact form script
    Demo {
        /// Read prompts from stdin afterwards and run them live
        #[arg(short, long)]
        interactive: bool,

        /// Endpoint for interactive prompts
        #[arg(short, long, value_name = "URL")]
        endpoint: Option<String>,

        /// Delay between playback stages
        #[arg(long, value_name = "MS")]
        stage_interval_ms: Option<u64>,

        /// Delay between typed prompt characters
        #[arg(long, value_name = "MS")]
        char_interval_ms: Option<u64>,
    },

    /// Stream one generation from the configured endpoint
    Generate {
        /// Instruction for the generator
        prompt: String,

        /// Generator endpoint
        #[arg(short, long, value_name = "URL")]
        endpoint: Option<String>,
    },

    /// Stream a recorded NDJSON file through the pipeline
    Replay {
        /// Recorded patch stream
        file: PathBuf,

        /// Bytes per simulated network chunk
        #[arg(long, default_value_t = 64, value_parser = clap::value_parser!(u64).range(1..))]
        chunk_size: u64,
    },
}

impl Command {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        match self {
            Self::Demo {
                endpoint,
                stage_interval_ms,
                char_interval_ms,
                ..
            } => {
                if let Some(endpoint) = endpoint {
                    overrides = overrides.with_endpoint(endpoint.clone());
                }
                if let Some(ms) = stage_interval_ms {
                    overrides = overrides.with_stage_interval_ms(*ms);
                }
                if let Some(ms) = char_interval_ms {
                    overrides = overrides.with_char_interval_ms(*ms);
                }
            }
            Self::Generate {
                endpoint: Some(endpoint),
                ..
            } => overrides = overrides.with_endpoint(endpoint.clone()),
            Self::Generate { .. } | Self::Replay { .. } => {}
        }
        overrides
    }
}

/// Initialize logging with the specified level
///
/// Logs go to stderr so stdout carries only snapshots.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("uistream={level},uistream_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .init();
}

/// Load configuration with CLI > env > file > default priority
fn resolve_config(args: &Args) -> Result<UiStreamConfig> {
    let mut config = match args.config {
        Some(ref path) => load_config_from_path(Some(path.clone()))
            .with_context(|| format!("Failed to load config from {path:?}"))?,
        None => load_config().context("Failed to load config")?,
    };

    args.command.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(source = %config.source(), endpoint = %config.transport.endpoint, "Configuration loaded");
    Ok(config)
}

/// Reject prompts the generator should never see
fn check_prompt(prompt: &str, max_chars: usize) -> Result<()> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        anyhow::bail!("Prompt is empty");
    }
    let chars = prompt.chars().count();
    if chars > max_chars {
        anyhow::bail!("Prompt is {chars} characters; the limit is {max_chars}");
    }
    Ok(())
}

fn show<W: Write>(
    session: SessionId,
    event: &StreamEvent,
    view: &mut SessionView,
    printer: &mut Printer<W>,
) -> io::Result<()> {
    if event.session() == session && view.apply(event) {
        printer.event(event, view)?;
    }
    Ok(())
}

/// Print events for `session` until its task finishes
///
/// Ctrl-C cancels through `cancel` and keeps following, so the final
/// `Cancelled` event and snapshot are still printed.
async fn follow<T, W: Write>(
    rx: &mut mpsc::Receiver<StreamEvent>,
    session: SessionId,
    cancel: &CancelSignal,
    done: impl Future<Output = Result<T, JoinError>>,
    printer: &mut Printer<W>,
) -> Result<(SessionView, T)> {
    let mut view = SessionView::new();
    tokio::pin!(done);
    let mut interrupted = false;
    let mut open = true;

    loop {
        tokio::select! {
            biased;
            event = rx.recv(), if open => match event {
                Some(event) => show(session, &event, &mut view, printer)?,
                None => open = false,
            },
            result = &mut done => {
                let outcome = result.context("Session task panicked")?;
                while let Ok(event) = rx.try_recv() {
                    show(session, &event, &mut view, printer)?;
                }
                printer.finish(&view)?;
                return Ok((view, outcome));
            }
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                match signal {
                    Ok(()) => {
                        info!(session = %session, "Interrupt received, cancelling");
                        cancel.cancel();
                    }
                    Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
                }
            }
        }
    }
}

async fn run_demo<W: Write>(
    config: &UiStreamConfig,
    interactive: bool,
    printer: &mut Printer<W>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(config.session.event_buffer);
    let handle = PlaybackEngine::start(PlaybackScript::contact_form(), config.playback, tx);
    let (id, cancel) = (handle.id(), handle.cancel_signal());

    let (_, outcome) = follow(&mut rx, id, &cancel, handle.join(), printer).await?;
    debug!(stages = outcome.stages_published, truncated = outcome.truncated, "Demo finished");

    if interactive {
        let source = HttpSource::new(&config.transport).context("Failed to create HTTP client")?;
        run_interactive(config, source, printer).await?;
    }
    Ok(())
}

/// Read prompts from stdin until EOF, `exit`, or Ctrl-C at the prompt
async fn run_interactive<S: PatchSource + 'static, W: Write>(
    config: &UiStreamConfig,
    source: S,
    printer: &mut Printer<W>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(config.session.event_buffer);
    let controller = SessionController::new(source, tx);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        eprint!("prompt> ");
        let line = tokio::select! {
            line = input.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let prompt = line.trim();
        if matches!(prompt, "exit" | "quit") {
            break;
        }
        if let Err(e) = check_prompt(prompt, config.session.max_prompt_chars) {
            eprintln!("{e}");
            continue;
        }

        let handle = controller.start(prompt);
        let (id, cancel) = (handle.id(), handle.cancel_signal());
        let (_, outcome) = follow(&mut rx, id, &cancel, handle.join(), printer).await?;
        if let Some(error) = outcome.error {
            // Failures are reported and the loop stays usable
            eprintln!("generation failed: {error}");
        }
    }

    eprintln!();
    Ok(())
}

/// Run one session to completion, failing the process if it failed
async fn run_session<S: PatchSource + 'static, W: Write>(
    config: &UiStreamConfig,
    source: S,
    prompt: &str,
    printer: &mut Printer<W>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(config.session.event_buffer);
    let controller = SessionController::new(source, tx);
    let handle = controller.start(prompt);
    let (id, cancel) = (handle.id(), handle.cancel_signal());

    let (_, outcome) = follow(&mut rx, id, &cancel, handle.join(), printer).await?;
    match outcome.state {
        SessionState::Failed => anyhow::bail!(
            "Generation failed: {}",
            outcome.error.unwrap_or_default()
        ),
        state => {
            debug!(?state, lines = outcome.lines.len(), "Session finished");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);
    debug!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = resolve_config(&args)?;
    let stdout = io::stdout();
    let mut printer = Printer::new(OutputMode::from_flags(args.raw, args.json), stdout.lock());

    match args.command {
        Command::Demo { interactive, .. } => run_demo(&config, interactive, &mut printer).await,
        Command::Generate { ref prompt, .. } => {
            check_prompt(prompt, config.session.max_prompt_chars)?;
            let source = HttpSource::new(&config.transport).context("Failed to create HTTP client")?;
            run_session(&config, source, prompt.trim(), &mut printer).await
        }
        Command::Replay {
            ref file,
            chunk_size,
        } => {
            let chunk_size = usize::try_from(chunk_size).context("Chunk size too large")?;
            let source = MemorySource::from_file(file, chunk_size)
                .await
                .with_context(|| format!("Failed to read {file:?}"))?;
            info!(chunks = source.chunk_count(), "Replaying recorded stream");
            let prompt = file.display().to_string();
            run_session(&config, source, &prompt, &mut printer).await
        }
    }
}
