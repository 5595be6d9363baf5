//! Termwise
//!
//! Explain the output of the last command. Pipe terminal output in; the
//! answer streams to stdout while logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! cargo build 2>&1 | TERMWISE_LAST_COMMAND="cargo build" TERMWISE_EXIT_CODE=101 termwise
//!
//! # Ask a follow-up question in conversational mode
//! cat server.log | TERMWISE_MODE=chat TERMWISE_QUESTION="why is it slow?" termwise
//!
//! # With verbose logging
//! RUST_LOG=debug termwise < build.log
//! ```
//!
//! # Environment Variables
//!
//! - `TERMWISE_LAST_COMMAND`: Command that produced the output
//! - `TERMWISE_EXIT_CODE`: Its exit status (omitted from the prompt if unset)
//! - `TERMWISE_MODE`: `diagnose` (default) or `chat`
//! - `TERMWISE_QUESTION`: Follow-up question
//! - `TERMWISE_PROVIDER`, `TERMWISE_MODEL`, ...: See the configuration docs
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)
//!
//! # Signals
//!
//! - SIGINT: Cancel the stream; partial output stays on screen

use std::env;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::signal;
use tracing::{error, info};

use termwise_core::{
    load_config, AskRequest, Assistant, CaptureBuffer, CaptureWriter, EnvCredentials,
    PromptMode, ProviderRegistry, StreamEvent, TerminalMetadata,
};

/// Read stdin to the end, line by line, into the capture buffer
async fn capture_stdin(buffer: &Arc<CaptureBuffer>) -> anyhow::Result<usize> {
    let mut writer = CaptureWriter::new(Arc::clone(buffer));
    let mut stdin = tokio::io::stdin();
    let mut chunk = vec![0u8; 8192];

    loop {
        let read = stdin.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        writer.push(&chunk[..read]);
    }
    writer.finish();

    Ok(buffer.len())
}

/// Session metadata from the environment
fn metadata_from_env() -> TerminalMetadata {
    let cwd = env::current_dir()
        .map(|dir| dir.display().to_string())
        .unwrap_or_default();
    let exit_code = env::var("TERMWISE_EXIT_CODE")
        .ok()
        .and_then(|code| code.trim().parse().ok())
        .unwrap_or(-1);

    TerminalMetadata::default()
        .with_cwd(cwd)
        .with_last_command(env::var("TERMWISE_LAST_COMMAND").unwrap_or_default())
        .with_exit_code(exit_code)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging; stdout carries only the answer
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("termwise=info".parse()?)
                .add_directive("termwise_core=info".parse()?),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config()?;
    info!(
        provider = %config.default_provider,
        source = %config.source(),
        "Loaded configuration"
    );

    let assistant = Assistant::new(
        config,
        Arc::new(ProviderRegistry::with_builtin()),
        Arc::new(EnvCredentials),
    );

    let lines = capture_stdin(assistant.capture()).await?;
    info!(lines, "Captured terminal output");

    let mode = PromptMode::parse(&env::var("TERMWISE_MODE").unwrap_or_default());
    let mut request = AskRequest::new(mode).with_metadata(metadata_from_env());
    if let Ok(question) = env::var("TERMWISE_QUESTION") {
        request = request.with_question(question);
    }

    let mut handle = assistant.ask(request)?;

    let token = handle.cancellation_token();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, cancelling");
            token.cancel();
        }
    });

    let mut stdout = tokio::io::stdout();
    let mut failure = None;
    while let Some(event) = handle.next().await {
        match event {
            StreamEvent::Delta(text) => {
                stdout.write_all(text.as_bytes()).await?;
                stdout.flush().await?;
            }
            StreamEvent::Done => stdout.write_all(b"\n").await?,
            StreamEvent::Error(err) => failure = Some(err),
        }
    }
    stdout.flush().await?;

    if let Some(err) = failure {
        error!(error = %err, "Stream failed");
        return Err(err.into());
    }
    if handle.is_cancelled() {
        anyhow::bail!("cancelled");
    }
    Ok(())
}
