use anyhow::Context;
use clearance_engine::server::handlers::{complete_async_analysis, wait_for_running_analysis};
use clearance_engine::server::{handle_line, AnalysisAsyncResult, ServerState};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn write_line(out: &mut impl Write, value: &impl serde::Serialize) -> anyhow::Result<()> {
    let text = serde_json::to_string(value).context("failed to serialize response")?;
    writeln!(out, "{}", text).context("failed to write to stdout")?;
    out.flush().context("failed to flush stdout")
}

/// Forward finished background runs as notifications
fn drain_async_results(
    state: &mut ServerState,
    rx: &Receiver<AnalysisAsyncResult>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    loop {
        match rx.try_recv() {
            Ok(result) => {
                if let Some(notification) = complete_async_analysis(state, result) {
                    write_line(out, &notification)?;
                }
            }
            // The sender lives in main until shutdown
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(()),
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Stdout carries the protocol; logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "clearance_engine=info,clearance_server=info".into()))
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    tracing::info!("Starting clearance server...");
    let mut state = ServerState::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    // Channel for async analysis results
    let (tx, rx): (Sender<AnalysisAsyncResult>, Receiver<AnalysisAsyncResult>) = mpsc::channel();

    for line in stdin.lock().lines() {
        drain_async_results(&mut state, &rx, &mut stdout)?;

        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                continue;
            }
        };

        if let Some(response) = handle_line(&mut state, &line, Some(tx.clone())) {
            write_line(&mut stdout, &response)?;
        }
    }

    // Input closed: deliver a run that is still in flight before exiting
    drop(tx);
    for notification in wait_for_running_analysis(&mut state, &rx) {
        write_line(&mut stdout, &notification)?;
    }

    tracing::info!("Shutting down...");
    Ok(())
}
