use std::fs::File;
use std::future::Future;
use std::io::{self, Seek, SeekFrom};
use std::path::Path;

use anyhow::Context;
use monitor_core::settings::MarkerConfig;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Marker file ───────────────────────────────────────────────────────────────

/// Write the built-in markers to `path`.
///
/// An existing file is left untouched; returns `false` in that case.
pub fn write_default_markers(path: &Path) -> anyhow::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    MarkerConfig::default()
        .save_to(path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(true)
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a CLI log level to an [`EnvFilter`] directive.
fn filter_directive(log_level: &str) -> &'static str {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARNING" | "WARN" => "warn",
        "ERROR" => "error",
        _ => "info",
    }
}

/// Initialise the global `tracing` subscriber, writing to stderr.
///
/// Standard output carries the JSON Lines stream, so diagnostics never go
/// there. `RUST_LOG`, when set, overrides `log_level`.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(log_level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(())
}

// ── Input ──────────────────────────────────────────────────────────────────────

/// Open the monitored log read-only.
///
/// The stream is positioned at its current end so only content written
/// from now on is processed, unless `from_beginning` is set.
pub fn open_input(path: &Path, from_beginning: bool) -> anyhow::Result<File> {
    let mut file =
        File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    if !from_beginning {
        let offset = file
            .seek(SeekFrom::End(0))
            .with_context(|| format!("cannot seek {}", path.display()))?;
        tracing::debug!(offset, "skipping existing content");
    }
    Ok(file)
}

// ── Shutdown ───────────────────────────────────────────────────────────────────

/// Cancel `cancel` once `signal` resolves, from a task of its own.
///
/// The monitor loop only observes the token, so the signal is awaited
/// independently of it. A signal that fails to install is logged and
/// leaves the token untouched.
pub fn cancel_on<F>(signal: F, cancel: CancellationToken) -> JoinHandle<()>
where
    F: Future<Output = io::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                tracing::info!("shutdown requested; flushing");
                cancel.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "cannot listen for shutdown signal"),
        }
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────────
