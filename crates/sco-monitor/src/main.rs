mod bootstrap;

use anyhow::{Context, Result};
use monitor_core::encoder::JsonEncoder;
use monitor_core::settings::{MarkerConfig, Settings};
use monitor_data::framer::MessageFramer;
use monitor_data::sink::Emitter;
use monitor_runtime::monitor_loop::MonitorLoop;
use monitor_runtime::notifier::Notifier;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level)?;

    if settings.init_markers {
        let path = MarkerConfig::config_path();
        if bootstrap::write_default_markers(&path)? {
            tracing::info!(path = %path.display(), "default markers written");
        } else {
            tracing::info!(path = %path.display(), "marker file already exists; left unchanged");
        }
        return Ok(());
    }

    // Clap enforces the input unless --init-markers was given.
    let input = settings
        .input
        .clone()
        .context("no log file given")?;

    tracing::info!("SCO Monitor v{} starting", env!("CARGO_PKG_VERSION"));

    let markers = settings.marker_config()?;
    let reader = bootstrap::open_input(&input, settings.from_beginning)?;

    let mut emitter = Emitter::stdout();
    if let Some(output) = settings.output_path() {
        emitter = emitter
            .with_append_file(output)
            .with_context(|| format!("cannot open output {}", output.display()))?;
    }

    let notifier = Notifier::for_path(&input, settings.poll);
    tracing::info!(
        input = %input.display(),
        output = emitter.secondary_label().unwrap_or("console only"),
        notifier = notifier.kind(),
        strings = ?settings.string_policy(),
        "configuration resolved"
    );

    let cancel = CancellationToken::new();
    let monitor = MonitorLoop::new(&input, reader, emitter, notifier, cancel.clone())
        .with_framer(MessageFramer::new(markers))
        .with_encoder(JsonEncoder::new(settings.string_policy()))
        .with_chunk_size(settings.chunk_size())
        .with_wait_timeout(settings.poll_timeout());

    // Ctrl+C is awaited on its own task; the loop only watches the token.
    let listener = bootstrap::cancel_on(tokio::signal::ctrl_c(), cancel);
    let result = monitor.run().await;
    listener.abort();
    let stats = result?;

    tracing::info!(
        lines = stats.lines_read,
        records = stats.records_emitted,
        discarded = stats.records_discarded,
        partial = stats.partial_flushes,
        uptime_secs = stats.uptime().num_seconds(),
        "SCO Monitor stopped"
    );

    Ok(())
}
