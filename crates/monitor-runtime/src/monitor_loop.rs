//! The tail loop: read lines, frame messages, extract, encode, emit.
//!
//! The loop runs on a single task. It suspends on the bounded wait on the
//! [`ChangeNotifier`], raced against cancellation, and re-reads
//! unconditionally after every wait. While input keeps arriving it yields
//! every few hundred lines so other tasks, such as the one that cancels it
//! on a signal, still get to run.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use monitor_core::encoder::JsonEncoder;
use monitor_core::error::{MonitorError, Result};
use monitor_core::extractor;
use monitor_data::framer::MessageFramer;
use monitor_data::line_source::{LineSource, DEFAULT_CHUNK_SIZE};
use monitor_data::sink::Emitter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::notifier::ChangeNotifier;

/// Idle wait between read attempts when nothing new is available.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(200);

/// Lines processed between voluntary yields while input keeps arriving.
const YIELD_EVERY_LINES: u64 = 256;

// ── MonitorStats ──────────────────────────────────────────────────────────────

/// Counters collected over one run of the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorStats {
    pub started_at: DateTime<Utc>,
    pub lines_read: u64,
    pub records_emitted: u64,
    /// Messages with no recognisable event type.
    pub records_discarded: u64,
    /// Unterminated messages emitted at shutdown or on a read failure.
    pub partial_flushes: u64,
    pub allocation_failures: u64,
}

impl MonitorStats {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            lines_read: 0,
            records_emitted: 0,
            records_discarded: 0,
            partial_flushes: 0,
            allocation_failures: 0,
        }
    }

    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

// ── MonitorLoop ───────────────────────────────────────────────────────────────

/// Owns the input stream and every stage of the pipeline for one source.
pub struct MonitorLoop<R, N> {
    handle: PathBuf,
    reader: R,
    source: LineSource<PathBuf>,
    framer: MessageFramer,
    encoder: JsonEncoder,
    emitter: Emitter,
    notifier: N,
    wait_timeout: Duration,
    cancel: CancellationToken,
    stats: MonitorStats,
}

impl<R, N> MonitorLoop<R, N>
where
    R: Read,
    N: ChangeNotifier,
{
    /// Build a loop reading `reader`, identified by `handle` in logs.
    ///
    /// Defaults: built-in markers, verbatim strings, 8 KiB reads, 200 ms
    /// idle wait.
    pub fn new(
        handle: impl Into<PathBuf>,
        reader: R,
        emitter: Emitter,
        notifier: N,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            handle: handle.into(),
            reader,
            source: LineSource::new(DEFAULT_CHUNK_SIZE),
            framer: MessageFramer::default(),
            encoder: JsonEncoder::default(),
            emitter,
            notifier,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            cancel,
            stats: MonitorStats::new(),
        }
    }

    pub fn with_framer(mut self, framer: MessageFramer) -> Self {
        self.framer = framer;
        self
    }

    pub fn with_encoder(mut self, encoder: JsonEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.source = LineSource::new(chunk_size);
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Run until cancelled or the input fails.
    ///
    /// On cancellation a partially collected message is emitted and the
    /// run's counters are returned. On a read failure the partial message
    /// is emitted too and the error is returned.
    pub async fn run(mut self) -> Result<MonitorStats> {
        info!(
            input = %self.handle.display(),
            chunk_size = self.source.chunk_size(),
            wait_ms = self.wait_timeout.as_millis() as u64,
            "monitoring started"
        );

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            match self
                .source
                .next_line(&self.handle, &mut self.reader, &self.cancel)
            {
                Ok(Some(line)) => {
                    self.stats.lines_read += 1;
                    if self.stats.lines_read % YIELD_EVERY_LINES == 0 {
                        tokio::task::yield_now().await;
                    }
                    match self.process_line(&line.text()) {
                        Ok(()) => {}
                        Err(MonitorError::Allocation { requested }) => {
                            self.stats.allocation_failures += 1;
                            warn!(requested, "message buffer could not grow; line dropped");
                        }
                        Err(e) => {
                            self.flush_partial();
                            return Err(e);
                        }
                    }
                }
                Ok(None) => self.wait_for_change().await,
                Err(MonitorError::Allocation { requested }) => {
                    self.stats.allocation_failures += 1;
                    warn!(requested, "line buffer could not grow; retrying");
                    self.wait_for_change().await;
                }
                Err(e) => {
                    warn!(error = %e, "input failed; stopping");
                    self.flush_partial();
                    return Err(e);
                }
            }
        }

        debug!("cancellation observed; flushing");
        self.source.discard(&self.handle);
        self.flush_partial();
        info!(
            lines = self.stats.lines_read,
            records = self.stats.records_emitted,
            "monitoring stopped"
        );
        Ok(self.stats)
    }

    fn process_line(&mut self, text: &str) -> Result<()> {
        let Self {
            framer,
            encoder,
            emitter,
            stats,
            ..
        } = self;
        framer.feed(text, |message| deliver(&message, encoder, emitter, stats))
    }

    /// Emit whatever the framer holds. Failures are logged only.
    fn flush_partial(&mut self) {
        let Self {
            framer,
            encoder,
            emitter,
            stats,
            ..
        } = self;
        match framer.flush(|message| deliver(&message, encoder, emitter, stats)) {
            Ok(true) => {
                stats.partial_flushes += 1;
                debug!("unterminated message emitted");
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "could not emit unterminated message"),
        }
    }

    async fn wait_for_change(&mut self) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            changed = self.notifier.wait(self.wait_timeout) => {
                if changed {
                    trace!("change notification");
                }
            }
        }
    }
}

/// Extract, encode and emit one framed message.
fn deliver(
    message: &str,
    encoder: &JsonEncoder,
    emitter: &mut Emitter,
    stats: &mut MonitorStats,
) -> Result<()> {
    match extractor::extract(message) {
        Some(record) => {
            emitter.emit(&encoder.encode(&record))?;
            stats.records_emitted += 1;
            trace!(event_type = record.event_type(), "record emitted");
        }
        None => {
            stats.records_discarded += 1;
            debug!(bytes = message.len(), "message without an event type discarded");
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
