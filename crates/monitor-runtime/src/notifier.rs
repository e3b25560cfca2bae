//! Change notification for the tailed file.
//!
//! A notifier only shortens the idle wait between read attempts. The monitor
//! loop always re-reads after [`ChangeNotifier::wait`] returns, so a missed
//! or spurious notification costs latency, never data.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use monitor_core::error::{MonitorError, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Something that can block until the watched file may have changed.
pub trait ChangeNotifier {
    /// Wait at most `timeout` for a change.
    ///
    /// Returns `true` if a change was observed. All events queued at the
    /// time of return are consumed.
    fn wait(&mut self, timeout: Duration) -> impl Future<Output = bool> + Send;
}

// ── NotifyWatcher ─────────────────────────────────────────────────────────────

/// OS-level notifications through the `notify` crate.
///
/// The path is watched from construction until the value is dropped.
pub struct NotifyWatcher {
    watcher: RecommendedWatcher,
    path: PathBuf,
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
}

impl NotifyWatcher {
    pub fn new(path: &Path) -> Result<Self> {
        let (tx, events) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )
        .map_err(|e| MonitorError::Watch(e.to_string()))?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| MonitorError::Watch(format!("{}: {e}", path.display())))?;

        debug!(path = %path.display(), "watching for changes");
        Ok(Self {
            watcher,
            path: path.to_path_buf(),
            events,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_change(res: notify::Result<Event>) -> bool {
        match res {
            Ok(event) => !matches!(event.kind, EventKind::Access(_)),
            Err(e) => {
                warn!(error = %e, "file watcher error");
                false
            }
        }
    }
}

impl ChangeNotifier for NotifyWatcher {
    async fn wait(&mut self, timeout: Duration) -> bool {
        let first = match tokio::time::timeout(timeout, self.events.recv()).await {
            Err(_elapsed) => return false,
            Ok(Some(res)) => res,
            Ok(None) => {
                // Watcher thread is gone; fall back to a plain delay.
                tokio::time::sleep(timeout).await;
                return false;
            }
        };

        let mut changed = Self::is_change(first);
        while let Ok(res) = self.events.try_recv() {
            changed |= Self::is_change(res);
        }
        changed
    }
}

impl Drop for NotifyWatcher {
    fn drop(&mut self) {
        if let Err(e) = self.watcher.unwatch(&self.path) {
            debug!(path = %self.path.display(), error = %e, "unwatch failed");
        }
    }
}

// ── PollingNotifier ───────────────────────────────────────────────────────────

/// Sleeps for the full timeout and never reports a change.
#[derive(Debug, Clone, Copy, Default)]
pub struct PollingNotifier;

impl ChangeNotifier for PollingNotifier {
    async fn wait(&mut self, timeout: Duration) -> bool {
        tokio::time::sleep(timeout).await;
        false
    }
}

// ── Notifier ──────────────────────────────────────────────────────────────────

/// Notifier chosen at startup.
pub enum Notifier {
    Native(NotifyWatcher),
    Polling(PollingNotifier),
}

impl Notifier {
    /// Native notifications for `path` unless `poll` is set.
    ///
    /// If the native watcher cannot be set up a warning is logged and
    /// polling is used instead.
    pub fn for_path(path: &Path, poll: bool) -> Self {
        if poll {
            return Self::Polling(PollingNotifier);
        }
        match NotifyWatcher::new(path) {
            Ok(watcher) => Self::Native(watcher),
            Err(e) => {
                warn!(error = %e, "native file notifications unavailable; polling instead");
                Self::Polling(PollingNotifier)
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Native(_) => "native",
            Self::Polling(_) => "polling",
        }
    }
}

impl ChangeNotifier for Notifier {
    async fn wait(&mut self, timeout: Duration) -> bool {
        match self {
            Self::Native(n) => n.wait(timeout).await,
            Self::Polling(p) => p.wait(timeout).await,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
