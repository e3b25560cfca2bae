//! Runtime layer for SCO Monitor.
//!
//! Drives the read, frame, extract, encode and emit pipeline on a tokio
//! task, waking on file-change notifications and stopping on cancellation.

pub mod monitor_loop;
pub mod notifier;

pub use monitor_core as core;
pub use monitor_data as data;
pub use monitor_loop::{MonitorLoop, MonitorStats};
pub use notifier::{ChangeNotifier, Notifier, NotifyWatcher, PollingNotifier};
