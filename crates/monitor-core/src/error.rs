use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the SCO monitor.
///
/// A message that cannot be turned into an event is not an error: the
/// extractor returns `None` and the monitor loop counts the discard.
/// Cancellation is not an error either.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// A buffer could not grow to hold more data. Only the current
    /// operation is abandoned.
    #[error("Failed to allocate {requested} more bytes for buffer")]
    Allocation { requested: usize },

    /// The input stream returned an error. The source is unusable afterwards.
    #[error("Failed to read from input stream: {source}")]
    ReadFailure {
        #[source]
        source: std::io::Error,
    },

    /// A read was attempted on a source that previously failed.
    #[error("Input source is no longer usable after a read failure")]
    SourceUnusable,

    /// A file could not be opened.
    #[error("Failed to open file {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The console sink rejected a write.
    #[error("Failed to write to console sink: {source}")]
    Sink {
        #[source]
        source: std::io::Error,
    },

    /// The change-notification watch could not be set up.
    #[error("Watch error: {0}")]
    Watch(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the monitor crates.
pub type Result<T> = std::result::Result<T, MonitorError>;
