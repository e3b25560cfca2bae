//! Output fan-out for encoded records.
//!
//! Every record goes to the console sink. A secondary sink, normally an
//! append-only file, receives the same lines until it fails once; after
//! that the emitter carries on console-only.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use monitor_core::error::{MonitorError, Result};
use tracing::{debug, warn};

/// Open `path` for appending, creating it if needed.
pub fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| MonitorError::FileOpen {
            path: path.to_path_buf(),
            source,
        })
}

struct Secondary {
    label: String,
    writer: Box<dyn Write + Send>,
}

/// Writes each record line to the console and an optional secondary sink.
pub struct Emitter {
    console: Box<dyn Write + Send>,
    secondary: Option<Secondary>,
    lines_written: u64,
}

impl Emitter {
    pub fn new<W>(console: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            console: Box::new(console),
            secondary: None,
            lines_written: 0,
        }
    }

    /// Emitter writing to the process's stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Attach a secondary sink, `label` naming it in log output.
    pub fn with_secondary<W>(mut self, label: impl Into<String>, writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        self.secondary = Some(Secondary {
            label: label.into(),
            writer: Box::new(writer),
        });
        self
    }

    /// Attach `path`, opened for appending, as the secondary sink.
    pub fn with_append_file(self, path: &Path) -> Result<Self> {
        let file = open_append(path)?;
        debug!(path = %path.display(), "secondary output opened");
        Ok(self.with_secondary(path.display().to_string(), file))
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    /// Label of the active secondary sink, if any.
    pub fn secondary_label(&self) -> Option<&str> {
        self.secondary.as_ref().map(|s| s.label.as_str())
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Write `line` followed by `\n` to every active sink.
    ///
    /// Only a console failure is returned.
    pub fn emit(&mut self, line: &str) -> Result<()> {
        write_line(&mut self.console, line).map_err(|source| MonitorError::Sink { source })?;

        if let Some(secondary) = self.secondary.as_mut() {
            if let Err(e) = write_line(&mut secondary.writer, line) {
                warn!(
                    sink = %secondary.label,
                    error = %e,
                    "secondary output failed; continuing with console only"
                );
                self.secondary = None;
            }
        }

        self.lines_written += 1;
        Ok(())
    }
}

fn write_line(writer: &mut dyn Write, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
