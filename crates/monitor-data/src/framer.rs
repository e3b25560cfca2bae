//! Groups log lines into complete messages using start and end markers.

use monitor_core::error::{MonitorError, Result};
use monitor_core::settings::MarkerConfig;
use tracing::debug;

/// Where the framer is between lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    Idle,
    InMessage,
}

/// Line-by-line state machine producing message texts.
///
/// Each buffered line is stored followed by `\n`. Emission hands the whole
/// buffer to the caller's callback; an empty buffer is never emitted.
#[derive(Debug)]
pub struct MessageFramer {
    markers: MarkerConfig,
    state: FramerState,
    buffer: String,
}

impl MessageFramer {
    pub fn new(markers: MarkerConfig) -> Self {
        Self {
            markers,
            state: FramerState::Idle,
            buffer: String::new(),
        }
    }

    pub fn state(&self) -> FramerState {
        self.state
    }

    /// Text accumulated for the message in progress.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    fn is_start(&self, line: &str) -> bool {
        self.markers.start.iter().any(|m| line.contains(m.as_str()))
    }

    fn is_end(&self, line: &str) -> bool {
        line.contains(self.markers.end.as_str())
    }

    /// Advance the state machine by one line.
    ///
    /// A start marker seen while a message is already open emits the open
    /// message as-is before starting the new one. The state is `Idle` while
    /// an emission or a start-line append is in flight, so a failure there
    /// never leaves an open message without its start line.
    pub fn feed<F>(&mut self, line: &str, mut emit: F) -> Result<()>
    where
        F: FnMut(String) -> Result<()>,
    {
        let is_start = self.is_start(line);
        let is_end = self.is_end(line);

        match (self.state, is_start) {
            (FramerState::Idle, false) => return Ok(()),
            (FramerState::Idle, true) => {
                self.append(line)?;
                self.state = FramerState::InMessage;
            }
            (FramerState::InMessage, true) => {
                debug!(
                    bytes = self.buffer.len(),
                    "start marker inside an open message; emitting it unterminated"
                );
                self.state = FramerState::Idle;
                self.emit_buffer(&mut emit)?;
                self.append(line)?;
                self.state = FramerState::InMessage;
            }
            (FramerState::InMessage, false) => self.append(line)?,
        }

        if is_end {
            self.state = FramerState::Idle;
            self.emit_buffer(&mut emit)?;
        }
        Ok(())
    }

    /// Emit a partially collected message, if any, and return to `Idle`.
    ///
    /// Returns `true` when something was emitted.
    pub fn flush<F>(&mut self, mut emit: F) -> Result<bool>
    where
        F: FnMut(String) -> Result<()>,
    {
        let emitted = self.state == FramerState::InMessage && !self.buffer.is_empty();
        if emitted {
            self.emit_buffer(&mut emit)?;
        }
        self.buffer.clear();
        self.state = FramerState::Idle;
        Ok(emitted)
    }

    fn append(&mut self, line: &str) -> Result<()> {
        let additional = line.len() + 1;
        self.buffer
            .try_reserve(additional)
            .map_err(|_| MonitorError::Allocation {
                requested: self.buffer.len() + additional,
            })?;
        self.buffer.push_str(line);
        self.buffer.push('\n');
        Ok(())
    }

    fn emit_buffer<F>(&mut self, emit: &mut F) -> Result<()>
    where
        F: FnMut(String) -> Result<()>,
    {
        if self.buffer.is_empty() {
            return Ok(());
        }
        emit(std::mem::take(&mut self.buffer))
    }
}

impl Default for MessageFramer {
    fn default() -> Self {
        Self::new(MarkerConfig::default())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
