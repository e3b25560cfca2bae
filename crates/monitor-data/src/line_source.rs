//! Incremental line reassembly over growing byte streams.
//!
//! A [`LineSource`] keeps one pending buffer per source handle. Bytes that
//! arrive without a terminating `\n` stay buffered until a later read
//! completes the line, so a writer that appends half a line at a time never
//! produces a torn line.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::io::{ErrorKind, Read};

use monitor_core::error::{MonitorError, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Bytes requested from the stream per read.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

// ── Line ──────────────────────────────────────────────────────────────────────

/// One complete line, without its `\n` terminator.
///
/// A `\r` preceding the terminator is part of the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line(Vec<u8>);

impl Line {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Line content as text; invalid UTF-8 is replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

// ── LineSource ────────────────────────────────────────────────────────────────

/// Buffered line reader keyed by source handle.
pub struct LineSource<K> {
    chunk_size: usize,
    /// Unterminated bytes carried between calls, per handle.
    pending: HashMap<K, Vec<u8>>,
    /// Handles whose stream returned an error.
    unusable: HashSet<K>,
    /// Scratch space each read lands in before being appended.
    scratch: Vec<u8>,
}

impl<K> LineSource<K>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Create a source reading at most `chunk_size` bytes per read.
    /// A `chunk_size` of zero is treated as one.
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            pending: HashMap::new(),
            unusable: HashSet::new(),
            scratch: vec![0; chunk_size],
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Return the next complete line of `stream`, reading as needed.
    ///
    /// - `Ok(None)`: no complete line is available right now. Buffered bytes
    ///   are kept for the next call, unless `cancel` fired during the read
    ///   loop, in which case they are dropped.
    /// - `Err(ReadFailure)`: the stream failed. Buffered bytes are dropped
    ///   and every later call for `handle` returns `Err(SourceUnusable)`.
    /// - `Err(Allocation)`: the buffer could not grow. Nothing was read and
    ///   the buffer is unchanged.
    pub fn next_line<R>(
        &mut self,
        handle: &K,
        stream: &mut R,
        cancel: &CancellationToken,
    ) -> Result<Option<Line>>
    where
        R: Read + ?Sized,
    {
        if self.unusable.contains(handle) {
            return Err(MonitorError::SourceUnusable);
        }

        let buffer = self.pending.entry(handle.clone()).or_default();
        let mut searched = 0;

        loop {
            if let Some(offset) = buffer[searched..].iter().position(|&b| b == b'\n') {
                let end = searched + offset;
                let rest = buffer.split_off(end + 1);
                let mut line = std::mem::replace(buffer, rest);
                line.truncate(end);
                return Ok(Some(Line(line)));
            }
            searched = buffer.len();

            buffer
                .try_reserve(self.chunk_size)
                .map_err(|_| MonitorError::Allocation {
                    requested: self.chunk_size,
                })?;

            let read = stream.read(&mut self.scratch);

            if cancel.is_cancelled() {
                debug!(
                    ?handle,
                    discarded = buffer.len(),
                    "cancelled while waiting for a line terminator"
                );
                self.pending.remove(handle);
                return Ok(None);
            }

            match read {
                Ok(0) => return Ok(None),
                Ok(n) => buffer.extend_from_slice(&self.scratch[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(e) => {
                    warn!(?handle, error = %e, discarded = buffer.len(), "read failed; source is now unusable");
                    self.pending.remove(handle);
                    self.unusable.insert(handle.clone());
                    return Err(MonitorError::ReadFailure { source: e });
                }
            }
        }
    }

    /// Number of unterminated bytes buffered for `handle`.
    pub fn pending_len(&self, handle: &K) -> usize {
        self.pending.get(handle).map_or(0, Vec::len)
    }

    /// Drop any buffered bytes for `handle`.
    pub fn discard(&mut self, handle: &K) {
        self.pending.remove(handle);
    }

    /// `true` once a read error has been seen for `handle`.
    pub fn is_unusable(&self, handle: &K) -> bool {
        self.unusable.contains(handle)
    }
}

impl<K> Default for LineSource<K>
where
    K: Eq + Hash + Clone + Debug,
{
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
