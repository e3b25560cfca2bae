//! Ingestion layer for SCO Monitor.
//!
//! Turns a growing byte stream into complete lines, groups lines into
//! marker-delimited messages and fans encoded records out to the output
//! sinks.

pub mod framer;
pub mod line_source;
pub mod sink;

pub use framer::{FramerState, MessageFramer};
pub use line_source::{Line, LineSource, DEFAULT_CHUNK_SIZE};
pub use monitor_core as core;
pub use sink::Emitter;
