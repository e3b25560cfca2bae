//! Core types for the SCO monitor.
//!
//! Holds everything that does not touch a file descriptor: the event model,
//! the tolerant message scanner and extractor, the JSON encoder, settings
//! and the shared error type.

pub mod encoder;
pub mod error;
pub mod extractor;
pub mod models;
pub mod scan;
pub mod settings;

pub use encoder::{JsonEncoder, StringPolicy};
pub use error::{MonitorError, Result};
pub use models::{EventFields, EventRecord};
