//! Morpheus - dream journal core
//!
//! Records dream narratives, interprets them with a local keyword table or a
//! remote language model, and keeps the journal, feedback and preferences in a
//! key-value store with backup, statistics and guided memory recovery on top.

pub mod app;
pub mod backup;
pub mod cli;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod interpret;
pub mod kv;
pub mod memory_recovery;
pub mod orchestrator;
pub mod record;
pub mod stats;
pub mod store;

pub use error::{MorpheusError, Result};
