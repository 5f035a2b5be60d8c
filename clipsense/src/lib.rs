//! ClipSense Core - clipboard capture, classification and history
//!
//! This library implements the core of the ClipSense clipboard manager:
//! it watches the system clipboard, classifies new text against a catalog
//! of detectors, masks sensitive substrings and keeps a soft-deletable
//! history in SQLite.
//!
//! # Architecture
//! - `watcher`: polling loop, self-write suppression and debounce
//! - `redaction`: truncation, fingerprinting and masking before storage
//! - `detectors` / `analyzer`: content classification and suggestions
//! - `database`: SQLite schema and queries (clips, settings, templates)
//! - `store`: the `ClipSense` facade implementing `ClipHistoryApi`

pub mod analyzer;
pub mod clipboard;
pub mod database;
pub mod detectors;
pub mod interface;
pub mod models;
pub mod pipeline;
pub mod redaction;
mod store;
pub mod templates;
pub mod watcher;

pub use interface::*;
pub use store::{ClipSense, ClipSenseConfig};
