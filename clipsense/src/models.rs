//! Internal data models for ClipSense
//!
//! `NewClip` is the record the capture pipeline hands to the database.
//! The helpers below define the contract for the JSON columns
//! (`detected_types`, `metadata`, `tags`, `variables`) and for timestamps.

use crate::interface::{ClipMetadata, ContentType, DetectedType};
use crate::redaction::Redaction;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;

/// Fixed-width UTC format so that text order equals time order in SQLite
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

// ─────────────────────────────────────────────────────────────────────────────
// INTERNAL ITEM (not exposed to the presentation layer)
// ─────────────────────────────────────────────────────────────────────────────

/// A clip that has passed redaction and analysis but has no id yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewClip {
    pub content: String,
    pub content_type: ContentType,
    pub detected_types: Vec<DetectedType>,
    pub metadata: ClipMetadata,
    pub is_favorite: bool,
    pub tags: BTreeSet<String>,
}

impl NewClip {
    /// Assemble a text clip from the redaction output and analyzer results
    pub fn from_redaction(redaction: Redaction, detected_types: Vec<DetectedType>) -> Self {
        let metadata = ClipMetadata {
            original_length: redaction.original_length,
            is_truncated: redaction.is_truncated,
            is_sensitive: redaction.is_sensitive,
            content_hash: redaction.content_hash,
        };
        Self {
            content: redaction.content,
            content_type: ContentType::Text,
            detected_types,
            metadata,
            is_favorite: false,
            tags: BTreeSet::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// COLUMN ENCODING
// ─────────────────────────────────────────────────────────────────────────────

/// Serialize a value for a JSON column
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Decode a JSON column, falling back to the empty default when the stored
/// text is missing or corrupt. The rest of the row is still returned.
pub fn decode_json_column<T: DeserializeOwned + Default>(raw: Option<&str>, column: &str, row_id: &str) -> T {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return T::default();
    };
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(column, row_id, error = %e, "corrupt JSON column, using empty default");
            T::default()
        }
    }
}

/// Format a timestamp for storage
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp. Accepts the storage format, RFC 3339 and the
/// space-separated SQLite `CURRENT_TIMESTAMP` form.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.fZ") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .ok()
}
