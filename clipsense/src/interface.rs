//! ClipSense public interface
//!
//! Records exchanged with the presentation layer, the error type and the
//! command surface (`ClipHistoryApi`). This file is the source of truth for
//! shared types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Clipboard format of a stored clip. Only text is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
}

impl ContentType {
    /// The value stored in the `content_type` column
    pub fn database_type(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
        }
    }

    /// Parse a database value; unknown values fall back to text
    pub fn from_database(value: &str) -> Self {
        match value {
            "text" => ContentType::Text,
            _ => ContentType::Text,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// One classification result attached to a clip.
///
/// `kind` is the detector's type tag (`url`, `email`, `json`, ...).
/// Confidence is always strictly above the analyzer threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedType {
    #[serde(rename = "type")]
    pub kind: String,
    pub confidence: f64,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// A proposed action for the presentation layer. The core never executes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub label: String,
    pub action_name: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Bookkeeping recorded by the redaction step
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClipMetadata {
    /// Character count of the text as it was copied
    pub original_length: usize,
    pub is_truncated: bool,
    pub is_sensitive: bool,
    /// SHA-256 of the original, pre-truncation, pre-mask text
    #[serde(alias = "hash")]
    pub content_hash: String,
}

/// A clipboard history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipEntry {
    pub id: String,
    /// Stored text: truncated and masked, never the raw original
    pub content: String,
    pub content_type: ContentType,
    pub detected_types: Vec<DetectedType>,
    pub metadata: ClipMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_favorite: bool,
    pub is_deleted: bool,
    pub tags: BTreeSet<String>,
}

/// Inclusive `created_at` window for searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Search filters. All present filters are AND-combined; `tags` and
/// `detected_types` match when any listed value is present.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    pub content_types: Option<Vec<ContentType>>,
    pub detected_types: Option<Vec<String>>,
    pub date_range: Option<DateRange>,
    pub tags: Option<Vec<String>>,
    pub is_favorite: Option<bool>,
}

/// Application settings with defaults merged under missing keys.
/// Keys this version does not know about are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub theme: String,
    pub max_history_items: u64,
    pub auto_start: bool,
    pub show_notifications: bool,
    pub global_shortcut: String,
    pub encrypt_sensitive_data: bool,
    pub auto_delete_sensitive: bool,
    /// Milliseconds a sensitive clip stays visible when auto-delete is on
    #[serde(rename = "sensitiveDataTTL")]
    pub sensitive_data_ttl: u64,
    pub language: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme: "system".to_string(),
            max_history_items: 1000,
            auto_start: true,
            show_notifications: true,
            global_shortcut: "CommandOrControl+Shift+V".to_string(),
            encrypt_sensitive_data: true,
            auto_delete_sensitive: true,
            sensitive_data_ttl: 300_000,
            language: "en".to_string(),
            extra: Map::new(),
        }
    }
}

impl AppSettings {
    /// Flatten into the key/value form stored in the `settings` table
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Build settings from stored keys, falling back to defaults per key
    pub fn from_map(stored: Map<String, Value>) -> Self {
        let mut merged = AppSettings::default().to_map();
        for (key, value) in stored {
            merged.insert(key, value);
        }
        match serde_json::from_value(Value::Object(merged.clone())) {
            Ok(settings) => settings,
            Err(e) => {
                // A known key with the wrong JSON shape: drop stored values
                // that fail to deserialize one by one.
                tracing::warn!(error = %e, "stored settings have an unexpected shape, using defaults for bad keys");
                let defaults = AppSettings::default().to_map();
                let mut repaired = defaults.clone();
                for (key, value) in merged {
                    let mut candidate = repaired.clone();
                    candidate.insert(key.clone(), value);
                    if serde_json::from_value::<AppSettings>(Value::Object(candidate.clone())).is_ok() {
                        repaired = candidate;
                    }
                }
                serde_json::from_value(Value::Object(repaired)).unwrap_or_default()
            }
        }
    }
}

/// A reusable text snippet with `{{variable}}` placeholders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub template: String,
    pub variables: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a template. When `variables` is `None` they are
/// extracted from the template body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTemplate {
    pub name: String,
    pub template: String,
    #[serde(default)]
    pub variables: Option<Vec<String>>,
}

/// Partial template update; `None` fields are left unchanged
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplatePatch {
    pub name: Option<String>,
    pub template: Option<String>,
    pub variables: Option<Vec<String>>,
}

impl TemplatePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.template.is_none() && self.variables.is_none()
    }
}

/// Error type for ClipSense operations
#[derive(Debug, Error)]
pub enum ClipSenseError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Clipboard error: {0}")]
    ClipboardError(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("No async runtime available: {0}")]
    RuntimeUnavailable(String),
    #[error("Operation cancelled")]
    Cancelled,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// The command surface consumed by the presentation layer.
/// Request/response only; every call is atomic against the store.
#[async_trait::async_trait]
pub trait ClipHistoryApi: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────────
    // Clip Read Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Most recent visible clips, newest first
    fn get_history(&self, limit: usize) -> Result<Vec<ClipEntry>, ClipSenseError>;

    /// A visible clip by id. Deleted or unknown ids yield `None`.
    fn get_item(&self, id: &str) -> Result<Option<ClipEntry>, ClipSenseError>;

    /// Substring search plus filters, newest first, capped at one page
    async fn search(&self, query: String, filters: SearchFilters) -> Result<Vec<ClipEntry>, ClipSenseError>;

    /// Action proposals for a stored clip, derived from its detected types
    fn suggestions(&self, id: &str) -> Result<Vec<Suggestion>, ClipSenseError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Clip Write Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Soft-delete a clip
    fn delete_item(&self, id: &str) -> Result<(), ClipSenseError>;

    /// Flip the favorite flag, returning the new value
    fn toggle_favorite(&self, id: &str) -> Result<bool, ClipSenseError>;

    fn add_tags(&self, id: &str, tags: &[String]) -> Result<(), ClipSenseError>;

    fn remove_tags(&self, id: &str, tags: &[String]) -> Result<(), ClipSenseError>;

    /// Write to the system clipboard without the watcher recording it
    fn copy_to_clipboard(&self, content: &str) -> Result<(), ClipSenseError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Settings
    // ─────────────────────────────────────────────────────────────────────────────

    fn get_settings(&self) -> Result<AppSettings, ClipSenseError>;

    /// Upsert the given keys; other keys are left as they are
    fn update_settings(&self, partial: Map<String, Value>) -> Result<(), ClipSenseError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Templates
    // ─────────────────────────────────────────────────────────────────────────────

    fn get_templates(&self) -> Result<Vec<Template>, ClipSenseError>;

    fn create_template(&self, template: NewTemplate) -> Result<Template, ClipSenseError>;

    fn update_template(&self, id: &str, patch: TemplatePatch) -> Result<(), ClipSenseError>;

    fn delete_template(&self, id: &str) -> Result<(), ClipSenseError>;
}

impl From<crate::database::DatabaseError> for ClipSenseError {
    fn from(e: crate::database::DatabaseError) -> Self {
        ClipSenseError::DatabaseError(e.to_string())
    }
}

impl From<crate::clipboard::ClipboardError> for ClipSenseError {
    fn from(e: crate::clipboard::ClipboardError) -> Self {
        ClipSenseError::ClipboardError(e.to_string())
    }
}
