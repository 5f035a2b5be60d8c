//! ClipSense - the core facade consumed by the presentation layer
//!
//! Owns the database, the capture pipeline and the clipboard watcher, and
//! implements `ClipHistoryApi` on top of them.
//!
//! Concurrency Model:
//! - Database uses r2d2 connection pool (concurrent reads, no mutex blocking)
//! - The watcher runs as one tokio task; captures go through the blocking pool
//! - Search runs on tokio::spawn_blocking threads
//! - Uses global FALLBACK_RUNTIME when called outside any runtime

use crate::analyzer::{AnalyzerConfig, ContentAnalyzer};
use crate::clipboard::ClipboardBackend;
use crate::database::Database;
use crate::detectors::DetectorRegistry;
use crate::interface::{
    AppSettings, ClipEntry, ClipHistoryApi, ClipSenseError, NewTemplate, SearchFilters, Suggestion, Template,
    TemplatePatch,
};
use crate::pipeline::CapturePipeline;
use crate::redaction::{RedactionConfig, Redactor};
use crate::templates;
use crate::watcher::{CaptureSink, ClipboardWatcher, WatcherConfig};
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Global fallback Tokio runtime for when async functions are called outside any runtime context.
/// This is shared across all ClipSense instances and never dropped.
static FALLBACK_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create fallback tokio runtime")
});

/// Everything needed to open a ClipSense instance
#[derive(Debug, Clone, Default)]
pub struct ClipSenseConfig {
    /// SQLite file; `None` keeps history in memory
    pub database_path: Option<PathBuf>,
    pub watcher: WatcherConfig,
    pub redaction: RedactionConfig,
    pub analyzer: AnalyzerConfig,
}

pub struct ClipSense {
    db: Arc<Database>,
    analyzer: Arc<ContentAnalyzer>,
    pipeline: Arc<CapturePipeline>,
    watcher: ClipboardWatcher,
}

impl ClipSense {
    /// Open (or create) the history database and wire up the pipeline.
    /// Database failures are fatal and returned to the caller.
    pub fn open(config: ClipSenseConfig, clipboard: Arc<dyn ClipboardBackend>) -> Result<Self, ClipSenseError> {
        let database = match &config.database_path {
            Some(path) => Database::open(path)?,
            None => Database::open_in_memory()?,
        };
        let db = Arc::new(database);
        let analyzer = Arc::new(ContentAnalyzer::new(DetectorRegistry::builtin(), config.analyzer));
        let pipeline = Arc::new(CapturePipeline::new(
            Arc::clone(&db),
            Redactor::new(config.redaction),
            Arc::clone(&analyzer),
        ));
        let sink: Arc<dyn CaptureSink> = pipeline.clone();
        let watcher = ClipboardWatcher::new(clipboard, sink, config.watcher);

        tracing::debug!(path = ?config.database_path, "clipsense opened");
        Ok(Self {
            db,
            analyzer,
            pipeline,
            watcher,
        })
    }

    /// In-memory history with default configuration
    pub fn open_in_memory(clipboard: Arc<dyn ClipboardBackend>) -> Result<Self, ClipSenseError> {
        Self::open(ClipSenseConfig::default(), clipboard)
    }

    /// Get a tokio runtime handle - uses current runtime if available, otherwise global fallback
    fn runtime_handle(&self) -> tokio::runtime::Handle {
        tokio::runtime::Handle::try_current().unwrap_or_else(|_| FALLBACK_RUNTIME.handle().clone())
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Watcher lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Start the clipboard watcher on the current tokio runtime
    pub fn start_watching(&self) -> Result<bool, ClipSenseError> {
        self.watcher.start()
    }

    /// Stop the watcher; no capture happens after this returns
    pub async fn stop_watching(&self) -> bool {
        self.watcher.stop().await
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_running()
    }

    /// Run text through the capture pipeline directly, bypassing the
    /// watcher and its debounce
    pub fn capture_text(&self, raw: &str) -> Result<Option<String>, ClipSenseError> {
        self.pipeline.process(raw)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Per-key settings
    // ─────────────────────────────────────────────────────────────────────────

    /// A single setting, falling back to its default when unset
    pub fn get_setting(&self, key: &str) -> Result<Option<Value>, ClipSenseError> {
        match self.db.get_setting(key)? {
            Some(value) => Ok(Some(value)),
            None => Ok(AppSettings::default().to_map().remove(key)),
        }
    }

    pub fn set_setting(&self, key: &str, value: Value) -> Result<(), ClipSenseError> {
        let mut partial = Map::new();
        partial.insert(key.to_string(), value);
        self.update_settings(partial)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Templates
    // ─────────────────────────────────────────────────────────────────────────

    /// Fill a stored template's placeholders
    pub fn render_template(&self, id: &str, values: &HashMap<String, String>) -> Result<String, ClipSenseError> {
        let template = self
            .db
            .get_template(id)?
            .ok_or_else(|| ClipSenseError::NotFound(id.to_string()))?;
        Ok(templates::render(&template.template, values))
    }

    fn validate_tags(tags: &[String]) -> Result<(), ClipSenseError> {
        if tags.iter().any(|t| t.trim().is_empty()) {
            return Err(ClipSenseError::InvalidInput("tags must not be blank".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ClipHistoryApi for ClipSense {
    fn get_history(&self, limit: usize) -> Result<Vec<ClipEntry>, ClipSenseError> {
        Ok(self.db.list_clips(limit)?)
    }

    fn get_item(&self, id: &str) -> Result<Option<ClipEntry>, ClipSenseError> {
        Ok(self.db.get_clip(id)?)
    }

    async fn search(&self, query: String, filters: SearchFilters) -> Result<Vec<ClipEntry>, ClipSenseError> {
        let db = Arc::clone(&self.db);
        let handle = self
            .runtime_handle()
            .spawn_blocking(move || db.search_clips(&query, &filters));

        match handle.await {
            Ok(Ok(clips)) => Ok(clips),
            Ok(Err(e)) => Err(e.into()),
            Err(_join_error) => Err(ClipSenseError::Cancelled),
        }
    }

    fn suggestions(&self, id: &str) -> Result<Vec<Suggestion>, ClipSenseError> {
        let clip = self
            .db
            .get_clip(id)?
            .ok_or_else(|| ClipSenseError::NotFound(id.to_string()))?;
        Ok(self.analyzer.suggestions(&clip.content, &clip.detected_types))
    }

    fn delete_item(&self, id: &str) -> Result<(), ClipSenseError> {
        if !self.db.soft_delete(id)? {
            return Err(ClipSenseError::NotFound(id.to_string()));
        }
        tracing::debug!(id, "clip deleted");
        Ok(())
    }

    fn toggle_favorite(&self, id: &str) -> Result<bool, ClipSenseError> {
        self.db
            .toggle_favorite(id)?
            .ok_or_else(|| ClipSenseError::NotFound(id.to_string()))
    }

    fn add_tags(&self, id: &str, tags: &[String]) -> Result<(), ClipSenseError> {
        Self::validate_tags(tags)?;
        if !self.db.add_tags(id, tags)? {
            return Err(ClipSenseError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn remove_tags(&self, id: &str, tags: &[String]) -> Result<(), ClipSenseError> {
        if !self.db.remove_tags(id, tags)? {
            return Err(ClipSenseError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn copy_to_clipboard(&self, content: &str) -> Result<(), ClipSenseError> {
        Ok(self.watcher.copy_to_clipboard(content)?)
    }

    fn get_settings(&self) -> Result<AppSettings, ClipSenseError> {
        Ok(AppSettings::from_map(self.db.load_settings()?))
    }

    fn update_settings(&self, partial: Map<String, Value>) -> Result<(), ClipSenseError> {
        if partial.is_empty() {
            return Ok(());
        }

        // Reject values of the wrong shape for known keys
        let mut merged = AppSettings::default().to_map();
        merged.extend(partial.clone());
        if let Err(e) = serde_json::from_value::<AppSettings>(Value::Object(merged)) {
            return Err(ClipSenseError::InvalidInput(format!("invalid settings: {}", e)));
        }

        self.db.save_settings(&partial)?;
        tracing::debug!(keys = partial.len(), "settings updated");
        Ok(())
    }

    fn get_templates(&self) -> Result<Vec<Template>, ClipSenseError> {
        Ok(self.db.list_templates()?)
    }

    fn create_template(&self, template: NewTemplate) -> Result<Template, ClipSenseError> {
        if template.name.trim().is_empty() {
            return Err(ClipSenseError::InvalidInput("template name must not be blank".to_string()));
        }
        let variables = template
            .variables
            .unwrap_or_else(|| templates::extract_variables(&template.template));
        Ok(self.db.insert_template(&template.name, &template.template, &variables)?)
    }

    fn update_template(&self, id: &str, mut patch: TemplatePatch) -> Result<(), ClipSenseError> {
        if matches!(&patch.name, Some(name) if name.trim().is_empty()) {
            return Err(ClipSenseError::InvalidInput("template name must not be blank".to_string()));
        }
        // A new body without an explicit list re-derives the variables
        if patch.variables.is_none() {
            if let Some(body) = &patch.template {
                patch.variables = Some(templates::extract_variables(body));
            }
        }
        if !self.db.update_template(id, &patch)? {
            return Err(ClipSenseError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete_template(&self, id: &str) -> Result<(), ClipSenseError> {
        if !self.db.delete_template(id)? {
            return Err(ClipSenseError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
