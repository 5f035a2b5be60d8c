//! Capture pipeline: redact, analyze, store
//!
//! The analyzer sees the same truncated and masked text that is stored, so
//! detector metadata never carries an unmasked secret.

use crate::analyzer::ContentAnalyzer;
use crate::database::Database;
use crate::interface::{AppSettings, ClipSenseError};
use crate::models::NewClip;
use crate::redaction::Redactor;
use crate::watcher::CaptureSink;
use chrono::Utc;
use std::sync::Arc;

/// Upper bound on the sensitive-data TTL honoured by expiry (about a century)
const MAX_SENSITIVE_TTL_MS: u64 = 100 * 365 * 24 * 60 * 60 * 1000;

pub struct CapturePipeline {
    db: Arc<Database>,
    redactor: Redactor,
    analyzer: Arc<ContentAnalyzer>,
}

impl CapturePipeline {
    pub fn new(db: Arc<Database>, redactor: Redactor, analyzer: Arc<ContentAnalyzer>) -> Self {
        Self { db, redactor, analyzer }
    }

    /// Store one clipboard capture. Blank text is ignored. Returns the new
    /// clip id.
    pub fn process(&self, raw: &str) -> Result<Option<String>, ClipSenseError> {
        if raw.trim().is_empty() {
            return Ok(None);
        }

        let redaction = self.redactor.redact(raw);
        let detected = self.analyzer.analyze(&redaction.content);
        let clip = NewClip::from_redaction(redaction, detected);
        let id = self.db.insert_clip(&clip)?;

        tracing::info!(
            id = %id,
            content_type = clip.content_type.database_type(),
            detected = clip.detected_types.len(),
            sensitive = clip.metadata.is_sensitive,
            truncated = clip.metadata.is_truncated,
            "clip stored"
        );

        // Expiry is housekeeping; the capture itself already succeeded
        if let Err(e) = self.expire_sensitive() {
            tracing::warn!(error = %e, "sensitive clip expiry failed");
        }

        Ok(Some(id))
    }

    /// Soft-delete sensitive clips older than `sensitiveDataTTL` when
    /// `autoDeleteSensitive` is on. Returns the number expired.
    pub fn expire_sensitive(&self) -> Result<usize, ClipSenseError> {
        let settings = AppSettings::from_map(self.db.load_settings()?);
        if !settings.auto_delete_sensitive {
            return Ok(0);
        }

        let ttl_ms = settings.sensitive_data_ttl.min(MAX_SENSITIVE_TTL_MS);
        let Some(cutoff) = Utc::now().checked_sub_signed(chrono::Duration::milliseconds(ttl_ms as i64)) else {
            return Ok(0);
        };

        let expired = self.db.soft_delete_sensitive_before(cutoff)?;
        if expired > 0 {
            tracing::info!(expired, ttl_ms, "expired sensitive clips");
        }
        Ok(expired)
    }
}

impl CaptureSink for CapturePipeline {
    fn capture(&self, raw: &str) -> Result<Option<String>, ClipSenseError> {
        self.process(raw)
    }
}
