//! Content type detectors
//!
//! Each detector classifies one content category: `detect` is a cheap
//! yes/no, `analyze` produces a confidence with metadata, and
//! `suggestions` proposes actions for an analyzed clip. The registry keeps
//! detectors in declaration order; that order breaks confidence ties.

mod color;
mod locator;
mod structured;
mod web;

pub use color::{hsl_to_rgb, rgb_to_hsl, ColorDetector, Rgb};
pub use locator::{CoordinatesDetector, CryptoAddressDetector, DateDetector, FilePathDetector};
pub use structured::{
    Base64Detector, CodeDetector, JsonDetector, MarkdownDetector, SqlDetector, UuidDetector, XmlDetector,
};
pub use web::{EmailDetector, IpAddressDetector, PhoneDetector, UrlDetector};

use crate::interface::Suggestion;
use serde_json::{Map, Value};
use thiserror::Error;

/// Type tags produced by the built-in detectors
pub mod kinds {
    pub const URL: &str = "url";
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phone";
    pub const COLOR: &str = "color";
    pub const JSON: &str = "json";
    pub const XML: &str = "xml";
    pub const CODE: &str = "code";
    pub const IP_ADDRESS: &str = "ip_address";
    pub const CRYPTO_ADDRESS: &str = "crypto_address";
    pub const FILE_PATH: &str = "file_path";
    pub const COORDINATES: &str = "coordinates";
    pub const DATE: &str = "date";
    pub const UUID: &str = "uuid";
    pub const BASE64: &str = "base64";
    pub const MARKDOWN: &str = "markdown";
    pub const SQL: &str = "sql";
}

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("{detector} failed to analyze content: {reason}")]
    Analysis { detector: &'static str, reason: String },
}

/// Result of a detector's `analyze` call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Analysis {
    pub confidence: f64,
    pub metadata: Map<String, Value>,
    pub preview: Option<String>,
}

impl Analysis {
    pub fn new(confidence: f64, metadata: Value) -> Self {
        let metadata = match metadata {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            confidence,
            metadata,
            preview: None,
        }
    }

    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = Some(preview.into());
        self
    }

    /// A non-match: dropped by the analyzer threshold
    pub fn rejected() -> Self {
        Self::default()
    }
}

/// One classification rule
pub trait Detector: Send + Sync {
    /// Type tag reported in `DetectedType::kind`
    fn kind(&self) -> &'static str;

    /// Human-readable name, used in logs
    fn name(&self) -> &'static str;

    fn detect(&self, content: &str) -> bool;

    fn analyze(&self, content: &str) -> Result<Analysis, DetectorError>;

    fn suggestions(&self, _content: &str, _analysis: &Analysis) -> Vec<Suggestion> {
        Vec::new()
    }
}

/// Ordered set of detectors
pub struct DetectorRegistry {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectorRegistry {
    pub fn empty() -> Self {
        Self { detectors: Vec::new() }
    }

    /// All built-in detectors in their fixed declaration order
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(UrlDetector);
        registry.register(EmailDetector);
        registry.register(PhoneDetector);
        registry.register(ColorDetector);
        registry.register(JsonDetector);
        registry.register(XmlDetector);
        registry.register(CodeDetector);
        registry.register(IpAddressDetector);
        registry.register(CryptoAddressDetector);
        registry.register(FilePathDetector);
        registry.register(CoordinatesDetector);
        registry.register(DateDetector);
        registry.register(UuidDetector);
        registry.register(Base64Detector);
        registry.register(MarkdownDetector);
        registry.register(SqlDetector);
        registry
    }

    /// Append a detector; it runs after every detector registered before it
    pub fn register<D: Detector + 'static>(&mut self, detector: D) -> &mut Self {
        self.detectors.push(Box::new(detector));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Detector> {
        self.detectors.iter().map(|d| d.as_ref())
    }

    /// First detector owning the given type tag
    pub fn find(&self, kind: &str) -> Option<&dyn Detector> {
        self.iter().find(|d| d.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Build a suggestion with a fresh id
pub(crate) fn suggestion(label: &str, action_name: &str, params: Value, icon: &str) -> Suggestion {
    let params = match params {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Suggestion {
        id: uuid::Uuid::new_v4().to_string(),
        label: label.to_string(),
        action_name: action_name.to_string(),
        params,
        icon: Some(icon.to_string()),
    }
}

/// Single-line content only; most detectors classify whole, short values
pub(crate) fn single_line(content: &str) -> Option<&str> {
    let trimmed = content.trim();
    if trimmed.is_empty() || trimmed.contains('\n') || trimmed.len() > 2000 {
        None
    } else {
        Some(trimmed)
    }
}
