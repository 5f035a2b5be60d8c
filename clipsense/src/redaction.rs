//! Size bounding, fingerprinting and sensitive-data masking
//!
//! Runs before anything is analyzed or stored. The fingerprint is always
//! taken over the original text; truncation and masking only affect what
//! flows downstream.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Default cap on stored content, in characters
pub const MAX_CONTENT_LENGTH: usize = 10_000;

/// Appended to content cut at `max_content_length`
pub const TRUNCATION_MARKER: &str = "...";

/// Sensitive-data rules, applied in this order
static SENSITIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // API-key-like tokens
        r"\b[A-Za-z0-9]{32,}\b",
        r"(?i)\bpassword\s*[:=]\s*[^\s]+",
        r"(?i)\btoken\s*[:=]\s*[^\s]+",
        r"(?i)\bsecret\s*[:=]\s*[^\s]+",
        r"(?i)\bkey\s*[:=]\s*[^\s]+",
        // PEM blocks
        r"-----BEGIN [A-Z ]+-----[\s\S]*?-----END [A-Z ]+-----",
        // Visa, Mastercard, Amex, Diners, Discover
        r"\b(?:4[0-9]{12}(?:[0-9]{3})?|5[1-5][0-9]{14}|3[47][0-9]{13}|3[0-9]{13}|6(?:011|5[0-9]{2})[0-9]{12})\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedactionConfig {
    pub max_content_length: usize,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            max_content_length: MAX_CONTENT_LENGTH,
        }
    }
}

/// Output of the redaction step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redaction {
    /// Truncated, then masked if sensitive. Safe to store and analyze.
    pub content: String,
    pub original_length: usize,
    pub is_truncated: bool,
    pub is_sensitive: bool,
    pub content_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct Redactor {
    config: RedactionConfig,
}

impl Redactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    /// Truncate, fingerprint and mask raw clipboard text
    pub fn redact(&self, original: &str) -> Redaction {
        let content_hash = content_hash(original);
        let original_length = original.chars().count();
        let (truncated, is_truncated) = truncate(original, self.config.max_content_length);
        let is_sensitive = contains_sensitive(&truncated);
        let content = if is_sensitive {
            mask_sensitive(&truncated)
        } else {
            truncated
        };

        Redaction {
            content,
            original_length,
            is_truncated,
            is_sensitive,
            content_hash,
        }
    }
}

/// Hex SHA-256 of the text
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Keep the first `max` characters and append the marker when longer
pub fn truncate(text: &str, max: usize) -> (String, bool) {
    match text.char_indices().nth(max) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + TRUNCATION_MARKER.len());
            out.push_str(&text[..cut]);
            out.push_str(TRUNCATION_MARKER);
            (out, true)
        }
        None => (text.to_string(), false),
    }
}

/// True when any rule matches
pub fn contains_sensitive(text: &str) -> bool {
    SENSITIVE_PATTERNS.iter().any(|p| p.is_match(text))
}

/// Mask every match of every rule, rule by rule
pub fn mask_sensitive(text: &str) -> String {
    let mut masked = text.to_string();
    for pattern in SENSITIVE_PATTERNS.iter() {
        masked = pattern
            .replace_all(&masked, |caps: &regex::Captures| mask_span(&caps[0]))
            .into_owned();
    }
    masked
}

/// Spans of four characters or fewer are fully starred; longer spans keep
/// two characters at each end.
pub fn mask_span(span: &str) -> String {
    let chars: Vec<char> = span.chars().collect();
    let len = chars.len();
    if len <= 4 {
        return "*".repeat(len);
    }
    let mut out = String::with_capacity(span.len());
    out.extend(&chars[..2]);
    out.push_str(&"*".repeat(len - 4));
    out.extend(&chars[len - 2..]);
    out
}
