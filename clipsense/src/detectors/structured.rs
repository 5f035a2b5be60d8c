//! Detectors for structured and technical text: JSON, XML, source code,
//! UUIDs, base64 blobs, markdown and SQL

use super::{kinds, single_line, suggestion, Analysis, Detector, DetectorError};
use crate::interface::Suggestion;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

// ─────────────────────────────────────────────────────────────────────────────
// JSON
// ─────────────────────────────────────────────────────────────────────────────

pub struct JsonDetector;

impl JsonDetector {
    /// Only objects and arrays count; bare scalars like `42` are not JSON clips
    fn parse(content: &str) -> Option<Value> {
        let trimmed = content.trim();
        if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
            return None;
        }
        serde_json::from_str(trimmed).ok()
    }
}

impl Detector for JsonDetector {
    fn kind(&self) -> &'static str {
        kinds::JSON
    }

    fn name(&self) -> &'static str {
        "JSON Analyzer"
    }

    fn detect(&self, content: &str) -> bool {
        Self::parse(content).is_some()
    }

    fn analyze(&self, content: &str) -> Result<Analysis, DetectorError> {
        let Some(value) = Self::parse(content) else {
            return Ok(Analysis::rejected());
        };
        let (is_array, keys, length, preview) = match &value {
            Value::Array(items) => (true, Vec::new(), items.len(), format!("Array ({} items)", items.len())),
            Value::Object(map) => {
                let keys: Vec<String> = map.keys().cloned().collect();
                let n = keys.len();
                (false, keys, n, format!("Object ({} keys)", n))
            }
            _ => return Ok(Analysis::rejected()),
        };
        Ok(Analysis::new(
            0.9,
            json!({
                "isValid": true,
                "isArray": is_array,
                "keys": keys,
                "length": length,
            }),
        )
        .with_preview(preview))
    }

    fn suggestions(&self, content: &str, _analysis: &Analysis) -> Vec<Suggestion> {
        let Some(value) = Self::parse(content) else {
            return Vec::new();
        };
        let formatted = serde_json::to_string_pretty(&value).unwrap_or_default();
        let minified = serde_json::to_string(&value).unwrap_or_default();
        vec![
            suggestion("Format JSON", "formatJson", json!({ "formatted": formatted }), "braces"),
            suggestion("Validate JSON", "validateJson", json!({ "isValid": true }), "check"),
            suggestion("Minify JSON", "minifyJson", json!({ "minified": minified }), "minimize"),
        ]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// XML
// ─────────────────────────────────────────────────────────────────────────────

static XML_ROOT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([A-Za-z_][\w:.\-]*)(?:\s[^>]*)?/?>").unwrap());

static XML_ELEMENT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[A-Za-z_]").unwrap());

pub struct XmlDetector;

impl XmlDetector {
    /// Root element name when the content is a closed XML document or fragment
    fn root(content: &str) -> Option<String> {
        let trimmed = content.trim();
        if !(trimmed.starts_with('<') && trimmed.ends_with('>')) {
            return None;
        }
        let caps = XML_ROOT_REGEX.captures(trimmed)?;
        let name = caps[1].to_string();
        let self_closing = caps[0].ends_with("/>");
        let closed = trimmed.contains(&format!("</{}>", name)) || (self_closing && trimmed.ends_with("/>"));
        closed.then_some(name)
    }
}

impl Detector for XmlDetector {
    fn kind(&self) -> &'static str {
        kinds::XML
    }

    fn name(&self) -> &'static str {
        "XML Analyzer"
    }

    fn detect(&self, content: &str) -> bool {
        Self::root(content).is_some()
    }

    fn analyze(&self, content: &str) -> Result<Analysis, DetectorError> {
        let Some(root) = Self::root(content) else {
            return Ok(Analysis::rejected());
        };
        let has_declaration = content.trim_start().starts_with("<?xml");
        let confidence = if has_declaration { 0.8 } else { 0.7 };
        let preview = format!("<{}>", root);
        Ok(Analysis::new(
            confidence,
            json!({
                "rootElement": root,
                "hasDeclaration": has_declaration,
                "elementCount": XML_ELEMENT_REGEX.find_iter(content).count(),
            }),
        )
        .with_preview(preview))
    }

    fn suggestions(&self, _content: &str, _analysis: &Analysis) -> Vec<Suggestion> {
        vec![suggestion("Format XML", "formatXml", json!({}), "code")]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CODE
// ─────────────────────────────────────────────────────────────────────────────

/// Independent hints that text is source code
static CODE_SIGNALS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b(function|def|class|fn|impl|import|export|return|const|let|var|public|private|static|void|struct|package)\b",
        r"(?m)[{};]\s*$",
        r"=>|->|::|===|!==|&&|\|\|",
        r"(?m)^(?:\s{2,}|\t)\S",
        r"\b[A-Za-z_]\w*\([^)]*\)",
        r"(?m)^\s*(?://|#!|/\*)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static LANGUAGE_HINTS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("rust", r"\bfn\s+\w+|\blet\s+mut\b|\bimpl\b|\bpub\s+(?:fn|struct)\b"),
        ("python", r"(?m)^\s*def\s+\w+\(.*\)\s*:|(?m)^\s*(?:from\s+\w+\s+)?import\s+\w+\s*$"),
        ("typescript", r":\s*(?:string|number|boolean)\b|\binterface\s+\w+"),
        ("javascript", r"\bfunction\b|\bconst\b|\bconsole\.log\b|=>"),
        ("java", r"\bpublic\s+(?:static\s+)?(?:class|void)\b"),
        ("go", r"\bfunc\s+\w+|\bpackage\s+\w+"),
        ("shell", r"(?m)^#!/bin/|\becho\b|\$\{?\w+\}?"),
    ]
    .iter()
    .map(|(lang, p)| (*lang, Regex::new(p).unwrap()))
    .collect()
});

pub struct CodeDetector;

impl CodeDetector {
    fn signal_count(content: &str) -> usize {
        CODE_SIGNALS.iter().filter(|p| p.is_match(content)).count()
    }

    fn language(content: &str) -> &'static str {
        LANGUAGE_HINTS
            .iter()
            .find(|(_, p)| p.is_match(content))
            .map(|(lang, _)| *lang)
            .unwrap_or("unknown")
    }
}

impl Detector for CodeDetector {
    fn kind(&self) -> &'static str {
        kinds::CODE
    }

    fn name(&self) -> &'static str {
        "Code Analyzer"
    }

    fn detect(&self, content: &str) -> bool {
        !content.trim().is_empty() && Self::signal_count(content) >= 2
    }

    fn analyze(&self, content: &str) -> Result<Analysis, DetectorError> {
        let signals = Self::signal_count(content);
        if signals < 2 {
            return Ok(Analysis::rejected());
        }
        let confidence = (0.6 + 0.1 * (signals - 2) as f64).min(0.9);
        let language = Self::language(content);
        Ok(Analysis::new(
            confidence,
            json!({
                "language": language,
                "lineCount": content.lines().count(),
                "signals": signals,
            }),
        )
        .with_preview(language))
    }

    fn suggestions(&self, _content: &str, analysis: &Analysis) -> Vec<Suggestion> {
        let language = analysis
            .metadata
            .get("language")
            .cloned()
            .unwrap_or(Value::from("unknown"));
        vec![suggestion("Format Code", "formatCode", json!({ "language": language }), "code")]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// UUID
// ─────────────────────────────────────────────────────────────────────────────

pub struct UuidDetector;

impl UuidDetector {
    /// Hyphenated 8-4-4-4-12 form only
    fn parse(content: &str) -> Option<uuid::Uuid> {
        let text = single_line(content)?;
        let hyphens_ok = text.len() == 36 && [8, 13, 18, 23].iter().all(|&i| text.as_bytes()[i] == b'-');
        if !hyphens_ok {
            return None;
        }
        uuid::Uuid::parse_str(text).ok()
    }
}

impl Detector for UuidDetector {
    fn kind(&self) -> &'static str {
        kinds::UUID
    }

    fn name(&self) -> &'static str {
        "UUID Analyzer"
    }

    fn detect(&self, content: &str) -> bool {
        Self::parse(content).is_some()
    }

    fn analyze(&self, content: &str) -> Result<Analysis, DetectorError> {
        let Some(id) = Self::parse(content) else {
            return Ok(Analysis::rejected());
        };
        Ok(Analysis::new(
            0.95,
            json!({
                "version": id.get_version_num(),
                "isNil": id.is_nil(),
            }),
        )
        .with_preview(id.hyphenated().to_string()))
    }

    fn suggestions(&self, content: &str, _analysis: &Analysis) -> Vec<Suggestion> {
        let Some(id) = Self::parse(content) else {
            return Vec::new();
        };
        let lower = id.hyphenated().to_string();
        let upper = lower.to_uppercase();
        vec![
            suggestion("Copy Lowercase", "copyText", json!({ "text": lower }), "copy"),
            suggestion("Copy Uppercase", "copyText", json!({ "text": upper }), "copy"),
        ]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BASE64
// ─────────────────────────────────────────────────────────────────────────────

static BASE64_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/]+={0,2}$").unwrap());

pub struct Base64Detector;

impl Base64Detector {
    fn decode(content: &str) -> Option<Vec<u8>> {
        let text = single_line(content)?;
        if text.len() < 16 || text.len() % 4 != 0 || !BASE64_REGEX.is_match(text) {
            return None;
        }
        // Plain words and digit runs are valid base64 alphabets but not payloads
        let body = text.trim_end_matches('=');
        let uniform = body.chars().all(|c| c.is_ascii_lowercase())
            || body.chars().all(|c| c.is_ascii_uppercase())
            || body.chars().all(|c| c.is_ascii_digit());
        if uniform {
            return None;
        }
        base64::engine::general_purpose::STANDARD.decode(text).ok()
    }
}

impl Detector for Base64Detector {
    fn kind(&self) -> &'static str {
        kinds::BASE64
    }

    fn name(&self) -> &'static str {
        "Base64 Analyzer"
    }

    fn detect(&self, content: &str) -> bool {
        Self::decode(content).is_some()
    }

    fn analyze(&self, content: &str) -> Result<Analysis, DetectorError> {
        let Some(bytes) = Self::decode(content) else {
            return Ok(Analysis::rejected());
        };
        let text = std::str::from_utf8(&bytes).ok().filter(|s| !s.chars().any(|c| c.is_control() && !c.is_whitespace()));
        let decoded_preview: Option<String> = text.map(|s| s.chars().take(100).collect());
        let preview = format!("{} bytes", bytes.len());
        Ok(Analysis::new(
            0.8,
            json!({
                "decodedLength": bytes.len(),
                "isText": text.is_some(),
                "decodedPreview": decoded_preview,
            }),
        )
        .with_preview(preview))
    }

    fn suggestions(&self, content: &str, _analysis: &Analysis) -> Vec<Suggestion> {
        let Some(bytes) = Self::decode(content) else {
            return Vec::new();
        };
        match String::from_utf8(bytes) {
            Ok(decoded) => vec![suggestion("Decode Base64", "decodeBase64", json!({ "decoded": decoded }), "unlock")],
            Err(_) => Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MARKDOWN
// ─────────────────────────────────────────────────────────────────────────────

static MARKDOWN_MARKERS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("heading", r"(?m)^#{1,6}\s+\S"),
        ("list", r"(?m)^\s*[-*+]\s+\S"),
        ("orderedList", r"(?m)^\s*\d+\.\s+\S"),
        ("emphasis", r"\*\*[^*\n]+\*\*|__[^_\n]+__"),
        ("link", r"\[[^\]\n]+\]\([^)\s]+\)"),
        ("codeBlock", r"(?m)^```"),
        ("inlineCode", r"`[^`\n]+`"),
        ("blockquote", r"(?m)^>\s"),
    ]
    .iter()
    .map(|(name, p)| (*name, Regex::new(p).unwrap()))
    .collect()
});

static MARKDOWN_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{1,6}\s+(.+)$").unwrap());

pub struct MarkdownDetector;

impl MarkdownDetector {
    fn elements(content: &str) -> Vec<&'static str> {
        MARKDOWN_MARKERS
            .iter()
            .filter(|(_, p)| p.is_match(content))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl Detector for MarkdownDetector {
    fn kind(&self) -> &'static str {
        kinds::MARKDOWN
    }

    fn name(&self) -> &'static str {
        "Markdown Analyzer"
    }

    fn detect(&self, content: &str) -> bool {
        Self::elements(content).len() >= 2
    }

    fn analyze(&self, content: &str) -> Result<Analysis, DetectorError> {
        let elements = Self::elements(content);
        if elements.len() < 2 {
            return Ok(Analysis::rejected());
        }
        let confidence = (0.6 + 0.1 * (elements.len() - 2) as f64).min(0.9);
        let title = MARKDOWN_HEADING
            .captures(content)
            .map(|c| c[1].trim().to_string());
        let mut analysis = Analysis::new(
            confidence,
            json!({
                "elements": elements,
                "headingCount": MARKDOWN_HEADING.find_iter(content).count(),
                "title": title,
            }),
        );
        if let Some(title) = title {
            analysis = analysis.with_preview(title);
        }
        Ok(analysis)
    }

    fn suggestions(&self, _content: &str, _analysis: &Analysis) -> Vec<Suggestion> {
        vec![suggestion("Preview Markdown", "previewMarkdown", json!({}), "eye")]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SQL
// ─────────────────────────────────────────────────────────────────────────────

static SQL_LEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(SELECT|INSERT|UPDATE|DELETE|CREATE|ALTER|DROP|WITH)\b").unwrap());

static SQL_STRUCTURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(FROM|INTO|SET|TABLE|WHERE|VALUES|JOIN|INDEX|VIEW)\b").unwrap());

static SQL_TABLES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:FROM|JOIN|INTO|UPDATE|TABLE)\s+([A-Za-z_][\w.]*)").unwrap());

pub struct SqlDetector;

impl SqlDetector {
    fn statement_type(content: &str) -> Option<String> {
        let caps = SQL_LEADING.captures(content)?;
        if !SQL_STRUCTURE.is_match(content) {
            return None;
        }
        Some(caps[1].to_uppercase())
    }
}

impl Detector for SqlDetector {
    fn kind(&self) -> &'static str {
        kinds::SQL
    }

    fn name(&self) -> &'static str {
        "SQL Analyzer"
    }

    fn detect(&self, content: &str) -> bool {
        Self::statement_type(content).is_some()
    }

    fn analyze(&self, content: &str) -> Result<Analysis, DetectorError> {
        let Some(statement) = Self::statement_type(content) else {
            return Ok(Analysis::rejected());
        };
        let mut tables: Vec<String> = Vec::new();
        for caps in SQL_TABLES.captures_iter(content) {
            let table = caps[1].to_string();
            if !tables.contains(&table) {
                tables.push(table);
            }
        }
        let preview = statement.clone();
        Ok(Analysis::new(
            0.85,
            json!({
                "statementType": statement,
                "tables": tables,
            }),
        )
        .with_preview(preview))
    }

    fn suggestions(&self, _content: &str, _analysis: &Analysis) -> Vec<Suggestion> {
        vec![suggestion("Format SQL", "formatSql", json!({}), "database")]
    }
}
