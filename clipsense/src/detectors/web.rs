//! URL, email, phone and IP address detectors

use super::{kinds, single_line, suggestion, Analysis, Detector, DetectorError};
use crate::interface::Suggestion;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::net::IpAddr;

/// Protocols accepted as links. Exotic schemes like javascript:, data:, or
/// custom-app:// are rejected.
const LINK_PROTOCOLS: &[&str] = &["http://", "https://", "ftp://"];

/// Characters stripped before phone validation
static PHONE_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-()]").unwrap());

/// Optional `+`, no leading zero, up to 16 digits
static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[1-9]\d{0,15}$").unwrap());

/// ISO calendar dates look like phone numbers once dashes are removed
static ISO_DATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

// ─────────────────────────────────────────────────────────────────────────────
// URL
// ─────────────────────────────────────────────────────────────────────────────

pub struct UrlDetector;

impl UrlDetector {
    /// Parse content as a URL, with or without an explicit protocol
    fn parse(content: &str) -> Option<url::Url> {
        let text = single_line(content)?;
        if text.chars().any(char::is_whitespace) {
            return None;
        }

        let lower = text.to_lowercase();
        if LINK_PROTOCOLS.iter().any(|p| lower.starts_with(p)) {
            if !validator::validate_url(text) {
                return None;
            }
            let url = url::Url::parse(text).ok()?;
            if url.host_str().map_or(true, str::is_empty) {
                return None;
            }
            return Some(url);
        }

        // Bare "example.com/path": any other scheme or userinfo is not a link
        if lower.contains("://") || text.contains('@') {
            return None;
        }
        let candidate = format!("https://{}", text);
        if !validator::validate_url(candidate.as_str()) {
            return None;
        }
        let url = url::Url::parse(&candidate).ok()?;
        match url.host() {
            Some(url::Host::Domain(domain)) => {
                let tld = domain.rsplit('.').next().unwrap_or_default();
                let has_dot = domain.contains('.');
                if has_dot && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()) {
                    Some(url)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl Detector for UrlDetector {
    fn kind(&self) -> &'static str {
        kinds::URL
    }

    fn name(&self) -> &'static str {
        "URL Analyzer"
    }

    fn detect(&self, content: &str) -> bool {
        Self::parse(content).is_some()
    }

    fn analyze(&self, content: &str) -> Result<Analysis, DetectorError> {
        let Some(url) = Self::parse(content) else {
            return Ok(Analysis::rejected());
        };
        let domain = url.host_str().unwrap_or_default().to_string();
        Ok(Analysis::new(
            0.9,
            json!({
                "domain": domain,
                "protocol": url.scheme(),
                "path": url.path(),
                "query": url.query().unwrap_or_default(),
                "hash": url.fragment().unwrap_or_default(),
            }),
        )
        .with_preview(domain))
    }

    fn suggestions(&self, content: &str, analysis: &Analysis) -> Vec<Suggestion> {
        let url = Self::parse(content)
            .map(|u| u.to_string())
            .unwrap_or_else(|| content.trim().to_string());
        let mut out = vec![suggestion("Open URL", "openUrl", json!({ "url": url }), "external-link")];
        if let Some(domain) = analysis.metadata.get("domain").and_then(|d| d.as_str()) {
            out.push(suggestion("Copy Domain", "copyText", json!({ "text": domain }), "copy"));
        }
        out
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EMAIL
// ─────────────────────────────────────────────────────────────────────────────

pub struct EmailDetector;

impl EmailDetector {
    /// The bare address, accepting a `mailto:` prefix
    fn address(content: &str) -> Option<&str> {
        let text = single_line(content)?;
        let address = match text.get(..7) {
            Some(prefix) if prefix.eq_ignore_ascii_case("mailto:") => {
                text[7..].split('?').next().unwrap_or_default()
            }
            _ => text,
        };
        if address.chars().any(char::is_whitespace) || !validator::validate_email(address) {
            return None;
        }
        Some(address)
    }
}

impl Detector for EmailDetector {
    fn kind(&self) -> &'static str {
        kinds::EMAIL
    }

    fn name(&self) -> &'static str {
        "Email Analyzer"
    }

    fn detect(&self, content: &str) -> bool {
        Self::address(content).is_some()
    }

    fn analyze(&self, content: &str) -> Result<Analysis, DetectorError> {
        let Some(address) = Self::address(content) else {
            return Ok(Analysis::rejected());
        };
        let Some((local_part, domain)) = address.rsplit_once('@') else {
            return Err(DetectorError::Analysis {
                detector: kinds::EMAIL,
                reason: "address has no domain part".to_string(),
            });
        };
        Ok(Analysis::new(
            0.95,
            json!({
                "localPart": local_part,
                "domain": domain,
                "isValid": true,
            }),
        )
        .with_preview(domain))
    }

    fn suggestions(&self, content: &str, analysis: &Analysis) -> Vec<Suggestion> {
        let address = Self::address(content).unwrap_or(content.trim());
        let mut out = vec![suggestion("Compose Email", "composeEmail", json!({ "email": address }), "mail")];
        if let Some(domain) = analysis.metadata.get("domain").and_then(|d| d.as_str()) {
            out.push(suggestion("Copy Domain", "copyText", json!({ "text": domain }), "copy"));
        }
        out
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PHONE
// ─────────────────────────────────────────────────────────────────────────────

pub struct PhoneDetector;

impl PhoneDetector {
    fn cleaned(content: &str) -> Option<String> {
        let text = single_line(content)?;
        if ISO_DATE_REGEX.is_match(text) {
            return None;
        }
        let cleaned = PHONE_SEPARATORS.replace_all(text, "").into_owned();
        if cleaned.len() >= 7 && PHONE_REGEX.is_match(&cleaned) {
            Some(cleaned)
        } else {
            None
        }
    }
}

impl Detector for PhoneDetector {
    fn kind(&self) -> &'static str {
        kinds::PHONE
    }

    fn name(&self) -> &'static str {
        "Phone Number Analyzer"
    }

    fn detect(&self, content: &str) -> bool {
        Self::cleaned(content).is_some()
    }

    fn analyze(&self, content: &str) -> Result<Analysis, DetectorError> {
        let Some(cleaned) = Self::cleaned(content) else {
            return Ok(Analysis::rejected());
        };
        let original = content.trim();
        Ok(Analysis::new(
            0.8,
            json!({
                "original": original,
                "cleaned": cleaned,
                "isInternational": cleaned.starts_with('+'),
            }),
        )
        .with_preview(original))
    }

    fn suggestions(&self, content: &str, _analysis: &Analysis) -> Vec<Suggestion> {
        let phone = content.trim();
        vec![
            suggestion("Call Number", "callPhone", json!({ "phone": phone }), "phone"),
            suggestion("Send SMS", "sendSMS", json!({ "phone": phone }), "message-square"),
        ]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// IP ADDRESS
// ─────────────────────────────────────────────────────────────────────────────

pub struct IpAddressDetector;

impl IpAddressDetector {
    fn parse(content: &str) -> Option<IpAddr> {
        let text = single_line(content)?;
        if !validator::validate_ip(text) {
            return None;
        }
        text.parse().ok()
    }

    fn is_private(ip: &IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
            // Loopback and unique local (fc00::/7)
            IpAddr::V6(v6) => v6.is_loopback() || (v6.segments()[0] & 0xfe00) == 0xfc00,
        }
    }
}

impl Detector for IpAddressDetector {
    fn kind(&self) -> &'static str {
        kinds::IP_ADDRESS
    }

    fn name(&self) -> &'static str {
        "IP Address Analyzer"
    }

    fn detect(&self, content: &str) -> bool {
        Self::parse(content).is_some()
    }

    fn analyze(&self, content: &str) -> Result<Analysis, DetectorError> {
        let Some(ip) = Self::parse(content) else {
            return Ok(Analysis::rejected());
        };
        let version = if ip.is_ipv4() { "IPv4" } else { "IPv6" };
        Ok(Analysis::new(
            0.95,
            json!({
                "version": version,
                "isPrivate": Self::is_private(&ip),
            }),
        )
        .with_preview(ip.to_string()))
    }

    fn suggestions(&self, content: &str, _analysis: &Analysis) -> Vec<Suggestion> {
        vec![suggestion("Copy Address", "copyText", json!({ "text": content.trim() }), "copy")]
    }
}
