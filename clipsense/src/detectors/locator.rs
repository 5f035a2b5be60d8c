//! Detectors for things that point somewhere: wallet addresses, file paths,
//! map coordinates and calendar dates

use super::{kinds, single_line, suggestion, Analysis, Detector, DetectorError};
use crate::interface::Suggestion;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

// ─────────────────────────────────────────────────────────────────────────────
// CRYPTO ADDRESS
// ─────────────────────────────────────────────────────────────────────────────

static BTC_LEGACY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[13][a-km-zA-HJ-NP-Z1-9]{25,34}$").unwrap());

static BTC_BECH32_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^bc1[ac-hj-np-z02-9]{11,71}$").unwrap());

static ETH_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").unwrap());

pub struct CryptoAddressDetector;

impl CryptoAddressDetector {
    /// (currency, address format)
    fn classify(content: &str) -> Option<(&'static str, &'static str)> {
        let text = single_line(content)?;
        if ETH_REGEX.is_match(text) {
            Some(("Ethereum", "hex"))
        } else if BTC_BECH32_REGEX.is_match(text) {
            Some(("Bitcoin", "bech32"))
        } else if BTC_LEGACY_REGEX.is_match(text) {
            Some(("Bitcoin", "base58"))
        } else {
            None
        }
    }
}

impl Detector for CryptoAddressDetector {
    fn kind(&self) -> &'static str {
        kinds::CRYPTO_ADDRESS
    }

    fn name(&self) -> &'static str {
        "Crypto Address Analyzer"
    }

    fn detect(&self, content: &str) -> bool {
        Self::classify(content).is_some()
    }

    fn analyze(&self, content: &str) -> Result<Analysis, DetectorError> {
        let Some((currency, format)) = Self::classify(content) else {
            return Ok(Analysis::rejected());
        };
        Ok(Analysis::new(
            0.85,
            json!({
                "currency": currency,
                "format": format,
            }),
        )
        .with_preview(currency))
    }

    fn suggestions(&self, content: &str, analysis: &Analysis) -> Vec<Suggestion> {
        let address = content.trim();
        let explorer = match analysis.metadata.get("currency").and_then(|c| c.as_str()) {
            Some("Ethereum") => format!("https://etherscan.io/address/{}", address),
            _ => format!("https://mempool.space/address/{}", address),
        };
        vec![
            suggestion("View on Explorer", "openUrl", json!({ "url": explorer }), "external-link"),
            suggestion("Copy Address", "copyText", json!({ "text": address }), "copy"),
        ]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FILE PATH
// ─────────────────────────────────────────────────────────────────────────────

static UNIX_PATH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:~|\.{1,2})?/[^/\x00]+(?:/[^/\x00]*)*$").unwrap());

static WINDOWS_PATH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(?:[A-Za-z]:\\|\\\\[^\\/:*?"<>|]+\\)(?:[^\\/:*?"<>|]+\\?)*$"#).unwrap());

pub struct FilePathDetector;

impl FilePathDetector {
    fn platform(content: &str) -> Option<&'static str> {
        let text = single_line(content)?;
        if text.contains("://") {
            return None;
        }
        if UNIX_PATH_REGEX.is_match(text) {
            Some("unix")
        } else if WINDOWS_PATH_REGEX.is_match(text) {
            Some("windows")
        } else {
            None
        }
    }
}

impl Detector for FilePathDetector {
    fn kind(&self) -> &'static str {
        kinds::FILE_PATH
    }

    fn name(&self) -> &'static str {
        "File Path Analyzer"
    }

    fn detect(&self, content: &str) -> bool {
        Self::platform(content).is_some()
    }

    fn analyze(&self, content: &str) -> Result<Analysis, DetectorError> {
        let Some(platform) = Self::platform(content) else {
            return Ok(Analysis::rejected());
        };
        let path = content.trim();
        let separator = if platform == "windows" { '\\' } else { '/' };
        let trimmed = path.trim_end_matches(separator);
        let (directory, file_name) = trimmed.rsplit_once(separator).unwrap_or(("", trimmed));
        let extension = file_name
            .rsplit_once('.')
            .filter(|(stem, _)| !stem.is_empty())
            .map(|(_, ext)| ext.to_lowercase());
        let is_absolute = platform == "windows" || path.starts_with('/') || path.starts_with('~');

        let mut analysis = Analysis::new(
            0.75,
            json!({
                "platform": platform,
                "fileName": file_name,
                "directory": directory,
                "extension": extension,
                "isAbsolute": is_absolute,
            }),
        );
        if !file_name.is_empty() {
            analysis = analysis.with_preview(file_name);
        }
        Ok(analysis)
    }

    fn suggestions(&self, content: &str, analysis: &Analysis) -> Vec<Suggestion> {
        let mut out = vec![suggestion("Open Path", "openPath", json!({ "path": content.trim() }), "folder-open")];
        if let Some(name) = analysis.metadata.get("fileName").and_then(|n| n.as_str()).filter(|n| !n.is_empty()) {
            out.push(suggestion("Copy File Name", "copyText", json!({ "text": name }), "copy"));
        }
        out
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// COORDINATES
// ─────────────────────────────────────────────────────────────────────────────

static COORDINATES_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(?\s*(-?\d{1,3}\.\d+)\s*,\s*(-?\d{1,3}\.\d+)\s*\)?$").unwrap());

pub struct CoordinatesDetector;

impl CoordinatesDetector {
    fn parse(content: &str) -> Option<(f64, f64)> {
        let text = single_line(content)?;
        let caps = COORDINATES_REGEX.captures(text)?;
        let lat: f64 = caps[1].parse().ok()?;
        let lon: f64 = caps[2].parse().ok()?;
        ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)).then_some((lat, lon))
    }
}

impl Detector for CoordinatesDetector {
    fn kind(&self) -> &'static str {
        kinds::COORDINATES
    }

    fn name(&self) -> &'static str {
        "Coordinates Analyzer"
    }

    fn detect(&self, content: &str) -> bool {
        Self::parse(content).is_some()
    }

    fn analyze(&self, content: &str) -> Result<Analysis, DetectorError> {
        let Some((lat, lon)) = Self::parse(content) else {
            return Ok(Analysis::rejected());
        };
        let hemisphere = format!(
            "{}{}",
            if lat >= 0.0 { "N" } else { "S" },
            if lon >= 0.0 { "E" } else { "W" }
        );
        Ok(Analysis::new(
            0.85,
            json!({
                "latitude": lat,
                "longitude": lon,
                "hemisphere": hemisphere,
            }),
        )
        .with_preview(format!("{}, {}", lat, lon)))
    }

    fn suggestions(&self, content: &str, _analysis: &Analysis) -> Vec<Suggestion> {
        let Some((lat, lon)) = Self::parse(content) else {
            return Vec::new();
        };
        let map = format!("https://www.openstreetmap.org/?mlat={}&mlon={}", lat, lon);
        vec![suggestion("Open in Maps", "openUrl", json!({ "url": map }), "map-pin")]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DATE
// ─────────────────────────────────────────────────────────────────────────────

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

pub struct DateDetector;

impl DateDetector {
    /// Parsed value and whether it carries a time of day
    fn parse(content: &str) -> Option<(NaiveDateTime, bool)> {
        let text = single_line(content)?;
        if text.len() > 40 {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some((dt.naive_utc(), true));
        }
        if let Some(dt) = DATETIME_FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        {
            return Some((dt, true));
        }
        DATE_FORMATS
            .iter()
            .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| (dt, false))
    }
}

impl Detector for DateDetector {
    fn kind(&self) -> &'static str {
        kinds::DATE
    }

    fn name(&self) -> &'static str {
        "Date Analyzer"
    }

    fn detect(&self, content: &str) -> bool {
        Self::parse(content).is_some()
    }

    fn analyze(&self, content: &str) -> Result<Analysis, DetectorError> {
        let Some((dt, has_time)) = Self::parse(content) else {
            return Ok(Analysis::rejected());
        };
        let iso = if has_time {
            dt.format("%Y-%m-%dT%H:%M:%S").to_string()
        } else {
            dt.format("%Y-%m-%d").to_string()
        };
        Ok(Analysis::new(
            0.85,
            json!({
                "iso": iso,
                "hasTime": has_time,
                "dayOfWeek": dt.format("%A").to_string(),
            }),
        )
        .with_preview(dt.format("%A, %B %-d, %Y").to_string()))
    }

    fn suggestions(&self, _content: &str, analysis: &Analysis) -> Vec<Suggestion> {
        let Some(iso) = analysis.metadata.get("iso").and_then(|v| v.as_str()) else {
            return Vec::new();
        };
        vec![
            suggestion("Create Event", "createEvent", json!({ "date": iso }), "calendar"),
            suggestion("Copy ISO Date", "copyText", json!({ "text": iso }), "copy"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_addresses() {
        let eth = CryptoAddressDetector
            .analyze("0x52908400098527886E0F7030069857D2E4169EE7")
            .unwrap();
        assert_eq!(eth.confidence, 0.85);
        assert_eq!(eth.metadata["currency"], "Ethereum");

        let btc = CryptoAddressDetector.analyze("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2").unwrap();
        assert_eq!(btc.metadata["format"], "base58");

        let bech = CryptoAddressDetector
            .analyze("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq")
            .unwrap();
        assert_eq!(bech.metadata["format"], "bech32");

        assert!(!CryptoAddressDetector.detect("0x1234"));
        assert!(!CryptoAddressDetector.detect("hello"));
    }

    #[test]
    fn test_unix_paths() {
        let a = FilePathDetector.analyze("/usr/local/bin/Config.TOML").unwrap();
        assert_eq!(a.confidence, 0.75);
        assert_eq!(a.metadata["platform"], "unix");
        assert_eq!(a.metadata["fileName"], "Config.TOML");
        assert_eq!(a.metadata["extension"], "toml");
        assert_eq!(a.metadata["directory"], "/usr/local/bin");

        assert!(FilePathDetector.detect("~/Documents/notes.md"));
        assert!(FilePathDetector.detect("./src/main.rs"));
        assert!(!FilePathDetector.detect("/"));
        assert!(!FilePathDetector.detect("https://example.com/a/b"));
        assert!(!FilePathDetector.detect("usr/local"));
    }

    #[test]
    fn test_windows_paths() {
        let a = FilePathDetector.analyze(r"C:\Users\me\report.docx").unwrap();
        assert_eq!(a.metadata["platform"], "windows");
        assert_eq!(a.metadata["fileName"], "report.docx");
        assert_eq!(a.metadata["extension"], "docx");
        assert!(FilePathDetector.detect(r"\\server\share\file.txt"));
    }

    #[test]
    fn test_dotfile_has_no_extension() {
        let a = FilePathDetector.analyze("~/.bashrc").unwrap();
        assert_eq!(a.metadata["fileName"], ".bashrc");
        assert!(a.metadata["extension"].is_null());
    }

    #[test]
    fn test_coordinates() {
        let a = CoordinatesDetector.analyze("40.7128, -74.0060").unwrap();
        assert_eq!(a.confidence, 0.85);
        assert_eq!(a.metadata["latitude"], 40.7128);
        assert_eq!(a.metadata["longitude"], -74.006);
        assert_eq!(a.metadata["hemisphere"], "NW");

        assert!(CoordinatesDetector.detect("(51.5074, -0.1278)"));
        assert!(!CoordinatesDetector.detect("95.0, 10.0"));
        assert!(!CoordinatesDetector.detect("40, -74"));
        assert!(!CoordinatesDetector.detect("1.5, 2.5, 3.5"));
    }

    #[test]
    fn test_dates() {
        let a = DateDetector.analyze("2024-01-15").unwrap();
        assert_eq!(a.confidence, 0.85);
        assert_eq!(a.metadata["iso"], "2024-01-15");
        assert_eq!(a.metadata["hasTime"], false);
        assert_eq!(a.metadata["dayOfWeek"], "Monday");
        assert_eq!(a.preview.as_deref(), Some("Monday, January 15, 2024"));

        let t = DateDetector.analyze("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(t.metadata["hasTime"], true);
        assert_eq!(t.metadata["iso"], "2024-01-15T10:30:00");

        assert!(DateDetector.detect("January 15, 2024"));
        assert!(DateDetector.detect("01/15/2024"));
        assert!(DateDetector.detect("15.01.2024"));
        assert!(!DateDetector.detect("2024-13-45"));
        assert!(!DateDetector.detect("tomorrow"));
    }
}
