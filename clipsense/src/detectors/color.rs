//! CSS color detection and conversion

use super::{kinds, single_line, suggestion, Analysis, Detector, DetectorError};
use crate::interface::Suggestion;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

static HEX_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").unwrap());

static RGB_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^rgb\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*\)$").unwrap());

static HSL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^hsl\(\s*(\d+)\s*,\s*(\d+)%\s*,\s*(\d+)%\s*\)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn css(&self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Hue in degrees, saturation and lightness in percent, all rounded
pub fn rgb_to_hsl(rgb: Rgb) -> (u16, u8, u8) {
    let r = rgb.r as f64 / 255.0;
    let g = rgb.g as f64 / 255.0;
    let b = rgb.b as f64 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return (0, 0, (l * 100.0).round() as u8);
    }

    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    let hue = (h * 60.0).round() as u16 % 360;
    (hue, (s * 100.0).round() as u8, (l * 100.0).round() as u8)
}

/// Inverse of `rgb_to_hsl`. Hue wraps; saturation and lightness clamp to 0..=100.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Rgb {
    let h = h.rem_euclid(360.0) / 360.0;
    let s = s.clamp(0.0, 100.0) / 100.0;
    let l = l.clamp(0.0, 100.0) / 100.0;

    let channel = |v: f64| (v * 255.0).round() as u8;
    if s == 0.0 {
        let v = channel(l);
        return Rgb { r: v, g: v, b: v };
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let hue_to_rgb = |t: f64| {
        let t = t.rem_euclid(1.0);
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };

    Rgb {
        r: channel(hue_to_rgb(h + 1.0 / 3.0)),
        g: channel(hue_to_rgb(h)),
        b: channel(hue_to_rgb(h - 1.0 / 3.0)),
    }
}

pub struct ColorDetector;

impl ColorDetector {
    /// Notation and RGB value of a color literal
    fn parse(content: &str) -> Option<(&'static str, Rgb)> {
        let text = single_line(content)?;
        let format = if HEX_REGEX.is_match(text) {
            "hex"
        } else if let Some(caps) = RGB_REGEX.captures(text) {
            if !(1..=3).all(|i| caps[i].parse::<u16>().map_or(false, |v| v <= 255)) {
                return None;
            }
            "rgb"
        } else if let Some(caps) = HSL_REGEX.captures(text) {
            let in_range = |i: usize, max: u16| caps[i].parse::<u16>().map_or(false, |v| v <= max);
            if !(in_range(1, 360) && in_range(2, 100) && in_range(3, 100)) {
                return None;
            }
            "hsl"
        } else {
            return None;
        };

        let [r, g, b, _] = csscolorparser::parse(text).ok()?.to_rgba8();
        Some((format, Rgb { r, g, b }))
    }

    /// Complementary and triadic companions of a color
    fn palette(rgb: Rgb) -> Vec<String> {
        let (h, s, l) = rgb_to_hsl(rgb);
        let (h, s, l) = (h as f64, s as f64, l as f64);
        [0.0, 180.0, 120.0, 240.0]
            .iter()
            .map(|offset| hsl_to_rgb(h + offset, s, l).hex())
            .collect()
    }
}

impl Detector for ColorDetector {
    fn kind(&self) -> &'static str {
        kinds::COLOR
    }

    fn name(&self) -> &'static str {
        "Color Analyzer"
    }

    fn detect(&self, content: &str) -> bool {
        Self::parse(content).is_some()
    }

    fn analyze(&self, content: &str) -> Result<Analysis, DetectorError> {
        let Some((format, rgb)) = Self::parse(content) else {
            return Ok(Analysis::rejected());
        };
        let (h, s, l) = rgb_to_hsl(rgb);
        let hex = rgb.hex();
        Ok(Analysis::new(
            0.95,
            json!({
                "original": content.trim(),
                "format": format,
                "rgb": { "r": rgb.r, "g": rgb.g, "b": rgb.b },
                "hex": hex,
                "hsl": format!("hsl({}, {}%, {}%)", h, s, l),
            }),
        )
        .with_preview(hex))
    }

    fn suggestions(&self, content: &str, _analysis: &Analysis) -> Vec<Suggestion> {
        let Some((_, rgb)) = Self::parse(content) else {
            return Vec::new();
        };
        let (h, s, l) = rgb_to_hsl(rgb);
        vec![
            suggestion("Copy as HEX", "copyText", json!({ "text": rgb.hex() }), "hash"),
            suggestion("Copy as RGB", "copyText", json!({ "text": rgb.css() }), "palette"),
            suggestion(
                "Copy as HSL",
                "copyText",
                json!({ "text": format!("hsl({}, {}%, {}%)", h, s, l) }),
                "palette",
            ),
            suggestion(
                "Generate Palette",
                "generatePalette",
                json!({ "base": rgb.hex(), "colors": Self::palette(rgb) }),
                "swatch-book",
            ),
        ]
    }
}
