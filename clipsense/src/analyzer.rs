//! Content analysis: runs every detector over a clip and ranks the matches
//!
//! A detector that errors or panics is logged and skipped; the remaining
//! detectors still run. Results above the confidence threshold are sorted
//! by confidence, highest first, with ties kept in registry order.

use crate::detectors::{Analysis, Detector, DetectorRegistry};
use crate::interface::{DetectedType, Suggestion};
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Matches at or below this confidence are dropped
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Cap on suggestions returned for one clip
pub const DEFAULT_MAX_SUGGESTIONS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerConfig {
    pub confidence_threshold: f64,
    pub max_suggestions: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
        }
    }
}

pub struct ContentAnalyzer {
    registry: DetectorRegistry,
    config: AnalyzerConfig,
}

impl Default for ContentAnalyzer {
    fn default() -> Self {
        Self::new(DetectorRegistry::builtin(), AnalyzerConfig::default())
    }
}

impl ContentAnalyzer {
    pub fn new(registry: DetectorRegistry, config: AnalyzerConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &DetectorRegistry {
        &self.registry
    }

    /// Classify content against every registered detector
    pub fn analyze(&self, content: &str) -> Vec<DetectedType> {
        let mut detected: Vec<DetectedType> = self
            .registry
            .iter()
            .filter_map(|detector| run_detector(detector, content))
            .filter_map(|analysis| {
                let (detector, analysis) = analysis;
                let confidence = analysis.confidence;
                // NaN fails this comparison and is dropped
                if !(confidence > self.config.confidence_threshold) {
                    return None;
                }
                Some(DetectedType {
                    kind: detector.kind().to_string(),
                    confidence: confidence.min(1.0),
                    metadata: analysis.metadata,
                    preview: analysis.preview,
                })
            })
            .collect();

        // Stable sort keeps registry order among equal confidences
        detected.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        detected
    }

    /// Suggestions from each detected type's owning detector, in detection
    /// order, without duplicate actions
    pub fn suggestions(&self, content: &str, detected: &[DetectedType]) -> Vec<Suggestion> {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut out = Vec::new();

        for dt in detected {
            let Some(detector) = self.registry.find(&dt.kind) else {
                tracing::debug!(kind = %dt.kind, "no detector registered for stored type");
                continue;
            };
            let analysis = Analysis {
                confidence: dt.confidence,
                metadata: dt.metadata.clone(),
                preview: dt.preview.clone(),
            };
            let proposed = match catch_unwind(AssertUnwindSafe(|| detector.suggestions(content, &analysis))) {
                Ok(proposed) => proposed,
                Err(_) => {
                    tracing::warn!(detector = detector.name(), "detector panicked while building suggestions");
                    continue;
                }
            };
            for s in proposed {
                let key = (s.action_name.clone(), serde_json::Value::Object(s.params.clone()).to_string());
                if seen.insert(key) {
                    out.push(s);
                }
            }
        }

        out.truncate(self.config.max_suggestions);
        out
    }
}

/// Run one detector in isolation; errors and panics become `None`
fn run_detector<'a>(detector: &'a dyn Detector, content: &str) -> Option<(&'a dyn Detector, Analysis)> {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        if detector.detect(content) {
            detector.analyze(content).map(Some)
        } else {
            Ok(None)
        }
    }));

    match outcome {
        Ok(Ok(Some(analysis))) => Some((detector, analysis)),
        Ok(Ok(None)) => None,
        Ok(Err(e)) => {
            tracing::warn!(detector = detector.name(), error = %e, "detector failed, skipping");
            None
        }
        Err(_) => {
            tracing::warn!(detector = detector.name(), "detector panicked, skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::{kinds, DetectorError};
    use serde_json::json;

    struct Fixed {
        kind: &'static str,
        confidence: f64,
    }

    impl Detector for Fixed {
        fn kind(&self) -> &'static str {
            self.kind
        }
        fn name(&self) -> &'static str {
            "Fixed"
        }
        fn detect(&self, _content: &str) -> bool {
            true
        }
        fn analyze(&self, _content: &str) -> Result<Analysis, DetectorError> {
            Ok(Analysis::new(self.confidence, json!({})))
        }
        fn suggestions(&self, _content: &str, _analysis: &Analysis) -> Vec<Suggestion> {
            vec![crate::detectors::suggestion("Copy", "copyText", json!({ "text": "x" }), "copy")]
        }
    }

    struct Failing;

    impl Detector for Failing {
        fn kind(&self) -> &'static str {
            "failing"
        }
        fn name(&self) -> &'static str {
            "Failing"
        }
        fn detect(&self, _content: &str) -> bool {
            true
        }
        fn analyze(&self, _content: &str) -> Result<Analysis, DetectorError> {
            Err(DetectorError::Analysis {
                detector: "failing",
                reason: "boom".to_string(),
            })
        }
    }

    struct Panicking;

    impl Detector for Panicking {
        fn kind(&self) -> &'static str {
            "panicking"
        }
        fn name(&self) -> &'static str {
            "Panicking"
        }
        fn detect(&self, _content: &str) -> bool {
            panic!("detector bug")
        }
        fn analyze(&self, _content: &str) -> Result<Analysis, DetectorError> {
            unreachable!()
        }
    }

    fn analyzer_with(detectors: Vec<Fixed>) -> ContentAnalyzer {
        let mut registry = DetectorRegistry::empty();
        for d in detectors {
            registry.register(d);
        }
        ContentAnalyzer::new(registry, AnalyzerConfig::default())
    }

    #[test]
    fn test_url_example() {
        let detected = ContentAnalyzer::default().analyze("https://example.com/path?x=1");
        let url = detected.iter().find(|d| d.kind == kinds::URL).expect("url detected");
        assert_eq!(url.confidence, 0.9);
        assert_eq!(url.metadata["domain"], "example.com");
    }

    #[test]
    fn test_json_example() {
        let detected = ContentAnalyzer::default().analyze(r#"{"a":1,"b":2}"#);
        assert_eq!(detected[0].kind, kinds::JSON);
        assert_eq!(detected[0].confidence, 0.9);
        assert_eq!(detected[0].metadata["keys"], json!(["a", "b"]));
    }

    #[test]
    fn test_plain_text_has_no_types() {
        let detected = ContentAnalyzer::default().analyze("remember to buy milk");
        assert!(detected.is_empty(), "got {:?}", detected);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let analyzer = analyzer_with(vec![
            Fixed { kind: "at", confidence: 0.5 },
            Fixed { kind: "above", confidence: 0.51 },
            Fixed { kind: "nan", confidence: f64::NAN },
        ]);
        let kinds: Vec<String> = analyzer.analyze("x").into_iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec!["above"]);
    }

    #[test]
    fn test_sorted_descending_with_stable_ties() {
        let analyzer = analyzer_with(vec![
            Fixed { kind: "first", confidence: 0.7 },
            Fixed { kind: "high", confidence: 0.95 },
            Fixed { kind: "second", confidence: 0.7 },
        ]);
        let kinds: Vec<String> = analyzer.analyze("x").into_iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec!["high", "first", "second"]);
    }

    #[test]
    fn test_confidence_clamped_to_one() {
        let analyzer = analyzer_with(vec![Fixed { kind: "over", confidence: 1.7 }]);
        assert_eq!(analyzer.analyze("x")[0].confidence, 1.0);
    }

    #[test]
    fn test_failing_and_panicking_detectors_are_isolated() {
        let mut registry = DetectorRegistry::empty();
        registry.register(Panicking);
        registry.register(Failing);
        registry.register(Fixed { kind: "ok", confidence: 0.8 });
        let analyzer = ContentAnalyzer::new(registry, AnalyzerConfig::default());

        let detected = analyzer.analyze("anything");
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].kind, "ok");
    }

    #[test]
    fn test_suggestions_deduplicated_and_capped() {
        let analyzer = analyzer_with(vec![
            Fixed { kind: "a", confidence: 0.9 },
            Fixed { kind: "b", confidence: 0.8 },
        ]);
        let detected = analyzer.analyze("x");
        // Both detectors propose the same copyText action
        let suggestions = analyzer.suggestions("x", &detected);
        assert_eq!(suggestions.len(), 1);

        let color = ContentAnalyzer::new(
            DetectorRegistry::builtin(),
            AnalyzerConfig {
                max_suggestions: 2,
                ..AnalyzerConfig::default()
            },
        );
        let detected = color.analyze("#ff0000");
        assert_eq!(color.suggestions("#ff0000", &detected).len(), 2);
    }

    #[test]
    fn test_suggestions_skip_unknown_kinds() {
        let analyzer = ContentAnalyzer::default();
        let stale = DetectedType {
            kind: "retired".to_string(),
            confidence: 0.9,
            metadata: Default::default(),
            preview: None,
        };
        assert!(analyzer.suggestions("x", &[stale]).is_empty());
    }
}
