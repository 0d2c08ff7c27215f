//! Weighted confidence aggregation and the quality gate
//!
//! Weights are policy, not constants: [`DetectorWeights`] carries the
//! defaults and callers may override them. Missing detectors never count
//! as zero confidence; their weight redistributes proportionally across
//! whatever did run.

use crate::conventions::DetectionResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectorKind {
    Language,
    Metadata,
    History,
    FingerprintQuality,
    Naming,
    TestFramework,
    Documentation,
    Organization,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 8] = [
        DetectorKind::Language,
        DetectorKind::Metadata,
        DetectorKind::History,
        DetectorKind::FingerprintQuality,
        DetectorKind::Naming,
        DetectorKind::TestFramework,
        DetectorKind::Documentation,
        DetectorKind::Organization,
    ];
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetectorKind::Language => "language",
            DetectorKind::Metadata => "metadata",
            DetectorKind::History => "history",
            DetectorKind::FingerprintQuality => "fingerprint-quality",
            DetectorKind::Naming => "naming",
            DetectorKind::TestFramework => "test-framework",
            DetectorKind::Documentation => "documentation",
            DetectorKind::Organization => "organization",
        };
        write!(f, "{}", name)
    }
}

/// Per-detector weights. Must sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorWeights {
    pub language: f64,
    pub metadata: f64,
    pub history: f64,
    pub fingerprint_quality: f64,
    pub naming: f64,
    pub test_framework: f64,
    pub documentation: f64,
    pub organization: f64,
}

impl Default for DetectorWeights {
    fn default() -> Self {
        Self {
            language: 0.20,
            metadata: 0.10,
            history: 0.05,
            fingerprint_quality: 0.05,
            naming: 0.15,
            test_framework: 0.15,
            documentation: 0.15,
            organization: 0.15,
        }
    }
}

impl DetectorWeights {
    pub fn weight_for(&self, kind: DetectorKind) -> f64 {
        match kind {
            DetectorKind::Language => self.language,
            DetectorKind::Metadata => self.metadata,
            DetectorKind::History => self.history,
            DetectorKind::FingerprintQuality => self.fingerprint_quality,
            DetectorKind::Naming => self.naming,
            DetectorKind::TestFramework => self.test_framework,
            DetectorKind::Documentation => self.documentation,
            DetectorKind::Organization => self.organization,
        }
    }

    pub fn sum(&self) -> f64 {
        DetectorKind::ALL.iter().map(|&k| self.weight_for(k)).sum()
    }

    pub fn is_valid(&self) -> bool {
        (self.sum() - 1.0).abs() < 1e-9
            && DetectorKind::ALL.iter().all(|&k| self.weight_for(k) >= 0.0)
    }
}

/// Confidence tiers the caller gates behavior on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityGate {
    High,
    Medium,
    Low,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateThresholds {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self { high: 0.85, medium: 0.65, low: 0.50 }
    }
}

impl GateThresholds {
    pub fn gate(&self, confidence: f64) -> QualityGate {
        if confidence >= self.high {
            QualityGate::High
        } else if confidence >= self.medium {
            QualityGate::Medium
        } else if confidence >= self.low {
            QualityGate::Low
        } else {
            QualityGate::Fail
        }
    }
}

/// One detector's contribution to the overall score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorScore {
    pub kind: DetectorKind,
    pub confidence: f64,
    /// Weight after renormalization over present detectors
    pub effective_weight: f64,
    pub weighted_contribution: f64,
}

/// The engine's sole consumer-facing report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardsConfidenceReport {
    pub overall_confidence: f64,
    pub gate: QualityGate,
    pub contributions: Vec<DetectorScore>,
    pub weakest: Option<DetectorKind>,
    pub strongest: Option<DetectorKind>,
    /// Detectors below 0.5 confidence
    pub low_confidence: Vec<DetectorKind>,
    pub recommendations: Vec<String>,
    pub primary_language: Option<String>,
    /// Per-category rankings with evidence and sample counts
    pub conventions: Vec<DetectionResult>,
}

impl StandardsConfidenceReport {
    /// Report for a project where nothing could run at all.
    pub fn empty() -> Self {
        Self {
            overall_confidence: 0.0,
            gate: QualityGate::Fail,
            contributions: Vec::new(),
            weakest: None,
            strongest: None,
            low_confidence: Vec::new(),
            recommendations: vec![String::from(
                "No analyzable evidence was found; add a manifest file to identify the toolchain.",
            )],
            primary_language: None,
            conventions: Vec::new(),
        }
    }
}

const LOW_CONFIDENCE_FLAG: f64 = 0.5;

pub struct Aggregator {
    weights: DetectorWeights,
    thresholds: GateThresholds,
}

impl Aggregator {
    /// Invalid weights fall back to the defaults rather than failing the
    /// pipeline; the substitution is logged.
    pub fn new(weights: DetectorWeights, thresholds: GateThresholds) -> Self {
        let weights = if weights.is_valid() {
            weights
        } else {
            warn!("detector weights do not sum to 1.0, using defaults");
            DetectorWeights::default()
        };
        Self { weights, thresholds }
    }

    /// Combine the present detectors' confidences into the final report.
    pub fn aggregate(
        &self,
        inputs: &[(DetectorKind, f64)],
        conventions: Vec<DetectionResult>,
        primary_language: Option<String>,
    ) -> StandardsConfidenceReport {
        if inputs.is_empty() {
            return StandardsConfidenceReport {
                conventions,
                primary_language,
                ..StandardsConfidenceReport::empty()
            };
        }

        let present_weight: f64 =
            inputs.iter().map(|(kind, _)| self.weights.weight_for(*kind)).sum();

        let mut contributions: Vec<DetectorScore> = inputs
            .iter()
            .map(|&(kind, raw_confidence)| {
                let confidence = if (0.0..=1.0).contains(&raw_confidence) {
                    raw_confidence
                } else {
                    warn!("{} confidence {} out of range, clamping", kind, raw_confidence);
                    raw_confidence.clamp(0.0, 1.0)
                };
                let effective_weight = if present_weight > 0.0 {
                    self.weights.weight_for(kind) / present_weight
                } else {
                    1.0 / inputs.len() as f64
                };
                DetectorScore {
                    kind,
                    confidence,
                    effective_weight,
                    weighted_contribution: confidence * effective_weight,
                }
            })
            .collect();

        let overall_confidence: f64 =
            contributions.iter().map(|c| c.weighted_contribution).sum::<f64>().clamp(0.0, 1.0);
        let gate = self.thresholds.gate(overall_confidence);

        contributions.sort_by(|a, b| {
            b.weighted_contribution
                .partial_cmp(&a.weighted_contribution)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let strongest = strongest_by_confidence(&contributions);
        let weakest = weakest_by_confidence(&contributions);
        let low_confidence: Vec<DetectorKind> = contributions
            .iter()
            .filter(|c| c.confidence < LOW_CONFIDENCE_FLAG)
            .map(|c| c.kind)
            .collect();

        let recommendations = recommendations(weakest, &low_confidence, gate);

        StandardsConfidenceReport {
            overall_confidence,
            gate,
            contributions,
            weakest,
            strongest,
            low_confidence,
            recommendations,
            primary_language,
            conventions,
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DetectorWeights::default(), GateThresholds::default())
    }
}

fn strongest_by_confidence(contributions: &[DetectorScore]) -> Option<DetectorKind> {
    contributions
        .iter()
        .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal))
        .map(|c| c.kind)
}

fn weakest_by_confidence(contributions: &[DetectorScore]) -> Option<DetectorKind> {
    contributions
        .iter()
        .min_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal))
        .map(|c| c.kind)
}

fn recommendation_for(kind: DetectorKind) -> String {
    match kind {
        DetectorKind::Language => {
            String::from("Language evidence is weak; add or complete the toolchain manifest at the project root.")
        }
        DetectorKind::Metadata => {
            String::from("Project metadata is incomplete; declare dependencies in the manifest and commit a lockfile.")
        }
        DetectorKind::History => {
            String::from("Development history is thin or unavailable; conclusions about maintenance cadence are unreliable.")
        }
        DetectorKind::FingerprintQuality => {
            String::from("Some tracked manifest files could not be read; cache validation may be unstable.")
        }
        DetectorKind::Naming => {
            String::from("Naming is inconsistent across the sampled files; converge on the dominant style.")
        }
        DetectorKind::TestFramework => {
            String::from("No single test framework stands out; standardize the test setup and its config file.")
        }
        DetectorKind::Documentation => {
            String::from("Documentation style is weak or mixed; document public items in one consistent format.")
        }
        DetectorKind::Organization => {
            String::from("Module organization shows no clear pattern; group code by one scheme (layers or features).")
        }
    }
}

fn recommendations(
    weakest: Option<DetectorKind>,
    low_confidence: &[DetectorKind],
    gate: QualityGate,
) -> Vec<String> {
    let mut out = Vec::new();
    for &kind in low_confidence {
        out.push(recommendation_for(kind));
    }
    if let Some(kind) = weakest {
        let text = recommendation_for(kind);
        if !out.contains(&text) {
            out.push(text);
        }
    }
    if gate == QualityGate::Fail && out.is_empty() {
        out.push(String::from("Overall confidence is below the usable floor; rerun after the project builds cleanly."));
    }
    out
}
