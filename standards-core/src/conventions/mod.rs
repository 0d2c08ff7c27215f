//! Code-convention detection: four structurally identical detectors
//!
//! Each detector samples a bounded file set, matches role-segmented tokens
//! against a fixed style catalog, buckets styles by frequency and scores
//! confidence as diminishing-returns(sample size) × consistency. Absence
//! of evidence is always an explicit undetermined result, never a guess.

pub mod catalog;
pub mod documentation;
pub mod naming;
pub mod organization;
pub mod sampler;
pub mod test_framework;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub use sampler::{SampleSet, SampledFile, SamplerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConventionCategory {
    Naming,
    TestFramework,
    Documentation,
    Organization,
}

impl fmt::Display for ConventionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConventionCategory::Naming => write!(f, "naming"),
            ConventionCategory::TestFramework => write!(f, "test framework"),
            ConventionCategory::Documentation => write!(f, "documentation"),
            ConventionCategory::Organization => write!(f, "code organization"),
        }
    }
}

/// Frequency bucket relative to total category evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrequencyBucket {
    /// More than 60% of evidence
    Dominant,
    /// Between 20% and 60%
    Secondary,
    /// Under 20%
    Rare,
}

impl FrequencyBucket {
    pub fn from_share(share: f64) -> Self {
        if share > 0.6 {
            FrequencyBucket::Dominant
        } else if share >= 0.2 {
            FrequencyBucket::Secondary
        } else {
            FrequencyBucket::Rare
        }
    }
}

/// One classified style with the evidence that backs it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedStyle {
    pub style: String,
    pub confidence: f64,
    pub occurrences: usize,
    pub share: f64,
    pub bucket: FrequencyBucket,
    pub evidence: Vec<String>,
}

/// Per-category detection outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    pub category: ConventionCategory,
    /// The dominant style, when one exists. `None` means no standard
    /// convention was detected.
    pub primary: Option<RankedStyle>,
    pub ranked: Vec<RankedStyle>,
    /// Files that contributed evidence
    pub sample_size: usize,
    /// Share of candidate files actually sampled
    pub coverage: f64,
    pub confidence: f64,
}

impl DetectionResult {
    pub fn undetermined(category: ConventionCategory) -> Self {
        Self { category, primary: None, ranked: Vec::new(), sample_size: 0, coverage: 0.0, confidence: 0.0 }
    }

    pub fn determined(&self) -> bool {
        self.primary.is_some()
    }
}

/// Diminishing-returns ceiling on sample size: early evidence buys a lot,
/// later evidence ever less. Monotonically increasing, asymptote 1.0.
pub(crate) fn sample_ceiling(occurrences: usize) -> f64 {
    let n = occurrences as f64;
    n / (n + 5.0)
}

/// Category confidence: sample-size ceiling × consistency of the top
/// style, both in [0,1].
pub(crate) fn detection_confidence(occurrences: usize, consistency: f64) -> f64 {
    (sample_ceiling(occurrences) * consistency.clamp(0.0, 1.0)).clamp(0.0, 1.0)
}

/// Accumulates weighted occurrences and evidence per style name
#[derive(Debug, Default)]
pub(crate) struct EvidenceTally {
    counts: HashMap<String, usize>,
    evidence: HashMap<String, Vec<String>>,
}

const MAX_EVIDENCE_PER_STYLE: usize = 5;

impl EvidenceTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, style: &str, weight: usize, evidence: impl Into<String>) {
        *self.counts.entry(style.to_string()).or_insert(0) += weight;
        let examples = self.evidence.entry(style.to_string()).or_default();
        if examples.len() < MAX_EVIDENCE_PER_STYLE {
            examples.push(evidence.into());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn count_for(&self, style: &str) -> usize {
        self.counts.get(style).copied().unwrap_or(0)
    }

    /// Rank styles by occurrence count; deterministic tie-break on name.
    pub fn ranked(&mut self) -> Vec<RankedStyle> {
        let total = self.total();
        if total == 0 {
            return Vec::new();
        }
        let mut evidence = std::mem::take(&mut self.evidence);
        let mut ranked: Vec<RankedStyle> = self
            .counts
            .iter()
            .map(|(style, &occurrences)| {
                let share = occurrences as f64 / total as f64;
                RankedStyle {
                    style: style.clone(),
                    confidence: detection_confidence(occurrences, share),
                    occurrences,
                    share,
                    bucket: FrequencyBucket::from_share(share),
                    evidence: evidence.remove(style).unwrap_or_default(),
                }
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.occurrences.cmp(&a.occurrences).then_with(|| a.style.cmp(&b.style))
        });
        ranked
    }
}

/// Shared assembly: rank, pick a dominant primary if there is one, and
/// score the category.
pub(crate) fn build_result(
    category: ConventionCategory,
    mut tally: EvidenceTally,
    sample_size: usize,
    coverage: f64,
    access_multiplier: f64,
) -> DetectionResult {
    if tally.is_empty() {
        return DetectionResult::undetermined(category);
    }
    let total = tally.total();
    let ranked = tally.ranked();
    let top = &ranked[0];
    let consistency = top.share;
    let primary =
        if top.bucket == FrequencyBucket::Dominant { Some(top.clone()) } else { None };
    let confidence =
        (detection_confidence(total, consistency) * access_multiplier.clamp(0.0, 1.0)).clamp(0.0, 1.0);

    DetectionResult { category, primary, ranked, sample_size, coverage, confidence }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_split_at_sixty_and_twenty_percent() {
        assert_eq!(FrequencyBucket::from_share(0.61), FrequencyBucket::Dominant);
        assert_eq!(FrequencyBucket::from_share(0.6), FrequencyBucket::Secondary);
        assert_eq!(FrequencyBucket::from_share(0.2), FrequencyBucket::Secondary);
        assert_eq!(FrequencyBucket::from_share(0.19), FrequencyBucket::Rare);
    }

    #[test]
    fn ceiling_is_monotonic_and_bounded() {
        let mut previous = 0.0;
        for n in 0..500 {
            let ceiling = sample_ceiling(n);
            assert!(ceiling >= previous);
            assert!(ceiling < 1.0);
            previous = ceiling;
        }
    }

    #[test]
    fn confidence_monotonic_in_evidence_at_constant_consistency() {
        let mut previous = 0.0;
        for n in 1..200 {
            let confidence = detection_confidence(n, 0.8);
            assert!(confidence >= previous);
            previous = confidence;
        }
    }

    #[test]
    fn confidence_never_increases_with_lower_consistency() {
        for n in [1usize, 10, 50, 200] {
            assert!(detection_confidence(n, 0.9) >= detection_confidence(n, 0.5));
            assert!(detection_confidence(n, 0.5) >= detection_confidence(n, 0.1));
        }
    }

    #[test]
    fn empty_tally_is_undetermined() {
        let result = build_result(
            ConventionCategory::Naming,
            EvidenceTally::new(),
            0,
            0.0,
            1.0,
        );
        assert!(!result.determined());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn dominant_style_becomes_primary() {
        let mut tally = EvidenceTally::new();
        for i in 0..80 {
            tally.record("snake_case", 1, format!("token_{}", i));
        }
        for i in 0..20 {
            tally.record("camelCase", 1, format!("token{}", i));
        }
        let result = build_result(ConventionCategory::Naming, tally, 10, 1.0, 1.0);
        let primary = result.primary.expect("80% share is dominant");
        assert_eq!(primary.style, "snake_case");
        assert_eq!(primary.bucket, FrequencyBucket::Dominant);
        assert!(result.confidence > 0.7);
        assert_eq!(result.ranked.len(), 2);
        assert!(primary.evidence.len() <= 5);
    }

    #[test]
    fn split_evidence_has_no_primary() {
        let mut tally = EvidenceTally::new();
        for _ in 0..50 {
            tally.record("snake_case", 1, "a");
            tally.record("camelCase", 1, "b");
        }
        let result = build_result(ConventionCategory::Naming, tally, 10, 1.0, 1.0);
        assert!(result.primary.is_none());
        assert_eq!(result.ranked.len(), 2);
    }

    #[test]
    fn access_multiplier_discounts_confidence() {
        let make = |multiplier: f64| {
            let mut tally = EvidenceTally::new();
            for _ in 0..100 {
                tally.record("snake_case", 1, "x");
            }
            build_result(ConventionCategory::Naming, tally, 10, 1.0, multiplier)
        };
        assert!(make(0.5).confidence < make(1.0).confidence);
    }
}
