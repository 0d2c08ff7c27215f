//! Three-level graceful degradation
//!
//! Evaluated exactly once, after every phase has reported. The worst
//! case this engine produces is Level 3 with an explicit reason; nothing
//! in the pipeline is fatal except an unreadable project root.

use crate::aggregate::QualityGate;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegradationLevel {
    /// Language detected and confidence at least MEDIUM
    Full,
    /// Language detected, but standards can't be trusted
    NoStandards,
    /// No language detected at all
    Generic,
}

impl DegradationLevel {
    pub fn name(&self) -> &'static str {
        match self {
            DegradationLevel::Full => "full",
            DegradationLevel::NoStandards => "no-standards",
            DegradationLevel::Generic => "generic",
        }
    }
}

/// Attached to every outcome: the chosen level, what was missing and why
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegradationInfo {
    pub level: DegradationLevel,
    pub missing_components: Vec<String>,
    pub reason: String,
    /// True when the report came from a compatible cached entry instead
    /// of this run's detectors
    pub used_cached_report: bool,
}

pub struct DegradationStrategy;

impl DegradationStrategy {
    /// Pure decision over the three inputs; every combination maps to
    /// exactly one level.
    pub fn decide(language_detected: bool, gate: QualityGate, truncated: bool) -> DegradationLevel {
        if !language_detected {
            return DegradationLevel::Generic;
        }
        let confident = matches!(gate, QualityGate::High | QualityGate::Medium);
        if confident && !truncated {
            DegradationLevel::Full
        } else {
            DegradationLevel::NoStandards
        }
    }

    pub fn evaluate(
        language_detected: bool,
        gate: QualityGate,
        truncated: bool,
        missing_components: Vec<String>,
        used_cached_report: bool,
    ) -> DegradationInfo {
        let level = Self::decide(language_detected, gate, truncated);
        let reason = match level {
            DegradationLevel::Full => {
                String::from("language detected and overall confidence met the MEDIUM threshold")
            }
            DegradationLevel::NoStandards => {
                let cause = if truncated {
                    "convention detection was truncated by the time budget"
                } else {
                    "overall confidence fell below the MEDIUM threshold"
                };
                if used_cached_report {
                    format!("{}; a compatible cached report was substituted", cause)
                } else {
                    format!("{}; proceeding without convention guidance", cause)
                }
            }
            DegradationLevel::Generic => {
                String::from("no language could be detected from root marker files")
            }
        };
        info!("degradation level {}: {}", level.name(), reason);
        DegradationInfo { level, missing_components, reason, used_cached_report }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_input_combination_maps_to_exactly_one_level() {
        let gates =
            [QualityGate::High, QualityGate::Medium, QualityGate::Low, QualityGate::Fail];
        for language_detected in [true, false] {
            for gate in gates {
                for truncated in [true, false] {
                    let first = DegradationStrategy::decide(language_detected, gate, truncated);
                    let second = DegradationStrategy::decide(language_detected, gate, truncated);
                    assert_eq!(first, second, "decision must be reproducible");
                    if !language_detected {
                        assert_eq!(first, DegradationLevel::Generic);
                    }
                }
            }
        }
    }

    #[test]
    fn confident_untruncated_runs_are_full() {
        assert_eq!(
            DegradationStrategy::decide(true, QualityGate::High, false),
            DegradationLevel::Full
        );
        assert_eq!(
            DegradationStrategy::decide(true, QualityGate::Medium, false),
            DegradationLevel::Full
        );
    }

    #[test]
    fn low_confidence_or_truncation_degrades_to_no_standards() {
        assert_eq!(
            DegradationStrategy::decide(true, QualityGate::Low, false),
            DegradationLevel::NoStandards
        );
        assert_eq!(
            DegradationStrategy::decide(true, QualityGate::High, true),
            DegradationLevel::NoStandards
        );
    }

    #[test]
    fn missing_language_wins_over_everything() {
        assert_eq!(
            DegradationStrategy::decide(false, QualityGate::High, false),
            DegradationLevel::Generic
        );
    }

    #[test]
    fn reasons_are_human_readable() {
        let info = DegradationStrategy::evaluate(
            true,
            QualityGate::Low,
            false,
            vec![String::from("history")],
            false,
        );
        assert_eq!(info.level, DegradationLevel::NoStandards);
        assert!(info.reason.contains("confidence"));
        assert_eq!(info.missing_components, vec![String::from("history")]);
    }
}
