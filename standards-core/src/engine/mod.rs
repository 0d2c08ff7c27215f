//! The analysis pipeline
//!
//! Language detection and metadata extraction run first and gate
//! everything else. The fingerprint is computed next so the cache can be
//! consulted before any expensive detector runs. On a miss, the history
//! analyzer and the four convention detectors fan out as independent
//! concurrent tasks under per-phase budgets; aggregation and the
//! degradation decision run strictly after the fan-out settles.

use crate::access::{AccessGateway, AccessRecorder, AccessReport};
use crate::aggregate::{
    Aggregator, DetectorKind, DetectorWeights, GateThresholds, StandardsConfidenceReport,
};
use crate::budget::{BudgetConfig, BudgetScheduler, PerformanceSnapshot, Phase};
use crate::cache::{CacheConfig, CacheManager};
use crate::conventions::{
    self, ConventionCategory, DetectionResult, SampleSet, SamplerConfig,
};
use crate::degrade::{DegradationInfo, DegradationStrategy};
use crate::fingerprint::{Fingerprinter, ProjectFingerprint};
use crate::history::{HistoryAnalyzer, HistoryAnalyzerConfig};
use crate::language::{LanguageDetection, LanguageDetector, LanguageDetectorConfig};
use crate::metadata::{MetadataExtractor, ProjectMetadata};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Only the project root itself can make analysis fail outright
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot analyze {path}: {reason}")]
    CannotAnalyze { path: PathBuf, reason: String },
}

/// Synchronous phase-completion callback; the engine has no opinion on
/// the caller's concurrency model.
pub type PhaseObserver = Arc<dyn Fn(Phase) + Send + Sync>;

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub weights: DetectorWeights,
    pub thresholds: GateThresholds,
    pub budget: BudgetConfig,
    pub cache: CacheConfig,
    pub sampler: SamplerConfig,
    pub language: LanguageDetectorConfig,
    pub history: HistoryAnalyzerConfig,
}

/// Everything a caller gets back from one run. The report and the
/// degradation info are the contract; internal detector structures stay
/// internal.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub report: StandardsConfidenceReport,
    pub degradation: DegradationInfo,
    pub fingerprint: ProjectFingerprint,
    pub access: AccessReport,
    pub snapshot: PerformanceSnapshot,
    pub from_cache: bool,
}

pub struct StandardsEngine {
    config: EngineConfig,
    cache: Arc<CacheManager>,
    observer: Option<PhaseObserver>,
}

impl StandardsEngine {
    pub fn new(config: EngineConfig) -> Self {
        let cache = Arc::new(CacheManager::new(config.cache.clone()));
        Self { config, cache, observer: None }
    }

    /// Use an externally owned cache, e.g. one shared across analyses or
    /// preloaded from a persisted blob.
    pub fn with_cache(config: EngineConfig, cache: Arc<CacheManager>) -> Self {
        Self { config, cache, observer: None }
    }

    pub fn set_observer(&mut self, observer: PhaseObserver) {
        self.observer = Some(observer);
    }

    pub fn cache(&self) -> Arc<CacheManager> {
        self.cache.clone()
    }

    fn phase_done(&self, scheduler: &BudgetScheduler, phase: Phase) {
        scheduler.end_phase(phase);
        if let Some(observer) = &self.observer {
            observer(phase);
        }
    }

    /// Run the full pipeline against one project root.
    pub async fn analyze(&self, root: &Path) -> Result<AnalysisOutcome, EngineError> {
        validate_root(root).await?;

        let scheduler = BudgetScheduler::new(self.config.budget.clone());
        let recorder = Arc::new(AccessRecorder::new());
        let gateway = AccessGateway::with_recorder(recorder.clone());

        // -- language + metadata gate the rest of the run
        scheduler.begin_phase(Phase::Language);
        let detector = LanguageDetector::new(self.config.language.clone());
        let detection = match timeout(
            scheduler.phase_budget(Phase::Language),
            detector.detect(&gateway, root),
        )
        .await
        {
            Ok(detection) => detection,
            Err(_) => {
                scheduler.mark_timeout(Phase::Language);
                LanguageDetection::undetermined()
            }
        };
        self.phase_done(&scheduler, Phase::Language);

        scheduler.begin_phase(Phase::Metadata);
        let metadata = match timeout(
            scheduler.phase_budget(Phase::Metadata),
            MetadataExtractor::extract(&gateway, root, &detection),
        )
        .await
        {
            Ok(metadata) => metadata,
            Err(_) => {
                scheduler.mark_timeout(Phase::Metadata);
                ProjectMetadata::default()
            }
        };
        self.phase_done(&scheduler, Phase::Metadata);

        // -- fingerprint before anything expensive, so the cache can
        //    short-circuit the run
        scheduler.begin_phase(Phase::Fingerprint);
        let head_digest = HistoryAnalyzer::head_digest(root);
        let fingerprint =
            Fingerprinter::compute(&gateway, root, &detection, head_digest.as_deref()).await;
        self.phase_done(&scheduler, Phase::Fingerprint);

        if !detection.detected() {
            info!("no language detected at {:?}, generic degradation", root);
            return Ok(self.generic_outcome(&scheduler, recorder, fingerprint));
        }

        if let Some(report) = self.cache.get(&fingerprint.hash) {
            debug!("cache hit for {:?}, skipping detectors", root);
            let degradation = DegradationStrategy::evaluate(
                true,
                report.gate,
                false,
                Vec::new(),
                false,
            );
            let mut snapshot = scheduler.snapshot();
            snapshot.degradation_level = Some(degradation.level);
            return Ok(AnalysisOutcome {
                report,
                degradation,
                fingerprint,
                access: recorder.report(),
                snapshot,
                from_cache: true,
            });
        }

        // -- concurrent fan-out: history plus the four convention
        //    detectors, unordered, bounded by their phase budgets
        scheduler.begin_phase(Phase::History);
        let history_budget = scheduler.phase_budget(Phase::History);
        let history_task = {
            let root = root.to_path_buf();
            let config = self.config.history.clone();
            tokio::spawn(async move {
                let work =
                    tokio::task::spawn_blocking(move || HistoryAnalyzer::new(config).analyze(&root));
                match timeout(history_budget, work).await {
                    Ok(Ok(analysis)) => Ok(analysis),
                    Ok(Err(join_error)) => {
                        warn!("history task failed: {}", join_error);
                        Ok(None)
                    }
                    Err(_) => Err(()),
                }
            })
        };

        scheduler.begin_phase(Phase::Conventions);
        let conventions_budget = scheduler.phase_budget(Phase::Conventions);
        let samples = match timeout(
            conventions_budget,
            conventions::sampler::collect(&gateway, root, &detection, &self.config.sampler),
        )
        .await
        {
            Ok(samples) => samples,
            Err(_) => {
                scheduler.mark_timeout(Phase::Conventions);
                SampleSet::default()
            }
        };

        let access = recorder.report();
        let multiplier = access.confidence_multiplier;
        let remaining = scheduler.phase_budget(Phase::Conventions);

        let (naming, test_framework, documentation, organization) = tokio::join!(
            timeout(remaining, async { conventions::naming::detect(&samples, multiplier) }),
            timeout(
                remaining,
                conventions::test_framework::detect(&gateway, root, &samples, &metadata, multiplier),
            ),
            timeout(remaining, async {
                conventions::documentation::detect(&samples, multiplier)
            }),
            timeout(remaining, async {
                conventions::organization::detect(&samples, &metadata, multiplier)
            }),
        );
        let mut conventions_timed_out = false;
        let mut settle = |result: Result<DetectionResult, _>, category| match result {
            Ok(detection) => detection,
            Err(_) => {
                conventions_timed_out = true;
                DetectionResult::undetermined(category)
            }
        };
        let naming = settle(naming, ConventionCategory::Naming);
        let test_framework = settle(test_framework, ConventionCategory::TestFramework);
        let documentation = settle(documentation, ConventionCategory::Documentation);
        let organization = settle(organization, ConventionCategory::Organization);
        if conventions_timed_out {
            scheduler.mark_timeout(Phase::Conventions);
        }
        self.phase_done(&scheduler, Phase::Conventions);

        let history = match history_task.await {
            Ok(Ok(analysis)) => analysis,
            Ok(Err(())) => {
                scheduler.mark_timeout(Phase::History);
                None
            }
            Err(join_error) => {
                warn!("history task aborted: {}", join_error);
                None
            }
        };
        self.phase_done(&scheduler, Phase::History);

        // -- strictly sequential tail: aggregate, then degrade
        scheduler.begin_phase(Phase::Aggregation);
        let access = recorder.report();
        let primary_language = detection.primary.as_ref().map(|p| p.language.to_string());

        // every detector's confidence is discounted by what was actually
        // readable; fingerprint quality is already a coverage ratio
        let discount = access.confidence_multiplier;
        let mut inputs: Vec<(DetectorKind, f64)> = vec![
            (DetectorKind::Language, detection.confidence * discount),
            (DetectorKind::Metadata, metadata.confidence * discount),
            (DetectorKind::FingerprintQuality, fingerprint.quality()),
        ];
        if let Some(history) = &history {
            inputs.push((DetectorKind::History, history_confidence(history.commit_count)));
        }
        let convention_results = [
            (DetectorKind::Naming, &naming),
            (DetectorKind::TestFramework, &test_framework),
            (DetectorKind::Documentation, &documentation),
            (DetectorKind::Organization, &organization),
        ];
        let truncated = scheduler.timed_out(Phase::Conventions);
        for (kind, result) in convention_results {
            // a timed-out detector did not run to completion; its weight
            // redistributes instead of counting as zero
            if !truncated {
                inputs.push((kind, result.confidence));
            }
        }

        let aggregator =
            Aggregator::new(self.config.weights.clone(), self.config.thresholds.clone());
        let mut report = aggregator.aggregate(
            &inputs,
            vec![naming, test_framework, documentation, organization],
            primary_language.clone(),
        );
        self.phase_done(&scheduler, Phase::Aggregation);

        let mut missing_components = Vec::new();
        if history.is_none() {
            missing_components.push(String::from("history"));
        }
        if truncated {
            missing_components.push(String::from("conventions"));
        }

        let gate = report.gate;
        let level = DegradationStrategy::decide(true, gate, truncated);
        let mut used_cached_report = false;
        if level == crate::degrade::DegradationLevel::NoStandards {
            if let Some(language) = &primary_language {
                if let Some(cached) = self.cache.most_recent_for_language(language) {
                    info!("substituting compatible cached report for {}", language);
                    report = cached;
                    used_cached_report = true;
                }
            }
        }
        let degradation = DegradationStrategy::evaluate(
            true,
            gate,
            truncated,
            missing_components,
            used_cached_report,
        );

        if !used_cached_report {
            self.cache.put(fingerprint.hash.clone(), report.clone());
        }

        let mut snapshot = scheduler.snapshot();
        snapshot.degradation_level = Some(degradation.level);

        Ok(AnalysisOutcome {
            report,
            degradation,
            fingerprint,
            access,
            snapshot,
            from_cache: false,
        })
    }

    /// Level 3: no language, no detectors. Scores stay at zero and the
    /// reason says so.
    fn generic_outcome(
        &self,
        scheduler: &BudgetScheduler,
        recorder: Arc<AccessRecorder>,
        fingerprint: ProjectFingerprint,
    ) -> AnalysisOutcome {
        let report = StandardsConfidenceReport::empty();
        let degradation = DegradationStrategy::evaluate(
            false,
            report.gate,
            scheduler.any_timeout(),
            DetectorKind::ALL.iter().map(|k| k.to_string()).collect(),
            false,
        );
        let mut snapshot = scheduler.snapshot();
        snapshot.degradation_level = Some(degradation.level);
        AnalysisOutcome {
            report,
            degradation,
            fingerprint,
            access: recorder.report(),
            snapshot,
            from_cache: false,
        }
    }
}

/// More recent commits buy confidence with diminishing returns, same
/// curve as the convention detectors.
fn history_confidence(commit_count: usize) -> f64 {
    let n = commit_count as f64;
    n / (n + 5.0)
}

async fn validate_root(root: &Path) -> Result<(), EngineError> {
    let metadata = tokio::fs::metadata(root).await.map_err(|err| EngineError::CannotAnalyze {
        path: root.to_path_buf(),
        reason: err.to_string(),
    })?;
    if !metadata.is_dir() {
        return Err(EngineError::CannotAnalyze {
            path: root.to_path_buf(),
            reason: String::from("not a directory"),
        });
    }
    tokio::fs::read_dir(root).await.map_err(|err| EngineError::CannotAnalyze {
        path: root.to_path_buf(),
        reason: err.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::QualityGate;
    use crate::degrade::DegradationLevel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine() -> StandardsEngine {
        StandardsEngine::new(EngineConfig::default())
    }

    fn write_python_project(dir: &Path, files: usize) {
        std::fs::write(
            dir.join("pyproject.toml"),
            "[project]\nname = \"demo\"\nversion = \"1.0.0\"\ndependencies = [\"pytest>=8\"]\n\n[tool.pytest.ini_options]\ntestpaths = [\"tests\"]\n",
        )
        .unwrap();
        std::fs::write(dir.join("requirements.txt"), "pytest==8.0.0\n").unwrap();
        std::fs::create_dir_all(dir.join("src")).unwrap();
        std::fs::create_dir_all(dir.join("tests")).unwrap();
        for i in 0..files {
            std::fs::write(
                dir.join(format!("src/module_{:03}.py", i)),
                "\"\"\"Module docs.\"\"\"\n\ndef load_config(path):\n    \"\"\"Load configuration.\"\"\"\n    return path\n\ndef write_output(data):\n    \"\"\"Write output.\"\"\"\n    return data\n\ndef merge_records(a, b):\n    \"\"\"Merge two records.\"\"\"\n    return a\n",
            )
            .unwrap();
        }
        std::fs::write(
            dir.join("tests/test_module.py"),
            "import pytest\n\ndef test_load_config():\n    assert True\n\ndef test_write_output():\n    assert True\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn nonexistent_root_is_the_only_terminal_error() {
        let result = engine().analyze(Path::new("/no/such/project")).await;
        assert!(matches!(result, Err(EngineError::CannotAnalyze { .. })));
    }

    #[tokio::test]
    async fn empty_directory_degrades_to_generic_with_zero_confidence() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = engine().analyze(dir.path()).await.unwrap();
        assert_eq!(outcome.degradation.level, DegradationLevel::Generic);
        assert_eq!(outcome.report.overall_confidence, 0.0);
        assert!(outcome.report.contributions.is_empty(), "no detectors ran");
        assert!(!outcome.from_cache);
    }

    #[tokio::test]
    async fn manifest_only_project_gates_low_with_undetermined_conventions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"bare\"\n\n[dependencies]\nserde = \"1\"\n",
        )
        .unwrap();

        let outcome = engine().analyze(dir.path()).await.unwrap();
        assert!(matches!(outcome.report.gate, QualityGate::Low | QualityGate::Fail));
        assert!(outcome.report.conventions.iter().all(|c| !c.determined()));
        assert_eq!(outcome.degradation.level, DegradationLevel::NoStandards);
    }

    #[tokio::test]
    async fn consistent_python_project_gates_high() {
        let dir = tempfile::tempdir().unwrap();
        write_python_project(dir.path(), 100);

        let outcome = engine().analyze(dir.path()).await.unwrap();
        let naming = outcome
            .report
            .conventions
            .iter()
            .find(|c| c.category == ConventionCategory::Naming)
            .unwrap();
        assert_eq!(naming.primary.as_ref().unwrap().style, "snake_case");
        assert!(naming.confidence > 0.8, "naming confidence {}", naming.confidence);

        let test_framework = outcome
            .report
            .conventions
            .iter()
            .find(|c| c.category == ConventionCategory::TestFramework)
            .unwrap();
        assert_eq!(test_framework.primary.as_ref().unwrap().style, "pytest");
        assert!(
            test_framework.confidence > 0.85,
            "test-framework confidence {}",
            test_framework.confidence
        );

        assert_eq!(outcome.report.gate, QualityGate::High, "report: {:?}", outcome.report);
        assert_eq!(outcome.degradation.level, DegradationLevel::Full);
    }

    #[tokio::test]
    async fn unchanged_reanalysis_hits_cache_with_zero_detector_invocations() {
        let dir = tempfile::tempdir().unwrap();
        write_python_project(dir.path(), 20);

        let engine = engine();
        let first = engine.analyze(dir.path()).await.unwrap();
        assert!(!first.from_cache);

        let second = engine.analyze(dir.path()).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(first.fingerprint.hash, second.fingerprint.hash);
        assert_eq!(first.report.overall_confidence, second.report.overall_confidence);
        // fan-out phases never started on the cached run
        let phase_started = |snapshot: &PerformanceSnapshot, phase: Phase| {
            snapshot.phases.iter().find(|p| p.phase == phase).unwrap().started_ms.is_some()
        };
        assert!(!phase_started(&second.snapshot, Phase::Conventions));
        assert!(!phase_started(&second.snapshot, Phase::History));
    }

    #[tokio::test]
    async fn single_file_change_invalidates_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        write_python_project(dir.path(), 20);

        let engine = engine();
        let first = engine.analyze(dir.path()).await.unwrap();
        std::fs::write(
            dir.path().join("requirements.txt"),
            "pytest==8.0.0\nrequests==2.31.0\n",
        )
        .unwrap();
        let second = engine.analyze(dir.path()).await.unwrap();

        assert_ne!(first.fingerprint.hash, second.fingerprint.hash);
        assert!(!second.from_cache);
    }

    #[tokio::test]
    async fn observer_sees_every_completed_phase() {
        let dir = tempfile::tempdir().unwrap();
        write_python_project(dir.path(), 5);

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let mut engine = engine();
        engine.set_observer(Arc::new(move |_phase| {
            counter.fetch_add(1, Ordering::Relaxed);
        }));

        engine.analyze(dir.path()).await.unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), Phase::ALL.len());
    }

    #[tokio::test]
    async fn injected_cache_is_shared_between_engines() {
        let dir = tempfile::tempdir().unwrap();
        write_python_project(dir.path(), 10);

        let cache = Arc::new(CacheManager::default());
        let first_engine =
            StandardsEngine::with_cache(EngineConfig::default(), cache.clone());
        first_engine.analyze(dir.path()).await.unwrap();
        assert_eq!(cache.len(), 1);

        let second_engine = StandardsEngine::with_cache(EngineConfig::default(), cache);
        let outcome = second_engine.analyze(dir.path()).await.unwrap();
        assert!(outcome.from_cache);
    }
}
