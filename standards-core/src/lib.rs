//! Project standards detection and confidence aggregation
//!
//! This crate inspects a source tree to determine its language and
//! toolchain, dependency metadata, development-history signals and four
//! code-convention categories, combines per-signal confidence into one
//! quality-gated score, fingerprints the project for cache validation,
//! and enforces a multi-phase time budget with three-level graceful
//! degradation.

pub mod access;
pub mod aggregate;
pub mod budget;
pub mod cache;
pub mod conventions;
pub mod degrade;
pub mod engine;
pub mod fingerprint;
pub mod history;
pub mod language;
pub mod metadata;

pub use access::{AccessGateway, AccessReport};
pub use aggregate::{
    DetectorKind, DetectorWeights, GateThresholds, QualityGate, StandardsConfidenceReport,
};
pub use budget::{BudgetConfig, PerformanceSnapshot, Phase};
pub use cache::{CacheConfig, CacheEntry, CacheManager};
pub use conventions::{ConventionCategory, DetectionResult, RankedStyle};
pub use degrade::{DegradationInfo, DegradationLevel};
pub use engine::{AnalysisOutcome, EngineConfig, EngineError, StandardsEngine};
pub use fingerprint::ProjectFingerprint;
pub use language::{Language, LanguageDetection};
pub use metadata::ProjectMetadata;
