//! Permission-tolerant file access used by every detector
//!
//! Reads and scans never raise; denials are classified and accumulated
//! into an [`AccessReport`] that detectors use to discount confidence.

use dashmap::DashMap;
use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::fs;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Why a path could not be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenialKind {
    NotFound,
    PermissionDenied,
    Other,
}

/// A single denied path with its classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Denial {
    pub path: PathBuf,
    pub kind: DenialKind,
}

/// Result of a single read attempt. Never an error.
#[derive(Debug)]
pub enum ReadOutcome {
    Content(String),
    Denied(Denial),
}

impl ReadOutcome {
    pub fn content(&self) -> Option<&str> {
        match self {
            ReadOutcome::Content(c) => Some(c),
            ReadOutcome::Denied(_) => None,
        }
    }
}

/// Result of a directory scan: whatever was reachable plus what was not
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<PathBuf>,
    pub denied: Vec<Denial>,
}

/// Coarse label for how much of the project was actually readable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessQuality {
    Full,
    Partial,
    Poor,
}

/// Accumulated access statistics for one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub denied: Vec<Denial>,
    pub coverage: f64,
    pub quality: AccessQuality,
    pub confidence_multiplier: f64,
}

impl AccessReport {
    fn from_counts(attempted: usize, succeeded: usize, denied: Vec<Denial>) -> Self {
        let coverage = if attempted == 0 { 1.0 } else { succeeded as f64 / attempted as f64 };
        let quality = if coverage >= 0.95 {
            AccessQuality::Full
        } else if coverage >= 0.60 {
            AccessQuality::Partial
        } else {
            AccessQuality::Poor
        };
        // Detectors multiply their confidence by this; full access is neutral
        let confidence_multiplier = coverage.clamp(0.0, 1.0);
        Self { attempted, succeeded, denied, coverage, quality, confidence_multiplier }
    }
}

/// Shared counters for read attempts across concurrent detectors
#[derive(Debug, Default)]
pub struct AccessRecorder {
    attempted: AtomicUsize,
    succeeded: AtomicUsize,
    denials: DashMap<PathBuf, DenialKind>,
}

impl AccessRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_success(&self) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    fn record_denial(&self, path: &Path, kind: DenialKind) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
        self.denials.insert(path.to_path_buf(), kind);
    }

    pub fn report(&self) -> AccessReport {
        let denied: Vec<Denial> = self
            .denials
            .iter()
            .map(|entry| Denial { path: entry.key().clone(), kind: *entry.value() })
            .collect();
        AccessReport::from_counts(
            self.attempted.load(Ordering::Relaxed),
            self.succeeded.load(Ordering::Relaxed),
            denied,
        )
    }
}

fn classify_io_error(err: &std::io::Error) -> DenialKind {
    match err.kind() {
        std::io::ErrorKind::NotFound => DenialKind::NotFound,
        std::io::ErrorKind::PermissionDenied => DenialKind::PermissionDenied,
        _ => DenialKind::Other,
    }
}

/// The single read/scan primitive. One attempt per path, no retry.
#[derive(Debug, Clone)]
pub struct AccessGateway {
    recorder: Arc<AccessRecorder>,
}

impl AccessGateway {
    pub fn new() -> Self {
        Self { recorder: Arc::new(AccessRecorder::new()) }
    }

    pub fn with_recorder(recorder: Arc<AccessRecorder>) -> Self {
        Self { recorder }
    }

    pub fn recorder(&self) -> Arc<AccessRecorder> {
        self.recorder.clone()
    }

    /// Read a file to a string. Denials are recorded, never propagated.
    pub async fn read(&self, path: &Path) -> ReadOutcome {
        match fs::read_to_string(path).await {
            Ok(content) => {
                self.recorder.record_success();
                trace!("read {} bytes from {:?}", content.len(), path);
                ReadOutcome::Content(content)
            }
            Err(err) => {
                let kind = classify_io_error(&err);
                debug!("read denied for {:?}: {:?}", path, kind);
                self.recorder.record_denial(path, kind);
                ReadOutcome::Denied(Denial { path: path.to_path_buf(), kind })
            }
        }
    }

    /// Scan a directory for files matching a glob pattern, up to `max_depth`.
    ///
    /// Returns accessible files plus the paths that could not be entered.
    /// Walk errors become denials; the scan itself never fails.
    pub fn scan(&self, dir: &Path, pattern: &str, max_depth: usize) -> ScanOutcome {
        let matcher = match Glob::new(pattern) {
            Ok(glob) => glob.compile_matcher(),
            Err(_) => {
                debug!("invalid scan pattern {:?}, matching nothing", pattern);
                return ScanOutcome::default();
            }
        };

        let mut outcome = ScanOutcome::default();
        for entry in WalkDir::new(dir).follow_links(false).max_depth(max_depth) {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && matches_file(&matcher, entry.path()) {
                        outcome.files.push(entry.path().to_path_buf());
                    }
                }
                Err(err) => {
                    let path = err.path().unwrap_or(dir).to_path_buf();
                    let kind = err
                        .io_error()
                        .map(classify_io_error)
                        .unwrap_or(DenialKind::Other);
                    self.recorder.record_denial(&path, kind);
                    outcome.denied.push(Denial { path, kind });
                }
            }
        }
        outcome.files.sort();
        outcome
    }
}

impl Default for AccessGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_file(matcher: &GlobMatcher, path: &Path) -> bool {
    path.file_name().map(|name| matcher.is_match(name)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_missing_file_is_denial_not_error() {
        let gateway = AccessGateway::new();
        let outcome = gateway.read(Path::new("/definitely/not/here.toml")).await;
        match outcome {
            ReadOutcome::Denied(denial) => assert_eq!(denial.kind, DenialKind::NotFound),
            ReadOutcome::Content(_) => panic!("expected denial"),
        }
        let report = gateway.recorder().report();
        assert_eq!(report.attempted, 1);
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.denied.len(), 1);
    }

    #[tokio::test]
    async fn read_counts_toward_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Cargo.toml");
        std::fs::write(&file, "[package]\nname = \"x\"\n").unwrap();

        let gateway = AccessGateway::new();
        assert!(gateway.read(&file).await.content().is_some());
        gateway.read(&dir.path().join("missing")).await;

        let report = gateway.recorder().report();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 1);
        assert!((report.coverage - 0.5).abs() < 1e-9);
        assert_eq!(report.quality, AccessQuality::Poor);
    }

    #[test]
    fn scan_is_bounded_by_depth_and_pattern() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        std::fs::create_dir_all(dir.path().join("nested/deep")).unwrap();
        std::fs::write(dir.path().join("nested/b.rs"), "").unwrap();
        std::fs::write(dir.path().join("nested/deep/c.rs"), "").unwrap();
        std::fs::write(dir.path().join("ignored.py"), "").unwrap();

        let gateway = AccessGateway::new();
        let shallow = gateway.scan(dir.path(), "*.rs", 1);
        assert_eq!(shallow.files.len(), 1);

        let deeper = gateway.scan(dir.path(), "*.rs", 3);
        assert_eq!(deeper.files.len(), 3);
    }

    #[test]
    fn empty_report_has_full_coverage() {
        let recorder = AccessRecorder::new();
        let report = recorder.report();
        assert!((report.coverage - 1.0).abs() < 1e-9);
        assert_eq!(report.quality, AccessQuality::Full);
    }
}
