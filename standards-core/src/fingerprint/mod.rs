//! Deterministic project fingerprinting for cache validation
//!
//! The hash covers sorted, canonicalized (relative filename + content)
//! pairs of every tracked manifest/lock file, a compact history digest
//! when one exists, and the language/version digest. Nothing
//! time-dependent, random, or absolute-path shaped is ever hashed.

use crate::access::AccessGateway;
use crate::language::markers::TRACKED_FILES;
use crate::language::LanguageDetection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::trace;

pub const FINGERPRINT_ALGORITHM: &str = "sha256";
pub const FINGERPRINT_FORMAT_VERSION: u32 = 1;

/// Sub-hashes of the fingerprint inputs, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintComponents {
    pub manifests: String,
    pub history: Option<String>,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFingerprint {
    pub hash: String,
    pub algorithm: String,
    pub format_version: u32,
    /// Record metadata only; never part of the hashed input
    pub computed_at: DateTime<Utc>,
    pub components: FingerprintComponents,
    /// Tracked files found vs. successfully read, as a quality signal
    pub files_tracked: usize,
    pub files_hashed: usize,
}

impl ProjectFingerprint {
    /// Input quality for the aggregator: how much of the tracked state
    /// was actually hashed.
    pub fn quality(&self) -> f64 {
        if self.files_tracked == 0 {
            return 0.0;
        }
        self.files_hashed as f64 / self.files_tracked as f64
    }
}

pub struct Fingerprinter;

impl Fingerprinter {
    /// Compute the fingerprint over root-level tracked files.
    ///
    /// `history_digest` is the cheap repository head digest, or `None`
    /// when no usable history exists.
    pub async fn compute(
        gateway: &AccessGateway,
        root: &Path,
        detection: &LanguageDetection,
        history_digest: Option<&str>,
    ) -> ProjectFingerprint {
        // Lexicographic filename order, always; TRACKED_FILES is sorted
        // here rather than trusted
        let mut tracked: Vec<&str> = TRACKED_FILES.to_vec();
        tracked.sort_unstable();

        let mut manifest_hasher = Sha256::new();
        let mut files_tracked = 0usize;
        let mut files_hashed = 0usize;

        for name in tracked {
            let path = root.join(name);
            if !path.exists() {
                continue;
            }
            files_tracked += 1;
            let Some(content) = gateway.read(&path).await.content().map(|c| c.to_string()) else {
                continue;
            };
            files_hashed += 1;
            manifest_hasher.update(name.as_bytes());
            manifest_hasher.update([0u8]);
            manifest_hasher.update(content.as_bytes());
            manifest_hasher.update([0u8]);
            trace!("fingerprinted {}", name);
        }
        let manifests = format!("{:x}", manifest_hasher.finalize());

        let history = history_digest.map(|digest| {
            let mut hasher = Sha256::new();
            hasher.update(digest.as_bytes());
            format!("{:x}", hasher.finalize())
        });

        let language_input = match &detection.primary {
            Some(primary) => format!(
                "{}|{}",
                primary.language,
                detection.version_hint.as_deref().unwrap_or("")
            ),
            None => String::from("undetermined"),
        };
        let language = {
            let mut hasher = Sha256::new();
            hasher.update(language_input.as_bytes());
            format!("{:x}", hasher.finalize())
        };

        let mut overall = Sha256::new();
        overall.update(FINGERPRINT_FORMAT_VERSION.to_be_bytes());
        overall.update(manifests.as_bytes());
        if let Some(history) = &history {
            overall.update(history.as_bytes());
        }
        overall.update(language.as_bytes());

        ProjectFingerprint {
            hash: format!("{:x}", overall.finalize()),
            algorithm: FINGERPRINT_ALGORITHM.to_string(),
            format_version: FINGERPRINT_FORMAT_VERSION,
            computed_at: Utc::now(),
            components: FingerprintComponents { manifests, history, language },
            files_tracked,
            files_hashed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{LanguageDetector, LanguageDetectorConfig};

    async fn fingerprint_of(dir: &Path) -> ProjectFingerprint {
        let gateway = AccessGateway::new();
        let detection = LanguageDetector::new(LanguageDetectorConfig::default())
            .detect(&gateway, dir)
            .await;
        Fingerprinter::compute(&gateway, dir, &detection, None).await
    }

    fn write_project(dir: &Path) {
        std::fs::write(
            dir.join("Cargo.toml"),
            "[package]\nname = \"demo\"\n\n[dependencies]\nserde = \"1\"\n",
        )
        .unwrap();
        std::fs::write(dir.join("Cargo.lock"), "version = 4\n").unwrap();
    }

    #[tokio::test]
    async fn unchanged_project_hashes_identically() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path());
        let first = fingerprint_of(dir.path()).await;
        let second = fingerprint_of(dir.path()).await;
        assert_eq!(first.hash, second.hash);
        assert_eq!(first.components, second.components);
    }

    #[tokio::test]
    async fn identical_content_hashes_identically_across_directories() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        write_project(a.path());
        write_project(b.path());
        // different absolute paths, same tracked bytes
        assert_eq!(fingerprint_of(a.path()).await.hash, fingerprint_of(b.path()).await.hash);
    }

    #[tokio::test]
    async fn single_byte_change_changes_hash() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path());
        let before = fingerprint_of(dir.path()).await;
        std::fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"demo\"\n\n[dependencies]\nserde = \"2\"\n",
        )
        .unwrap();
        let after = fingerprint_of(dir.path()).await;
        assert_ne!(before.hash, after.hash);
        assert_ne!(before.components.manifests, after.components.manifests);
    }

    #[tokio::test]
    async fn history_digest_feeds_the_hash() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path());
        let gateway = AccessGateway::new();
        let detection = LanguageDetector::new(LanguageDetectorConfig::default())
            .detect(&gateway, dir.path())
            .await;
        let without = Fingerprinter::compute(&gateway, dir.path(), &detection, None).await;
        let with = Fingerprinter::compute(&gateway, dir.path(), &detection, Some("abc123")).await;
        let with_other =
            Fingerprinter::compute(&gateway, dir.path(), &detection, Some("def456")).await;
        assert_ne!(without.hash, with.hash);
        assert_ne!(with.hash, with_other.hash);
    }

    #[tokio::test]
    async fn quality_reflects_hashed_share() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path());
        let fingerprint = fingerprint_of(dir.path()).await;
        assert_eq!(fingerprint.files_tracked, 2);
        assert!((fingerprint.quality() - 1.0).abs() < 1e-9);

        let empty = tempfile::tempdir().unwrap();
        let none = fingerprint_of(empty.path()).await;
        assert_eq!(none.quality(), 0.0);
    }
}
