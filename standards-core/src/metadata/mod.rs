//! Manifest and lock-file metadata for the detected language(s)
//!
//! Parsing is tolerant throughout: a malformed or partial file is skipped
//! with a warning and extraction continues. The whole extraction never
//! aborts.

pub mod directories;
pub mod lockfile;
pub mod manifest;

use crate::access::AccessGateway;
use crate::language::LanguageDetection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

pub use directories::{DirectoryInfo, DirectoryPurpose};
pub use lockfile::{LockSync, LockfileStatus};
pub use manifest::ManifestData;

/// A declared dependency with its version constraint, when one is given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub constraint: Option<String>,
}

/// Everything the extractor learned about the project's metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub name: Option<String>,
    pub version: Option<String>,
    pub dependencies: Vec<Dependency>,
    pub dev_dependencies: Vec<Dependency>,
    pub lockfile: LockfileStatus,
    pub directories: Vec<DirectoryInfo>,
    pub confidence: f64,
}

pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Extract metadata for every detected language, primary first.
    /// The primary manifest supplies name and version; dependency lists
    /// merge across languages.
    pub async fn extract(
        gateway: &AccessGateway,
        root: &Path,
        detection: &LanguageDetection,
    ) -> ProjectMetadata {
        let mut metadata = ProjectMetadata::default();

        for language in detection.languages() {
            let Some(parsed) = manifest::parse_for_language(gateway, root, &language).await else {
                warn!("manifest for {} unreadable or malformed, skipping", language);
                continue;
            };
            if metadata.name.is_none() {
                metadata.name = parsed.name;
                metadata.version = parsed.version;
            }
            metadata.dependencies.extend(parsed.dependencies);
            metadata.dev_dependencies.extend(parsed.dev_dependencies);
        }

        if let Some(primary) = &detection.primary {
            metadata.lockfile =
                lockfile::check(gateway, root, &primary.language, &metadata.dependencies).await;
        }

        metadata.directories = directories::classify_roots(root);
        metadata.confidence = score_confidence(&metadata);
        debug!(
            "metadata for {:?}: name={:?} deps={} lock={:?} confidence={:.2}",
            root,
            metadata.name,
            metadata.dependencies.len(),
            metadata.lockfile.sync,
            metadata.confidence
        );
        metadata
    }
}

/// Confidence reflects how much of the expected metadata was recovered,
/// not how "good" the project looks.
fn score_confidence(metadata: &ProjectMetadata) -> f64 {
    let mut score: f64 = 0.0;
    if metadata.name.is_some() {
        score += 0.3;
    }
    if !metadata.dependencies.is_empty() || !metadata.dev_dependencies.is_empty() {
        score += 0.3;
    }
    score += match metadata.lockfile.sync {
        LockSync::InSync => 0.2,
        LockSync::OutOfSync | LockSync::Unknown => 0.1,
        LockSync::NoLockfile => 0.0,
    };
    if metadata.directories.iter().any(|d| d.purpose != DirectoryPurpose::Unknown) {
        score += 0.2;
    }
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{LanguageDetector, LanguageDetectorConfig};

    async fn extract_from(dir: &Path) -> ProjectMetadata {
        let gateway = AccessGateway::new();
        let detection = LanguageDetector::new(LanguageDetectorConfig::default())
            .detect(&gateway, dir)
            .await;
        MetadataExtractor::extract(&gateway, dir, &detection).await
    }

    #[tokio::test]
    async fn cargo_project_yields_name_and_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Cargo.toml"),
            r#"
[package]
name = "widget"
version = "0.3.1"

[dependencies]
serde = { version = "1.0", features = ["derive"] }
anyhow = "1.0"

[dev-dependencies]
tempfile = "3"
"#,
        )
        .unwrap();

        let metadata = extract_from(dir.path()).await;
        assert_eq!(metadata.name.as_deref(), Some("widget"));
        assert_eq!(metadata.version.as_deref(), Some("0.3.1"));
        assert_eq!(metadata.dependencies.len(), 2);
        assert_eq!(metadata.dev_dependencies.len(), 1);
        assert!(metadata.dependencies.iter().any(|d| d.name == "serde"
            && d.constraint.as_deref() == Some("1.0")));
    }

    #[tokio::test]
    async fn malformed_manifest_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package\nthis is not toml").unwrap();

        let metadata = extract_from(dir.path()).await;
        assert!(metadata.name.is_none());
        assert!(metadata.dependencies.is_empty());
    }

    #[tokio::test]
    async fn directory_roles_are_inferred_from_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"x\"\n").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join("tests")).unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();

        let metadata = extract_from(dir.path()).await;
        let purpose_of = |name: &str| {
            metadata
                .directories
                .iter()
                .find(|d| d.path.file_name().and_then(|n| n.to_str()) == Some(name))
                .map(|d| d.purpose)
        };
        assert_eq!(purpose_of("src"), Some(DirectoryPurpose::Source));
        assert_eq!(purpose_of("tests"), Some(DirectoryPurpose::Tests));
        assert_eq!(purpose_of("docs"), Some(DirectoryPurpose::Documentation));
    }

    #[tokio::test]
    async fn confidence_grows_with_recovered_fields() {
        let empty = tempfile::tempdir().unwrap();
        let sparse = extract_from(empty.path()).await;

        let full = tempfile::tempdir().unwrap();
        std::fs::write(
            full.path().join("Cargo.toml"),
            "[package]\nname = \"x\"\n\n[dependencies]\nserde = \"1\"\n",
        )
        .unwrap();
        std::fs::create_dir_all(full.path().join("src")).unwrap();
        let rich = extract_from(full.path()).await;

        assert!(rich.confidence > sparse.confidence);
    }
}
