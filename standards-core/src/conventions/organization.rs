//! Code-organization detection: module layout plus test placement

use super::catalog::{OrganizationStyle, TestPlacement, LAYER_DIRECTORIES};
use super::{ConventionCategory, DetectionResult, EvidenceTally, SampleSet};
use crate::language::Language;
use crate::metadata::ProjectMetadata;
use std::path::Path;

pub fn detect(
    samples: &SampleSet,
    _metadata: &ProjectMetadata,
    access_multiplier: f64,
) -> DetectionResult {
    if samples.is_empty() {
        return DetectionResult::undetermined(ConventionCategory::Organization);
    }

    let mut layout = EvidenceTally::new();
    for file in &samples.files {
        if file.is_test {
            continue;
        }
        let style = layout_style(&file.relative);
        layout.record(
            style.canonical_name(),
            1,
            format!("{}", file.relative.display()),
        );
    }

    let mut result = super::build_result(
        ConventionCategory::Organization,
        layout,
        samples.len(),
        samples.coverage,
        access_multiplier,
    );

    // Test placement ranks alongside the layout styles, with shares
    // computed against test evidence only
    let mut placement = EvidenceTally::new();
    for file in &samples.files {
        if let Some(place) = test_placement(file) {
            placement.record(
                place.canonical_name(),
                1,
                format!("{}", file.relative.display()),
            );
        }
    }
    if !placement.is_empty() {
        result.ranked.extend(placement.ranked());
    }

    result
}

/// Classify one source file's position in the tree.
///
/// Depth is measured below the top-level source directory, so `src/a.rs`
/// is flat while `src/io/net/tcp.rs` is nested.
fn layout_style(relative: &Path) -> OrganizationStyle {
    let components: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
        .collect();
    // drop the filename
    let dirs = &components[..components.len().saturating_sub(1)];

    if dirs.len() <= 1 {
        return OrganizationStyle::Flat;
    }
    // first directory below the source root
    let below_root = &dirs[1];
    if LAYER_DIRECTORIES.contains(&below_root.as_str()) {
        return OrganizationStyle::LayerBased;
    }
    if dirs.len() >= 3 {
        return OrganizationStyle::Hierarchical;
    }
    OrganizationStyle::FeatureBased
}

fn test_placement(file: &super::SampledFile) -> Option<TestPlacement> {
    if file.is_test {
        let first = file
            .relative
            .components()
            .next()
            .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if matches!(first.as_str(), "test" | "tests" | "spec" | "specs" | "__tests__") {
            return Some(TestPlacement::SeparateDirectory);
        }
        return Some(TestPlacement::AdjacentFile);
    }
    // inline test modules count even though the file itself is source
    if file.language == Language::Rust && file.content.contains("#[cfg(test)]") {
        return Some(TestPlacement::SameFile);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conventions::sampler::SampledFile;
    use std::path::PathBuf;

    fn sample(name: &str, is_test: bool, content: &str) -> SampledFile {
        SampledFile {
            path: PathBuf::from(name),
            relative: PathBuf::from(name),
            language: Language::Rust,
            content: content.to_string(),
            is_test,
        }
    }

    fn set(files: Vec<SampledFile>) -> SampleSet {
        SampleSet { files, coverage: 1.0 }
    }

    fn metadata() -> ProjectMetadata {
        ProjectMetadata::default()
    }

    #[test]
    fn flat_src_directory_detected() {
        let files = vec![
            sample("src/a.rs", false, ""),
            sample("src/b.rs", false, ""),
            sample("src/c.rs", false, ""),
        ];
        let result = detect(&set(files), &metadata(), 1.0);
        assert_eq!(result.primary.unwrap().style, "flat");
    }

    #[test]
    fn layer_directories_detected() {
        let files = vec![
            sample("src/models/user.rs", false, ""),
            sample("src/controllers/user.rs", false, ""),
            sample("src/services/auth.rs", false, ""),
            sample("src/models/order.rs", false, ""),
        ];
        let result = detect(&set(files), &metadata(), 1.0);
        assert_eq!(result.primary.unwrap().style, "layer-based");
    }

    #[test]
    fn deep_nesting_is_hierarchical() {
        let files = vec![
            sample("src/io/net/tcp.rs", false, ""),
            sample("src/io/net/udp.rs", false, ""),
            sample("src/io/fs/file.rs", false, ""),
        ];
        let result = detect(&set(files), &metadata(), 1.0);
        assert_eq!(result.primary.unwrap().style, "hierarchical");
    }

    #[test]
    fn separate_test_directory_ranked() {
        let files = vec![
            sample("src/a.rs", false, ""),
            sample("tests/integration.rs", true, ""),
            sample("tests/api.rs", true, ""),
        ];
        let result = detect(&set(files), &metadata(), 1.0);
        assert!(
            result.ranked.iter().any(|r| r.style == "tests-in-separate-directory"),
            "ranked: {:?}",
            result.ranked.iter().map(|r| r.style.clone()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn inline_test_modules_rank_same_file() {
        let files = vec![sample("src/a.rs", false, "#[cfg(test)]\nmod tests {}\n")];
        let result = detect(&set(files), &metadata(), 1.0);
        assert!(result.ranked.iter().any(|r| r.style == "tests-in-same-file"));
    }

    #[test]
    fn only_tests_is_undetermined_for_layout() {
        let files = vec![sample("tests/a.rs", true, "")];
        let result = detect(&set(files), &metadata(), 1.0);
        assert!(result.primary.is_none());
    }
}
