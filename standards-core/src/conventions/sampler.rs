//! Bounded, deterministic source-file sampling shared by all four
//! convention detectors
//!
//! Biased toward genuine source directories, excludes generated and
//! vendored paths, and apportions the budget across languages when the
//! project is multi-language. Deterministic: candidates are ordered
//! lexicographically within each bias group before the cut.

use crate::access::AccessGateway;
use crate::language::{Language, LanguageDetection};
use crate::metadata::directories::{is_excluded_from_sampling, purpose_from_name};
use crate::metadata::DirectoryPurpose;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Total file budget across all languages
    pub max_files: usize,
    /// Files larger than this are skipped outright
    pub max_file_bytes: u64,
    pub max_depth: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { max_files: 50, max_file_bytes: 262_144, max_depth: 12 }
    }
}

#[derive(Debug, Clone)]
pub struct SampledFile {
    pub path: PathBuf,
    pub relative: PathBuf,
    pub language: Language,
    pub content: String,
    pub is_test: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    pub files: Vec<SampledFile>,
    /// Share of candidate files that made it into the sample
    pub coverage: f64,
}

impl SampleSet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

struct Candidate {
    path: PathBuf,
    relative: PathBuf,
    language: Language,
    bias: u8,
    is_test: bool,
}

/// Collect a bounded representative sample for the detected languages.
pub async fn collect(
    gateway: &AccessGateway,
    root: &Path,
    detection: &LanguageDetection,
    config: &SamplerConfig,
) -> SampleSet {
    let languages = detection.languages();
    if languages.is_empty() {
        return SampleSet::default();
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .max_depth(config.max_depth)
        .into_iter()
        .filter_entry(|e| !is_excluded_from_sampling(e.path()))
    {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(language) = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Language::from_extension)
        else {
            continue;
        };
        if !languages.contains(&language) {
            continue;
        }
        if entry.metadata().map(|m| m.len() > config.max_file_bytes).unwrap_or(false) {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        candidates.push(Candidate {
            bias: bias_group(&relative),
            is_test: looks_like_test(&relative),
            path: path.to_path_buf(),
            relative,
            language,
        });
    }

    let total_candidates = candidates.len();
    if total_candidates == 0 {
        return SampleSet::default();
    }

    // Source dirs first, then tests, then the rest; lexicographic inside
    // each group keeps the cut deterministic across runs
    candidates.sort_by(|a, b| a.bias.cmp(&b.bias).then_with(|| a.relative.cmp(&b.relative)));

    let quotas = language_quotas(&languages, detection, config.max_files);
    let mut taken: HashMap<Language, usize> = HashMap::new();
    let mut files = Vec::new();

    for candidate in candidates {
        let quota = quotas.get(&candidate.language).copied().unwrap_or(0);
        let used = taken.entry(candidate.language.clone()).or_insert(0);
        if *used >= quota {
            continue;
        }
        let Some(content) = gateway.read(&candidate.path).await.content().map(|c| c.to_string())
        else {
            continue;
        };
        *used += 1;
        files.push(SampledFile {
            path: candidate.path,
            relative: candidate.relative,
            language: candidate.language,
            content,
            is_test: candidate.is_test,
        });
    }

    let coverage = (files.len() as f64 / total_candidates as f64).min(1.0);
    debug!("sampled {}/{} candidate files", files.len(), total_candidates);
    SampleSet { files, coverage }
}

fn bias_group(relative: &Path) -> u8 {
    let first = relative
        .components()
        .next()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .unwrap_or_default();
    match purpose_from_name(&first) {
        DirectoryPurpose::Source => 0,
        DirectoryPurpose::Tests => 1,
        _ => 2,
    }
}

fn looks_like_test(relative: &Path) -> bool {
    let in_test_dir = relative.components().any(|c| {
        matches!(
            purpose_from_name(&c.as_os_str().to_string_lossy()),
            DirectoryPurpose::Tests
        )
    });
    let name = relative.file_name().and_then(|n| n.to_str()).unwrap_or("");
    in_test_dir
        || name.starts_with("test_")
        || name.ends_with("_test.py")
        || name.ends_with("_test.go")
        || name.ends_with("_test.rs")
        || name.contains(".test.")
        || name.contains(".spec.")
        || name.ends_with("Test.java")
}

/// Split the file budget across languages by their evidence share, with a
/// floor of one file each.
fn language_quotas(
    languages: &[Language],
    detection: &LanguageDetection,
    max_files: usize,
) -> HashMap<Language, usize> {
    let mut shares: HashMap<Language, f64> = HashMap::new();
    if let Some(primary) = &detection.primary {
        shares.insert(primary.language.clone(), primary.share);
    }
    for secondary in &detection.secondary {
        shares.insert(secondary.language.clone(), secondary.share);
    }
    let total_share: f64 = shares.values().sum();

    languages
        .iter()
        .map(|language| {
            let share = if total_share > 0.0 {
                shares.get(language).copied().unwrap_or(0.0) / total_share
            } else {
                1.0 / languages.len() as f64
            };
            let quota = ((max_files as f64) * share).round() as usize;
            (language.clone(), quota.max(1))
        })
        .collect()
}
