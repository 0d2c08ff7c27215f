//! Language and toolchain detection from root-level marker files
//!
//! Root-only, no recursion: the presence of well-known manifest and lock
//! files is scored per language, the winner must clear a dominance
//! threshold relative to total evidence, and a version hint is pulled from
//! the relevant manifest section only.

pub mod markers;

use crate::access::AccessGateway;
use markers::{MARKER_TABLE, Marker};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Languages the marker table knows about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    Ruby,
    CSharp,
    Other(String),
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Rust => write!(f, "Rust"),
            Language::Python => write!(f, "Python"),
            Language::JavaScript => write!(f, "JavaScript"),
            Language::TypeScript => write!(f, "TypeScript"),
            Language::Go => write!(f, "Go"),
            Language::Java => write!(f, "Java"),
            Language::Ruby => write!(f, "Ruby"),
            Language::CSharp => write!(f, "C#"),
            Language::Other(name) => write!(f, "{}", name),
        }
    }
}

impl Language {
    /// Language implied by a source file extension, for sampling and
    /// convention apportioning.
    pub fn from_extension(ext: &str) -> Option<Language> {
        match ext {
            "rs" => Some(Language::Rust),
            "py" => Some(Language::Python),
            "js" | "mjs" | "jsx" => Some(Language::JavaScript),
            "ts" | "tsx" => Some(Language::TypeScript),
            "go" => Some(Language::Go),
            "java" => Some(Language::Java),
            "rb" => Some(Language::Ruby),
            "cs" => Some(Language::CSharp),
            _ => None,
        }
    }
}

/// Score for one candidate language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageScore {
    pub language: Language,
    pub score: u32,
    /// This language's share of total marker evidence
    pub share: f64,
    pub markers: Vec<String>,
}

/// Outcome of the root-level marker scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageDetection {
    pub primary: Option<LanguageScore>,
    pub secondary: Vec<LanguageScore>,
    pub version_hint: Option<String>,
    pub confidence: f64,
}

impl LanguageDetection {
    /// Explicit "nothing found" result. Never fabricated from thin air.
    pub fn undetermined() -> Self {
        Self { primary: None, secondary: Vec::new(), version_hint: None, confidence: 0.0 }
    }

    pub fn detected(&self) -> bool {
        self.primary.is_some()
    }

    /// Primary plus secondaries, primary first. Empty when undetermined.
    pub fn languages(&self) -> Vec<Language> {
        let mut out = Vec::new();
        if let Some(primary) = &self.primary {
            out.push(primary.language.clone());
        }
        for score in &self.secondary {
            out.push(score.language.clone());
        }
        out
    }
}

/// Detection thresholds; share of total evidence, not absolute scores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageDetectorConfig {
    pub dominance_threshold: f64,
    pub secondary_threshold: f64,
}

impl Default for LanguageDetectorConfig {
    fn default() -> Self {
        Self { dominance_threshold: 0.5, secondary_threshold: 0.15 }
    }
}

pub struct LanguageDetector {
    config: LanguageDetectorConfig,
}

impl LanguageDetector {
    pub fn new(config: LanguageDetectorConfig) -> Self {
        Self { config }
    }

    /// Scan the project root (depth 1, no recursion) and score each
    /// language by the summed priority of its markers present.
    pub async fn detect(&self, gateway: &AccessGateway, root: &Path) -> LanguageDetection {
        let scan = gateway.scan(root, "*", 1);
        let names: Vec<String> = scan
            .files
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(|s| s.to_string()))
            .collect();

        let mut scores: Vec<LanguageScore> = Vec::new();
        for (language, table) in MARKER_TABLE {
            let hits: Vec<&Marker> =
                table.iter().filter(|m| names.iter().any(|n| m.pattern.matches(n))).collect();
            if hits.is_empty() {
                continue;
            }
            let score = hits.iter().map(|m| m.priority).sum();
            scores.push(LanguageScore {
                language: language.clone(),
                score,
                share: 0.0,
                markers: hits.iter().map(|m| m.pattern.label().to_string()).collect(),
            });
        }

        if scores.is_empty() {
            debug!("no marker files at {:?}", root);
            return LanguageDetection::undetermined();
        }

        let total: u32 = scores.iter().map(|s| s.score).sum();
        for score in &mut scores {
            score.share = score.score as f64 / total as f64;
        }
        scores.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.language.to_string().cmp(&b.language.to_string())));

        let top = scores[0].clone();
        let (primary, secondary) = if top.share >= self.config.dominance_threshold {
            let rest = scores[1..]
                .iter()
                .filter(|s| s.share >= self.config.secondary_threshold)
                .cloned()
                .collect();
            (Some(top), rest)
        } else {
            // No dominant language: report everything above the lower bar
            let all: Vec<LanguageScore> = scores
                .iter()
                .filter(|s| s.share >= self.config.secondary_threshold)
                .cloned()
                .collect();
            match all.split_first() {
                Some((first, rest)) => (Some(first.clone()), rest.to_vec()),
                None => (None, Vec::new()),
            }
        };

        let confidence = match &primary {
            Some(score) => concentration_confidence(score.share, score.markers.len()),
            None => 0.0,
        };

        let version_hint = match &primary {
            Some(score) => version_hint(gateway, root, &score.language).await,
            None => None,
        };

        debug!(
            "language detection at {:?}: primary={:?} confidence={:.2}",
            root,
            primary.as_ref().map(|p| p.language.clone()),
            confidence
        );
        LanguageDetection { primary, secondary, version_hint, confidence }
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new(LanguageDetectorConfig::default())
    }
}

/// Confidence from evidence concentration and corroborating marker count.
/// A lone marker is trusted less than a manifest plus its lockfile.
fn concentration_confidence(share: f64, marker_count: usize) -> f64 {
    let corroboration = 0.7 + 0.3 * (marker_count.min(3) as f64 / 3.0);
    (share * corroboration).clamp(0.0, 1.0)
}

/// Version hint from the relevant manifest section only. Anything that
/// fails to parse yields None, never an error.
async fn version_hint(gateway: &AccessGateway, root: &Path, language: &Language) -> Option<String> {
    match language {
        Language::Rust => {
            let content = read_marker(gateway, root, "Cargo.toml").await?;
            let value: toml::Value = toml::from_str(&content).ok()?;
            let package = value.get("package")?;
            package
                .get("rust-version")
                .and_then(|v| v.as_str())
                .map(|v| format!("rust {}", v))
                .or_else(|| {
                    package.get("edition").and_then(|v| v.as_str()).map(|e| format!("edition {}", e))
                })
        }
        Language::JavaScript | Language::TypeScript => {
            let content = read_marker(gateway, root, "package.json").await?;
            let value: serde_json::Value = serde_json::from_str(&content).ok()?;
            value
                .get("engines")
                .and_then(|e| e.get("node"))
                .and_then(|v| v.as_str())
                .map(|v| format!("node {}", v))
        }
        Language::Python => {
            let content = read_marker(gateway, root, "pyproject.toml").await?;
            let value: toml::Value = toml::from_str(&content).ok()?;
            value
                .get("project")
                .and_then(|p| p.get("requires-python"))
                .and_then(|v| v.as_str())
                .map(|v| format!("python {}", v))
        }
        Language::Go => {
            let content = read_marker(gateway, root, "go.mod").await?;
            content
                .lines()
                .find_map(|line| line.trim().strip_prefix("go "))
                .map(|v| format!("go {}", v.trim()))
        }
        _ => None,
    }
}

async fn read_marker(gateway: &AccessGateway, root: &Path, name: &str) -> Option<String> {
    let path = root.join(name);
    if !path.exists() {
        return None;
    }
    gateway.read(&path).await.content().map(|c| c.to_string())
}
