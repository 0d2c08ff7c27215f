//! Development-history signals from version-control metadata
//!
//! Optional and non-critical: a missing repository, denied access, or any
//! parse failure yields `None` and the pipeline carries on. Only a bounded
//! recent window is walked, never the full history.

use chrono::{DateTime, TimeZone, Utc};
use git2::Repository;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const SECONDS_PER_WEEK: f64 = 604_800.0;
/// Activity within this many days counts as "actively maintained"
const MAINTAINED_WINDOW_DAYS: i64 = 90;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contributor {
    pub name: String,
    pub commits: usize,
}

/// Summary of the recent commit window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryAnalysis {
    pub commit_count: usize,
    pub contributors: Vec<Contributor>,
    pub first_activity: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub commits_per_week: f64,
    pub actively_maintained: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryAnalyzerConfig {
    /// Most recent commits considered; the walk stops here
    pub window: usize,
    pub top_contributors: usize,
}

impl Default for HistoryAnalyzerConfig {
    fn default() -> Self {
        Self { window: 200, top_contributors: 5 }
    }
}

pub struct HistoryAnalyzer {
    config: HistoryAnalyzerConfig,
}

impl HistoryAnalyzer {
    pub fn new(config: HistoryAnalyzerConfig) -> Self {
        Self { config }
    }

    /// Analyze the bounded recent window. `None` means skipped, for any
    /// reason; the caller never retries.
    pub fn analyze(&self, root: &Path) -> Option<HistoryAnalysis> {
        self.analyze_at(root, Utc::now())
    }

    fn analyze_at(&self, root: &Path, now: DateTime<Utc>) -> Option<HistoryAnalysis> {
        let repo = match Repository::open(root) {
            Ok(repo) => repo,
            Err(err) => {
                debug!("no usable repository at {:?}: {}", root, err.message());
                return None;
            }
        };

        let mut revwalk = repo.revwalk().ok()?;
        revwalk.push_head().ok()?;

        let mut commit_count = 0usize;
        let mut authors: HashMap<String, usize> = HashMap::new();
        let mut first: Option<i64> = None;
        let mut last: Option<i64> = None;

        for oid in revwalk.take(self.config.window) {
            let Ok(oid) = oid else { continue };
            let Ok(commit) = repo.find_commit(oid) else { continue };

            commit_count += 1;
            let author = commit.author().name().unwrap_or("unknown").to_string();
            *authors.entry(author).or_insert(0) += 1;

            let seconds = commit.time().seconds();
            first = Some(first.map_or(seconds, |f| f.min(seconds)));
            last = Some(last.map_or(seconds, |l| l.max(seconds)));
        }

        if commit_count == 0 {
            return None;
        }

        let mut contributors: Vec<Contributor> =
            authors.into_iter().map(|(name, commits)| Contributor { name, commits }).collect();
        contributors.sort_by(|a, b| b.commits.cmp(&a.commits).then_with(|| a.name.cmp(&b.name)));
        contributors.truncate(self.config.top_contributors);

        let span_seconds = match (first, last) {
            (Some(first), Some(last)) if last > first => (last - first) as f64,
            _ => 0.0,
        };
        let commits_per_week = if span_seconds > 0.0 {
            commit_count as f64 / (span_seconds / SECONDS_PER_WEEK)
        } else {
            commit_count as f64
        };

        let actively_maintained = last
            .map(|last| now.timestamp() - last < MAINTAINED_WINDOW_DAYS * 86_400)
            .unwrap_or(false);

        Some(HistoryAnalysis {
            commit_count,
            contributors,
            first_activity: first.and_then(|s| Utc.timestamp_opt(s, 0).single()),
            last_activity: last.and_then(|s| Utc.timestamp_opt(s, 0).single()),
            commits_per_week,
            actively_maintained,
        })
    }

    /// Cheap digest of the repository head for fingerprinting; avoids a
    /// full window walk on the cache-validation path.
    pub fn head_digest(root: &Path) -> Option<String> {
        let repo = Repository::open(root).ok()?;
        let head = repo.head().ok()?;
        head.target().map(|oid| oid.to_string())
    }
}

impl Default for HistoryAnalyzer {
    fn default() -> Self {
        Self::new(HistoryAnalyzerConfig::default())
    }
}
