//! Lock-file presence and manifest sync status

use super::Dependency;
use crate::access::AccessGateway;
use crate::language::Language;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Whether the lockfile covers the manifest's direct dependencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LockSync {
    InSync,
    OutOfSync,
    #[default]
    NoLockfile,
    /// Lockfile present but unparseable
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockfileStatus {
    pub path: Option<PathBuf>,
    pub sync: LockSync,
    /// Manifest dependencies missing from the lockfile
    pub missing: Vec<String>,
}

/// Candidate lockfile names per language, in preference order
fn lockfile_names(language: &Language) -> &'static [&'static str] {
    match language {
        Language::Rust => &["Cargo.lock"],
        Language::JavaScript | Language::TypeScript => {
            &["package-lock.json", "yarn.lock", "pnpm-lock.yaml"]
        }
        Language::Python => &["poetry.lock", "Pipfile.lock"],
        Language::Go => &["go.sum"],
        Language::Ruby => &["Gemfile.lock"],
        _ => &[],
    }
}

/// Find the lockfile for `language` at the root and compare its package
/// set against the manifest's direct dependencies.
pub async fn check(
    gateway: &AccessGateway,
    root: &Path,
    language: &Language,
    dependencies: &[Dependency],
) -> LockfileStatus {
    for name in lockfile_names(language) {
        let path = root.join(name);
        if !path.exists() {
            continue;
        }
        let Some(content) = gateway.read(&path).await.content().map(|c| c.to_string()) else {
            continue;
        };
        let Some(locked) = locked_names(name, &content) else {
            warn!("lockfile {:?} unparseable, sync unknown", path);
            return LockfileStatus { path: Some(path), sync: LockSync::Unknown, missing: Vec::new() };
        };

        let missing: Vec<String> = dependencies
            .iter()
            .filter(|dep| !locked.contains(dep.name.as_str()))
            .map(|dep| dep.name.clone())
            .collect();
        let sync = if missing.is_empty() { LockSync::InSync } else { LockSync::OutOfSync };
        return LockfileStatus { path: Some(path), sync, missing };
    }
    LockfileStatus::default()
}

static YARN_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^"?(@?[A-Za-z0-9_.\-/]+)@"#).unwrap());

/// Package names pinned by one lockfile, by format. `None` means the file
/// could not be parsed at all.
fn locked_names(file_name: &str, content: &str) -> Option<HashSet<String>> {
    match file_name {
        "Cargo.lock" | "poetry.lock" => {
            let value: toml::Value = toml::from_str(content).ok()?;
            let packages = value.get("package")?.as_array()?;
            Some(
                packages
                    .iter()
                    .filter_map(|p| p.get("name").and_then(|n| n.as_str()))
                    .map(|n| n.to_string())
                    .collect(),
            )
        }
        "package-lock.json" | "Pipfile.lock" => {
            let value: serde_json::Value = serde_json::from_str(content).ok()?;
            let mut names = HashSet::new();
            // npm v2/v3 layout: "packages" keyed by "node_modules/<name>"
            if let Some(packages) = value.get("packages").and_then(|p| p.as_object()) {
                for key in packages.keys() {
                    if let Some(name) = key.strip_prefix("node_modules/") {
                        names.insert(name.to_string());
                    }
                }
            }
            if let Some(deps) = value.get("dependencies").and_then(|d| d.as_object()) {
                names.extend(deps.keys().cloned());
            }
            // Pipfile.lock groups under "default"/"develop"
            for group in ["default", "develop"] {
                if let Some(deps) = value.get(group).and_then(|d| d.as_object()) {
                    names.extend(deps.keys().cloned());
                }
            }
            Some(names)
        }
        "pnpm-lock.yaml" => {
            let value: serde_yaml::Value = serde_yaml::from_str(content).ok()?;
            let mut names = HashSet::new();
            for key in ["dependencies", "devDependencies"] {
                if let Some(deps) = value.get(key).and_then(|d| d.as_mapping()) {
                    for dep_name in deps.keys() {
                        if let Some(name) = dep_name.as_str() {
                            names.insert(name.to_string());
                        }
                    }
                }
            }
            Some(names)
        }
        "yarn.lock" => Some(
            YARN_ENTRY
                .captures_iter(content)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .collect(),
        ),
        "go.sum" => Some(
            content
                .lines()
                .filter_map(|line| line.split_whitespace().next())
                .map(|m| m.to_string())
                .collect(),
        ),
        "Gemfile.lock" => Some(
            content
                .lines()
                .filter_map(|line| {
                    let trimmed = line.strip_prefix("    ")?;
                    // top-level gems are indented exactly four spaces
                    if trimmed.starts_with(' ') {
                        return None;
                    }
                    Some(trimmed.split_whitespace().next()?.to_string())
                })
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(name: &str) -> Dependency {
        Dependency { name: name.to_string(), constraint: None }
    }

    #[tokio::test]
    async fn missing_lockfile_reports_no_lockfile() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = AccessGateway::new();
        let status = check(&gateway, dir.path(), &Language::Rust, &[dep("serde")]).await;
        assert_eq!(status.sync, LockSync::NoLockfile);
        assert!(status.path.is_none());
    }

    #[tokio::test]
    async fn cargo_lock_covering_manifest_is_in_sync() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Cargo.lock"),
            "version = 4\n\n[[package]]\nname = \"serde\"\nversion = \"1.0.0\"\n",
        )
        .unwrap();
        let gateway = AccessGateway::new();
        let status = check(&gateway, dir.path(), &Language::Rust, &[dep("serde")]).await;
        assert_eq!(status.sync, LockSync::InSync);
        assert!(status.missing.is_empty());
    }

    #[tokio::test]
    async fn dependency_absent_from_lock_is_out_of_sync() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Cargo.lock"),
            "version = 4\n\n[[package]]\nname = \"serde\"\nversion = \"1.0.0\"\n",
        )
        .unwrap();
        let gateway = AccessGateway::new();
        let status =
            check(&gateway, dir.path(), &Language::Rust, &[dep("serde"), dep("anyhow")]).await;
        assert_eq!(status.sync, LockSync::OutOfSync);
        assert_eq!(status.missing, vec!["anyhow".to_string()]);
    }

    #[tokio::test]
    async fn unparseable_lockfile_is_unknown_not_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.lock"), "[[package\nbroken").unwrap();
        let gateway = AccessGateway::new();
        let status = check(&gateway, dir.path(), &Language::Rust, &[dep("serde")]).await;
        assert_eq!(status.sync, LockSync::Unknown);
    }

    #[test]
    fn yarn_lock_names_parse() {
        let names = locked_names("yarn.lock", "react@^18.0.0:\n  version \"18.2.0\"\n\n\"@types/node@^20\":\n  version \"20.1.0\"\n").unwrap();
        assert!(names.contains("react"));
        assert!(names.contains("@types/node"));
    }

    #[test]
    fn package_lock_v3_names_parse() {
        let names = locked_names(
            "package-lock.json",
            r#"{"packages":{"":{},"node_modules/react":{"version":"18.2.0"}}}"#,
        )
        .unwrap();
        assert!(names.contains("react"));
    }
}
