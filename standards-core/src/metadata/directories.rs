//! Coarse directory-role inference from naming patterns

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectoryPurpose {
    Source,
    Tests,
    Documentation,
    Configuration,
    Build,
    Assets,
    Dependencies,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryInfo {
    pub path: PathBuf,
    pub purpose: DirectoryPurpose,
}

/// Classify the root-level directories by name. Purely lexical; contents
/// are not inspected here.
pub fn classify_roots(root: &Path) -> Vec<DirectoryInfo> {
    let mut directories: Vec<DirectoryInfo> = WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            DirectoryInfo {
                path: entry.path().to_path_buf(),
                purpose: purpose_from_name(&name),
            }
        })
        .collect();
    directories.sort_by(|a, b| a.path.cmp(&b.path));
    directories
}

pub fn purpose_from_name(name: &str) -> DirectoryPurpose {
    let lower = name.to_lowercase();
    match lower.as_str() {
        "src" | "source" | "lib" | "app" | "pkg" | "internal" | "cmd" => DirectoryPurpose::Source,
        "test" | "tests" | "spec" | "specs" | "__tests__" | "testing" => DirectoryPurpose::Tests,
        "doc" | "docs" | "documentation" => DirectoryPurpose::Documentation,
        "config" | "configs" | ".config" | "etc" => DirectoryPurpose::Configuration,
        "build" | "dist" | "target" | "out" | "bin" | "obj" => DirectoryPurpose::Build,
        "assets" | "static" | "public" | "resources" | "media" => DirectoryPurpose::Assets,
        "node_modules" | "vendor" | "third_party" | "packages" | ".venv" | "venv" => {
            DirectoryPurpose::Dependencies
        }
        _ => {
            if lower.contains("test") {
                DirectoryPurpose::Tests
            } else {
                DirectoryPurpose::Unknown
            }
        }
    }
}

/// Paths that never contribute convention evidence: generated output,
/// vendored code, fixtures.
pub fn is_excluded_from_sampling(path: &Path) -> bool {
    path.components().any(|component| {
        let name = component.as_os_str().to_string_lossy();
        name.starts_with('.') && name != "." && name != ".."
            || name == "node_modules"
            || name == "target"
            || name == "dist"
            || name == "build"
            || name == "out"
            || name == "__pycache__"
            || name == "vendor"
            || name == "third_party"
            || name == "fixtures"
            || name == "testdata"
            || name == "generated"
            || name == "venv"
    })
}
