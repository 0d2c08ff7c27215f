//! Test-framework detection from config markers, declared dependencies
//! and in-file patterns

use super::catalog::TestFramework;
use super::{ConventionCategory, DetectionResult, EvidenceTally, SampleSet};
use crate::access::AccessGateway;
use crate::language::Language;
use crate::metadata::ProjectMetadata;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

// A root config file pins the framework much harder than one test file;
// a declared dependency sits in between.
const CONFIG_WEIGHT: usize = 25;
const DEPENDENCY_WEIGHT: usize = 10;
const PATTERN_WEIGHT: usize = 1;

static PY_UNITTEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:import unittest|from unittest)").unwrap());
static PY_PYTEST_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:import pytest|from pytest)").unwrap());
static PY_TEST_FN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^def test_\w+").unwrap());
static JS_SUITE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:describe|it|test)\s*\(").unwrap());
static GO_TEST_FN: Lazy<Regex> = Lazy::new(|| Regex::new(r"func Test\w+\(t \*testing\.T\)").unwrap());
static RUST_TEST_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\[(?:tokio::)?test\]").unwrap());
static JAVA_TEST_ANNOTATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"@Test\b").unwrap());
static RSPEC_DESCRIBE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:RSpec\.)?describe\s+.+\s+do").unwrap());

pub async fn detect(
    gateway: &AccessGateway,
    root: &Path,
    samples: &SampleSet,
    metadata: &ProjectMetadata,
    access_multiplier: f64,
) -> DetectionResult {
    let mut tally = EvidenceTally::new();

    // (1) root-level config markers
    let root_names: Vec<String> = gateway
        .scan(root, "*", 1)
        .files
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(|s| s.to_string()))
        .collect();
    for (marker, framework) in TestFramework::config_markers() {
        if root_names.iter().any(|n| n == marker) {
            tally.record(framework.canonical_name(), CONFIG_WEIGHT, format!("config file {}", marker));
        }
    }
    for (file, section) in [("pyproject.toml", "[tool.pytest"), ("setup.cfg", "[tool:pytest]")] {
        let path = root.join(file);
        if !path.exists() {
            continue;
        }
        if let Some(content) = gateway.read(&path).await.content() {
            if content.contains(section) {
                tally.record(
                    TestFramework::Pytest.canonical_name(),
                    CONFIG_WEIGHT,
                    format!("{} {} section", file, section),
                );
            }
        }
    }

    // (2) declared dependencies
    for dependency in metadata.dependencies.iter().chain(&metadata.dev_dependencies) {
        if let Some(framework) = TestFramework::from_dependency(&dependency.name) {
            tally.record(
                framework.canonical_name(),
                DEPENDENCY_WEIGHT,
                format!("dependency {}", dependency.name),
            );
        }
    }

    // (3) in-file patterns across the sample; config/dependency evidence
    // above decides where ambiguous suite blocks land
    let js_preference = preferred_js_framework(&tally);
    for file in &samples.files {
        scan_file_patterns(&mut tally, file, &js_preference);
    }

    super::build_result(
        ConventionCategory::TestFramework,
        tally,
        samples.len(),
        samples.coverage,
        access_multiplier,
    )
}

/// describe()/it() blocks are shared across jest, vitest and mocha;
/// attribute them to whichever already has config or dependency evidence.
fn preferred_js_framework(tally: &EvidenceTally) -> Option<TestFramework> {
    [TestFramework::Jest, TestFramework::Vitest, TestFramework::Mocha]
        .into_iter()
        .map(|f| (f, tally.count_for(f.canonical_name())))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(framework, _)| framework)
}

fn scan_file_patterns(
    tally: &mut EvidenceTally,
    file: &super::SampledFile,
    js_preference: &Option<TestFramework>,
) {
    let where_found = file.relative.display().to_string();
    match file.language {
        Language::Rust => {
            let hits = RUST_TEST_ATTR.find_iter(&file.content).count();
            if hits > 0 {
                tally.record(
                    TestFramework::CargoTest.canonical_name(),
                    hits * PATTERN_WEIGHT,
                    format!("{} #[test] functions in {}", hits, where_found),
                );
            }
        }
        Language::Python => {
            if PY_UNITTEST.is_match(&file.content) {
                tally.record(
                    TestFramework::Unittest.canonical_name(),
                    PATTERN_WEIGHT * 2,
                    format!("unittest import in {}", where_found),
                );
            } else {
                let imported = PY_PYTEST_IMPORT.is_match(&file.content);
                let test_fns = PY_TEST_FN.find_iter(&file.content).count();
                if imported {
                    tally.record(
                        TestFramework::Pytest.canonical_name(),
                        PATTERN_WEIGHT * 2,
                        format!("pytest import in {}", where_found),
                    );
                }
                // bare test_ functions are pytest-style discovery
                if test_fns > 0 && file.is_test {
                    tally.record(
                        TestFramework::Pytest.canonical_name(),
                        test_fns * PATTERN_WEIGHT,
                        format!("{} test_ functions in {}", test_fns, where_found),
                    );
                }
            }
        }
        Language::JavaScript | Language::TypeScript => {
            let hits = JS_SUITE.find_iter(&file.content).count();
            if hits > 0 {
                if let Some(framework) = js_preference {
                    tally.record(
                        framework.canonical_name(),
                        hits * PATTERN_WEIGHT,
                        format!("{} suite blocks in {}", hits, where_found),
                    );
                }
            }
        }
        Language::Go => {
            let hits = GO_TEST_FN.find_iter(&file.content).count();
            if hits > 0 {
                tally.record(
                    TestFramework::GoTest.canonical_name(),
                    hits * PATTERN_WEIGHT,
                    format!("{} TestXxx functions in {}", hits, where_found),
                );
            }
        }
        Language::Java => {
            let hits = JAVA_TEST_ANNOTATION.find_iter(&file.content).count();
            if hits > 0 {
                tally.record(
                    TestFramework::JUnit.canonical_name(),
                    hits * PATTERN_WEIGHT,
                    format!("{} @Test annotations in {}", hits, where_found),
                );
            }
        }
        Language::Ruby => {
            if file.is_test && RSPEC_DESCRIBE.is_match(&file.content) {
                tally.record(
                    TestFramework::RSpec.canonical_name(),
                    PATTERN_WEIGHT * 2,
                    format!("describe block in {}", where_found),
                );
            }
        }
        _ => {}
    }
}
