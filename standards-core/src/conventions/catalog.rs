//! Fixed style catalogs
//!
//! Every catalog is a closed enum: {style id, matcher, canonical name}.
//! Extending a catalog means adding a variant, never reflection.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamingStyle {
    SnakeCase,
    CamelCase,
    PascalCase,
    UpperSnakeCase,
    KebabCase,
}

impl NamingStyle {
    pub fn canonical_name(&self) -> &'static str {
        match self {
            NamingStyle::SnakeCase => "snake_case",
            NamingStyle::CamelCase => "camelCase",
            NamingStyle::PascalCase => "PascalCase",
            NamingStyle::UpperSnakeCase => "UPPER_SNAKE_CASE",
            NamingStyle::KebabCase => "kebab-case",
        }
    }

    /// Classify a single identifier. Single lowercase words carry no style
    /// signal and classify as `None`.
    pub fn classify(token: &str) -> Option<NamingStyle> {
        if token.is_empty() {
            return None;
        }
        let has_upper = token.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = token.chars().any(|c| c.is_ascii_lowercase());

        if token.contains('-') {
            return Some(NamingStyle::KebabCase);
        }
        if token.contains('_') {
            if has_upper && !has_lower {
                return Some(NamingStyle::UpperSnakeCase);
            }
            if !has_upper {
                return Some(NamingStyle::SnakeCase);
            }
            return None; // Mixed_Snake carries no clean signal
        }
        if has_upper && !has_lower && token.len() > 1 {
            return Some(NamingStyle::UpperSnakeCase);
        }
        let first_upper = token.chars().next().map(|c| c.is_ascii_uppercase()).unwrap_or(false);
        if first_upper {
            return Some(NamingStyle::PascalCase);
        }
        if has_upper {
            return Some(NamingStyle::CamelCase);
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestFramework {
    Pytest,
    Unittest,
    Jest,
    Vitest,
    Mocha,
    CargoTest,
    GoTest,
    JUnit,
    RSpec,
}

impl TestFramework {
    pub fn canonical_name(&self) -> &'static str {
        match self {
            TestFramework::Pytest => "pytest",
            TestFramework::Unittest => "unittest",
            TestFramework::Jest => "jest",
            TestFramework::Vitest => "vitest",
            TestFramework::Mocha => "mocha",
            TestFramework::CargoTest => "cargo-test",
            TestFramework::GoTest => "go-test",
            TestFramework::JUnit => "junit",
            TestFramework::RSpec => "rspec",
        }
    }

    /// Root-level config files that pin a framework outright
    pub fn config_markers() -> &'static [(&'static str, TestFramework)] {
        &[
            ("pytest.ini", TestFramework::Pytest),
            ("conftest.py", TestFramework::Pytest),
            ("jest.config.js", TestFramework::Jest),
            ("jest.config.ts", TestFramework::Jest),
            ("jest.config.mjs", TestFramework::Jest),
            ("vitest.config.ts", TestFramework::Vitest),
            ("vitest.config.js", TestFramework::Vitest),
            (".mocharc.json", TestFramework::Mocha),
            (".mocharc.yml", TestFramework::Mocha),
            (".mocharc.js", TestFramework::Mocha),
            (".rspec", TestFramework::RSpec),
        ]
    }

    /// Framework implied by a declared dependency name
    pub fn from_dependency(name: &str) -> Option<TestFramework> {
        let lower = name.to_lowercase();
        if lower == "pytest" || lower.starts_with("pytest-") {
            Some(TestFramework::Pytest)
        } else if lower == "jest" || lower.starts_with("@jest/") || lower == "ts-jest" {
            Some(TestFramework::Jest)
        } else if lower == "vitest" {
            Some(TestFramework::Vitest)
        } else if lower == "mocha" {
            Some(TestFramework::Mocha)
        } else if lower.contains("junit") {
            Some(TestFramework::JUnit)
        } else if lower == "rspec" || lower.starts_with("rspec-") {
            Some(TestFramework::RSpec)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocStyle {
    RustDoc,
    JavaDoc,
    JsDoc,
    PythonDocstring,
    Doxygen,
    PlainComment,
}

impl DocStyle {
    pub fn canonical_name(&self) -> &'static str {
        match self {
            DocStyle::RustDoc => "rustdoc",
            DocStyle::JavaDoc => "javadoc",
            DocStyle::JsDoc => "jsdoc",
            DocStyle::PythonDocstring => "python-docstring",
            DocStyle::Doxygen => "doxygen",
            DocStyle::PlainComment => "plain-comments",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrganizationStyle {
    Flat,
    Hierarchical,
    FeatureBased,
    LayerBased,
}

impl OrganizationStyle {
    pub fn canonical_name(&self) -> &'static str {
        match self {
            OrganizationStyle::Flat => "flat",
            OrganizationStyle::Hierarchical => "hierarchical",
            OrganizationStyle::FeatureBased => "feature-based",
            OrganizationStyle::LayerBased => "layer-based",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestPlacement {
    SeparateDirectory,
    SameFile,
    AdjacentFile,
}

impl TestPlacement {
    pub fn canonical_name(&self) -> &'static str {
        match self {
            TestPlacement::SeparateDirectory => "tests-in-separate-directory",
            TestPlacement::SameFile => "tests-in-same-file",
            TestPlacement::AdjacentFile => "tests-in-adjacent-file",
        }
    }
}

/// Directory names that signal layer-based organization
pub const LAYER_DIRECTORIES: &[&str] = &[
    "controllers",
    "models",
    "views",
    "services",
    "handlers",
    "repositories",
    "repository",
    "middleware",
    "routes",
    "api",
    "db",
    "dao",
    "dto",
    "utils",
    "helpers",
    "core",
    "common",
    "domain",
    "infrastructure",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_classification() {
        assert_eq!(NamingStyle::classify("parse_config"), Some(NamingStyle::SnakeCase));
        assert_eq!(NamingStyle::classify("parseConfig"), Some(NamingStyle::CamelCase));
        assert_eq!(NamingStyle::classify("ParseConfig"), Some(NamingStyle::PascalCase));
        assert_eq!(NamingStyle::classify("MAX_RETRIES"), Some(NamingStyle::UpperSnakeCase));
        assert_eq!(NamingStyle::classify("my-package"), Some(NamingStyle::KebabCase));
        assert_eq!(NamingStyle::classify("parse"), None);
        assert_eq!(NamingStyle::classify(""), None);
    }

    #[test]
    fn dependency_names_map_to_frameworks() {
        assert_eq!(TestFramework::from_dependency("pytest"), Some(TestFramework::Pytest));
        assert_eq!(TestFramework::from_dependency("pytest-cov"), Some(TestFramework::Pytest));
        assert_eq!(TestFramework::from_dependency("ts-jest"), Some(TestFramework::Jest));
        assert_eq!(
            TestFramework::from_dependency("org.junit:junit5"),
            Some(TestFramework::JUnit)
        );
        assert_eq!(TestFramework::from_dependency("serde"), None);
    }
}
