//! Fixed priority-ordered marker-filename table per language

use super::Language;

/// How a marker filename is matched against a root entry
#[derive(Debug, Clone, Copy)]
pub enum MarkerPattern {
    Exact(&'static str),
    Suffix(&'static str),
}

impl MarkerPattern {
    pub fn matches(&self, file_name: &str) -> bool {
        match self {
            MarkerPattern::Exact(name) => file_name == *name,
            MarkerPattern::Suffix(suffix) => file_name.ends_with(suffix),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MarkerPattern::Exact(name) => name,
            MarkerPattern::Suffix(suffix) => suffix,
        }
    }
}

/// One marker entry: filename pattern plus its evidence weight
#[derive(Debug, Clone, Copy)]
pub struct Marker {
    pub pattern: MarkerPattern,
    pub priority: u32,
}

const fn exact(name: &'static str, priority: u32) -> Marker {
    Marker { pattern: MarkerPattern::Exact(name), priority }
}

const fn suffix(name: &'static str, priority: u32) -> Marker {
    Marker { pattern: MarkerPattern::Suffix(name), priority }
}

/// The full marker table. Order within a language is priority order;
/// extension means adding entries here, nothing else.
pub const MARKER_TABLE: &[(Language, &[Marker])] = &[
    (
        Language::Rust,
        &[exact("Cargo.toml", 10), exact("Cargo.lock", 8), exact("rust-toolchain.toml", 5)],
    ),
    (
        Language::Python,
        &[
            exact("pyproject.toml", 10),
            exact("setup.py", 8),
            exact("requirements.txt", 7),
            exact("Pipfile", 6),
            exact("setup.cfg", 4),
            exact("tox.ini", 3),
        ],
    ),
    (
        Language::TypeScript,
        &[exact("tsconfig.json", 10), exact("deno.json", 6), suffix(".d.ts", 3)],
    ),
    (
        Language::JavaScript,
        &[
            exact("package.json", 10),
            exact("package-lock.json", 6),
            exact("yarn.lock", 6),
            exact("pnpm-lock.yaml", 6),
            exact(".nvmrc", 3),
        ],
    ),
    (Language::Go, &[exact("go.mod", 10), exact("go.sum", 8), exact("go.work", 5)]),
    (
        Language::Java,
        &[
            exact("pom.xml", 10),
            exact("build.gradle", 9),
            exact("build.gradle.kts", 9),
            exact("settings.gradle", 5),
        ],
    ),
    (
        Language::Ruby,
        &[exact("Gemfile", 10), exact("Gemfile.lock", 8), suffix(".gemspec", 6), exact("Rakefile", 4)],
    ),
    (
        Language::CSharp,
        &[suffix(".csproj", 10), suffix(".sln", 8), exact("global.json", 4), exact("nuget.config", 3)],
    ),
];

/// Manifest and lock filenames tracked by the fingerprinter. Exact names
/// only; these are the files whose bytes define the cache key.
pub const TRACKED_FILES: &[&str] = &[
    "Cargo.toml",
    "Cargo.lock",
    "rust-toolchain.toml",
    "pyproject.toml",
    "setup.py",
    "setup.cfg",
    "requirements.txt",
    "Pipfile",
    "Pipfile.lock",
    "poetry.lock",
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "tsconfig.json",
    "deno.json",
    "go.mod",
    "go.sum",
    "go.work",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "settings.gradle",
    "Gemfile",
    "Gemfile.lock",
];
