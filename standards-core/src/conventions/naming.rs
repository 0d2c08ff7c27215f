//! Naming-style detection over role-segmented identifiers

use super::catalog::NamingStyle;
use super::{ConventionCategory, DetectionResult, EvidenceTally, SampleSet};
use crate::language::Language;
use once_cell::sync::Lazy;
use regex::Regex;

/// Identifier roles extracted separately so evidence stays attributable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenRole {
    Function,
    Type,
    Constant,
    Private,
}

impl TokenRole {
    fn label(&self) -> &'static str {
        match self {
            TokenRole::Function => "fn",
            TokenRole::Type => "type",
            TokenRole::Constant => "const",
            TokenRole::Private => "private",
        }
    }
}

macro_rules! pattern {
    ($name:ident, $pattern:expr) => {
        static $name: Lazy<Regex> = Lazy::new(|| Regex::new($pattern).unwrap());
    };
}

pattern!(RUST_FN, r"fn\s+([A-Za-z_]\w*)");
pattern!(RUST_TYPE, r"(?:struct|enum|trait)\s+([A-Za-z_]\w*)");
pattern!(RUST_CONST, r"(?:const|static)\s+([A-Za-z_]\w*)");
pattern!(PY_FN, r"def\s+([A-Za-z_]\w*)");
pattern!(PY_TYPE, r"class\s+([A-Za-z_]\w*)");
pattern!(PY_CONST, r"(?m)^([A-Z][A-Z0-9_]+)\s*=");
pattern!(PY_PRIVATE, r"def\s+(_\w+)");
pattern!(JS_FN, r"function\s+([A-Za-z_$]\w*)");
pattern!(JS_ARROW, r"(?:const|let|var)\s+([A-Za-z_$]\w*)\s*=\s*(?:async\s*)?(?:\([^)]*\)|\w+)\s*=>");
pattern!(JS_TYPE, r"(?:class|interface|enum)\s+([A-Za-z_$]\w*)");
pattern!(JS_CONST, r"const\s+([A-Z][A-Z0-9_]+)\s*=");
pattern!(JS_PRIVATE, r"#([A-Za-z_]\w*)");
pattern!(GO_FN, r"func\s+(?:\([^)]+\)\s+)?([A-Za-z_]\w*)");
pattern!(GO_TYPE, r"type\s+([A-Za-z_]\w*)");
pattern!(GO_CONST, r"const\s+([A-Za-z_]\w*)");
pattern!(JAVA_FN, r"(?:public|private|protected)\s+(?:static\s+)?[\w<>\[\]]+\s+([a-z]\w*)\s*\(");
pattern!(JAVA_TYPE, r"(?:class|interface|enum)\s+([A-Za-z_]\w*)");
pattern!(JAVA_CONST, r"static\s+final\s+[\w<>\[\]]+\s+([A-Z][A-Z0-9_]*)");
pattern!(RUBY_FN, r"def\s+([a-z_]\w*[?!]?)");
pattern!(RUBY_TYPE, r"(?:class|module)\s+([A-Z]\w*)");

fn extractors(language: &Language) -> Vec<(TokenRole, &'static Regex)> {
    match language {
        Language::Rust => vec![
            (TokenRole::Function, &*RUST_FN),
            (TokenRole::Type, &*RUST_TYPE),
            (TokenRole::Constant, &*RUST_CONST),
        ],
        Language::Python => vec![
            (TokenRole::Function, &*PY_FN),
            (TokenRole::Type, &*PY_TYPE),
            (TokenRole::Constant, &*PY_CONST),
            (TokenRole::Private, &*PY_PRIVATE),
        ],
        Language::JavaScript | Language::TypeScript => vec![
            (TokenRole::Function, &*JS_FN),
            (TokenRole::Function, &*JS_ARROW),
            (TokenRole::Type, &*JS_TYPE),
            (TokenRole::Constant, &*JS_CONST),
            (TokenRole::Private, &*JS_PRIVATE),
        ],
        Language::Go => vec![
            (TokenRole::Function, &*GO_FN),
            (TokenRole::Type, &*GO_TYPE),
            (TokenRole::Constant, &*GO_CONST),
        ],
        Language::Java => vec![
            (TokenRole::Function, &*JAVA_FN),
            (TokenRole::Type, &*JAVA_TYPE),
            (TokenRole::Constant, &*JAVA_CONST),
        ],
        Language::Ruby => {
            vec![(TokenRole::Function, &*RUBY_FN), (TokenRole::Type, &*RUBY_TYPE)]
        }
        _ => Vec::new(),
    }
}

/// Types are expected to be PascalCase and constants UPPER_SNAKE_CASE in
/// most catalogs; the project-wide convention signal lives in function
/// and private names. Types and constants still count, at lower weight.
fn role_weight(role: TokenRole) -> usize {
    match role {
        TokenRole::Function | TokenRole::Private => 2,
        TokenRole::Type | TokenRole::Constant => 1,
    }
}

pub fn detect(samples: &SampleSet, access_multiplier: f64) -> DetectionResult {
    if samples.is_empty() {
        return DetectionResult::undetermined(ConventionCategory::Naming);
    }

    let mut tally = EvidenceTally::new();
    for file in &samples.files {
        for (role, regex) in extractors(&file.language) {
            for captures in regex.captures_iter(&file.content) {
                let Some(token) = captures.get(1).map(|m| m.as_str()) else { continue };
                let Some(style) = NamingStyle::classify(token.trim_start_matches('_')) else {
                    continue;
                };
                tally.record(
                    style.canonical_name(),
                    role_weight(role),
                    format!("{} `{}` in {}", role.label(), token, file.relative.display()),
                );
            }
        }
    }

    super::build_result(
        ConventionCategory::Naming,
        tally,
        samples.len(),
        samples.coverage,
        access_multiplier,
    )
}
