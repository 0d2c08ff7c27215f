//! Documentation-style detection plus public-item doc coverage

use super::catalog::DocStyle;
use super::{ConventionCategory, DetectionResult, EvidenceTally, SampleSet};
use crate::language::Language;
use once_cell::sync::Lazy;
use regex::Regex;

static RUST_DOC_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*//[/!]").unwrap());
static PY_DOCSTRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:def|class)\s+\w+[^\n]*:\s*\n\s*(?:"""|''')"#).unwrap()
});
static BLOCK_DOC_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\*\*[^*]").unwrap());
static DOXYGEN_MARK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\*!|[@\\]brief\b").unwrap());
static PLAIN_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*(?://[^/!]|#[^!])").unwrap());

static RUST_PUB_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*pub\s+(?:async\s+)?(?:fn|struct|enum|trait)\s+\w+").unwrap());
static PY_DEF_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^(?:def|class)\s+\w+").unwrap());
static JS_EXPORT_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^export\s+(?:default\s+)?(?:function|class|const)\s*\w*").unwrap());

pub fn detect(samples: &SampleSet, access_multiplier: f64) -> DetectionResult {
    if samples.is_empty() {
        return DetectionResult::undetermined(ConventionCategory::Documentation);
    }

    let mut tally = EvidenceTally::new();
    let mut public_items = 0usize;
    let mut documented_items = 0usize;

    for file in &samples.files {
        let where_found = file.relative.display().to_string();
        match file.language {
            Language::Rust => {
                let hits = RUST_DOC_LINE.find_iter(&file.content).count();
                if hits > 0 {
                    tally.record(
                        DocStyle::RustDoc.canonical_name(),
                        hits,
                        format!("{} doc-comment lines in {}", hits, where_found),
                    );
                }
            }
            Language::Python => {
                let hits = PY_DOCSTRING.find_iter(&file.content).count();
                if hits > 0 {
                    tally.record(
                        DocStyle::PythonDocstring.canonical_name(),
                        hits,
                        format!("{} docstrings in {}", hits, where_found),
                    );
                }
            }
            Language::JavaScript | Language::TypeScript => {
                let hits = BLOCK_DOC_OPEN.find_iter(&file.content).count();
                if hits > 0 {
                    tally.record(
                        DocStyle::JsDoc.canonical_name(),
                        hits,
                        format!("{} /** blocks in {}", hits, where_found),
                    );
                }
            }
            Language::Java => {
                let hits = BLOCK_DOC_OPEN.find_iter(&file.content).count();
                if hits > 0 {
                    tally.record(
                        DocStyle::JavaDoc.canonical_name(),
                        hits,
                        format!("{} /** blocks in {}", hits, where_found),
                    );
                }
            }
            _ => {}
        }

        let doxygen_hits = DOXYGEN_MARK.find_iter(&file.content).count();
        if doxygen_hits > 0 {
            tally.record(
                DocStyle::Doxygen.canonical_name(),
                doxygen_hits,
                format!("{} doxygen markers in {}", doxygen_hits, where_found),
            );
        }

        let (items, documented) = doc_coverage(file);
        public_items += items;
        documented_items += documented;
    }

    // A project with comments but no structured docs still has a
    // convention, just a weak one
    if tally.is_empty() {
        for file in &samples.files {
            if PLAIN_COMMENT.is_match(&file.content) {
                tally.record(
                    DocStyle::PlainComment.canonical_name(),
                    1,
                    format!("unstructured comments in {}", file.relative.display()),
                );
            }
        }
    }

    let mut result = super::build_result(
        ConventionCategory::Documentation,
        tally,
        samples.len(),
        samples.coverage,
        access_multiplier,
    );

    if public_items > 0 {
        let ratio = documented_items as f64 / public_items as f64;
        if let Some(primary) = &mut result.primary {
            primary
                .evidence
                .push(format!("{:.0}% of {} public items documented", ratio * 100.0, public_items));
        }
    }
    result
}

/// Count public items and how many have a doc marker directly above them.
fn doc_coverage(file: &super::SampledFile) -> (usize, usize) {
    let item_regex: &Regex = match file.language {
        Language::Rust => &RUST_PUB_ITEM,
        Language::Python => &PY_DEF_ITEM,
        Language::JavaScript | Language::TypeScript => &JS_EXPORT_ITEM,
        _ => return (0, 0),
    };

    let lines: Vec<&str> = file.content.lines().collect();
    let mut items = 0usize;
    let mut documented = 0usize;

    for (index, line) in lines.iter().enumerate() {
        if !item_regex.is_match(line) {
            continue;
        }
        items += 1;
        let above = if index > 0 { lines[index - 1].trim() } else { "" };
        let doc_above = match file.language {
            Language::Rust => above.starts_with("///") || above.starts_with("#["),
            Language::Python => {
                // python documents below the signature
                lines
                    .get(index + 1)
                    .map(|l| l.trim_start().starts_with("\"\"\"") || l.trim_start().starts_with("'''"))
                    .unwrap_or(false)
            }
            _ => above.ends_with("*/"),
        };
        if doc_above {
            documented += 1;
        }
    }
    (items, documented)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conventions::sampler::SampledFile;
    use std::path::PathBuf;

    fn sample(language: Language, name: &str, content: &str) -> SampledFile {
        SampledFile {
            path: PathBuf::from(name),
            relative: PathBuf::from(name),
            language,
            content: content.to_string(),
            is_test: false,
        }
    }

    fn set(files: Vec<SampledFile>) -> SampleSet {
        SampleSet { files, coverage: 1.0 }
    }

    #[test]
    fn rustdoc_lines_dominate_rust_projects() {
        let content = "//! Module docs\n\n/// Adds numbers\npub fn add() {}\n\n/// Subtracts\npub fn sub() {}\n";
        let files = (0..10)
            .map(|i| sample(Language::Rust, &format!("src/m{}.rs", i), content))
            .collect();
        let result = detect(&set(files), 1.0);
        let primary = result.primary.expect("rustdoc dominant");
        assert_eq!(primary.style, "rustdoc");
        assert!(result.confidence > 0.8);
    }

    #[test]
    fn python_docstrings_detected() {
        let files = vec![sample(
            Language::Python,
            "lib.py",
            "def parse(raw):\n    \"\"\"Parse raw input.\"\"\"\n    return raw\n\nclass Loader:\n    '''Loads things.'''\n",
        )];
        let result = detect(&set(files), 1.0);
        assert_eq!(result.ranked[0].style, "python-docstring");
    }

    #[test]
    fn comment_free_code_is_undetermined() {
        let files = vec![sample(Language::Rust, "a.rs", "pub fn f() {}\n")];
        let result = detect(&set(files), 1.0);
        assert!(!result.determined());
    }

    #[test]
    fn plain_comments_only_fall_back_to_weak_style() {
        let files = vec![
            sample(Language::Rust, "a.rs", "// setup\nfn f() {}\n"),
            sample(Language::Rust, "b.rs", "// teardown\nfn g() {}\n"),
        ];
        let result = detect(&set(files), 1.0);
        assert_eq!(result.ranked[0].style, "plain-comments");
        assert!(result.confidence < 0.5);
    }

    #[test]
    fn coverage_ratio_reported_in_evidence() {
        let files = vec![sample(
            Language::Rust,
            "src/lib.rs",
            "/// documented\npub fn a() {}\n\npub fn b() {}\n/// documented\npub fn c() {}\n",
        )];
        let result = detect(&set(files), 1.0);
        let primary = result.primary.expect("rustdoc primary");
        assert!(
            primary.evidence.iter().any(|e| e.contains("public items documented")),
            "evidence: {:?}",
            primary.evidence
        );
    }
}
