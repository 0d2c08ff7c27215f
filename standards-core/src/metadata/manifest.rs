//! Per-language manifest parsers
//!
//! Each parser returns `None` for unreadable or malformed input; callers
//! skip and continue.

use super::Dependency;
use crate::access::AccessGateway;
use crate::language::Language;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Name, version and dependency lists pulled from one manifest
#[derive(Debug, Clone, Default)]
pub struct ManifestData {
    pub name: Option<String>,
    pub version: Option<String>,
    pub dependencies: Vec<Dependency>,
    pub dev_dependencies: Vec<Dependency>,
}

/// Read and parse the manifest for one language at the project root.
/// Files that are simply absent are not read attempts.
pub async fn parse_for_language(
    gateway: &AccessGateway,
    root: &Path,
    language: &Language,
) -> Option<ManifestData> {
    match language {
        Language::Rust => parse_cargo_toml(read_present(gateway, root, "Cargo.toml").await?.as_str()),
        Language::JavaScript | Language::TypeScript => {
            parse_package_json(read_present(gateway, root, "package.json").await?.as_str())
        }
        Language::Python => parse_python(gateway, root).await,
        Language::Go => parse_go_mod(read_present(gateway, root, "go.mod").await?.as_str()),
        Language::Java => parse_pom_xml(read_present(gateway, root, "pom.xml").await?.as_str()),
        Language::Ruby => parse_gemfile(read_present(gateway, root, "Gemfile").await?.as_str()),
        _ => None,
    }
}

async fn read_present(gateway: &AccessGateway, root: &Path, name: &str) -> Option<String> {
    let path = root.join(name);
    if !path.exists() {
        return None;
    }
    gateway.read(&path).await.content().map(|c| c.to_string())
}

fn toml_deps(value: &toml::Value, table: &str) -> Vec<Dependency> {
    let Some(deps) = value.get(table).and_then(|t| t.as_table()) else {
        return Vec::new();
    };
    deps.iter()
        .map(|(name, spec)| {
            let constraint = match spec {
                toml::Value::String(version) => Some(version.clone()),
                toml::Value::Table(table) => {
                    table.get("version").and_then(|v| v.as_str()).map(|v| v.to_string())
                }
                _ => None,
            };
            Dependency { name: name.clone(), constraint }
        })
        .collect()
}

pub fn parse_cargo_toml(content: &str) -> Option<ManifestData> {
    let value: toml::Value = toml::from_str(content).ok()?;
    let package = value.get("package");
    Some(ManifestData {
        name: package
            .and_then(|p| p.get("name"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        version: package
            .and_then(|p| p.get("version"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        dependencies: toml_deps(&value, "dependencies"),
        dev_dependencies: toml_deps(&value, "dev-dependencies"),
    })
}

fn json_deps(value: &serde_json::Value, key: &str) -> Vec<Dependency> {
    let Some(deps) = value.get(key).and_then(|d| d.as_object()) else {
        return Vec::new();
    };
    deps.iter()
        .map(|(name, constraint)| Dependency {
            name: name.clone(),
            constraint: constraint.as_str().map(|c| c.to_string()),
        })
        .collect()
}

pub fn parse_package_json(content: &str) -> Option<ManifestData> {
    let value: serde_json::Value = serde_json::from_str(content).ok()?;
    Some(ManifestData {
        name: value.get("name").and_then(|v| v.as_str()).map(|s| s.to_string()),
        version: value.get("version").and_then(|v| v.as_str()).map(|s| s.to_string()),
        dependencies: json_deps(&value, "dependencies"),
        dev_dependencies: json_deps(&value, "devDependencies"),
    })
}

/// Python spreads metadata across pyproject.toml and requirements.txt;
/// take whichever is there, pyproject first.
async fn parse_python(gateway: &AccessGateway, root: &Path) -> Option<ManifestData> {
    let mut data = ManifestData::default();
    let mut found = false;

    if let Some(content) = read_present(gateway, root, "pyproject.toml").await {
        if let Some(parsed) = parse_pyproject(&content) {
            data = parsed;
            found = true;
        }
    }
    if let Some(content) = read_present(gateway, root, "requirements.txt").await {
        data.dependencies.extend(parse_requirements_txt(&content));
        found = true;
    }

    found.then_some(data)
}

static REQUIREMENT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9_.\-]+)\s*([=<>!~]+.*)?$").unwrap());

pub fn parse_pyproject(content: &str) -> Option<ManifestData> {
    let value: toml::Value = toml::from_str(content).ok()?;
    let project = value.get("project")?;

    let dependencies = project
        .get("dependencies")
        .and_then(|d| d.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.as_str())
                .filter_map(parse_requirement_spec)
                .collect()
        })
        .unwrap_or_default();

    Some(ManifestData {
        name: project.get("name").and_then(|v| v.as_str()).map(|s| s.to_string()),
        version: project.get("version").and_then(|v| v.as_str()).map(|s| s.to_string()),
        dependencies,
        dev_dependencies: Vec::new(),
    })
}

pub fn parse_requirements_txt(content: &str) -> Vec<Dependency> {
    content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('-'))
        .filter_map(parse_requirement_spec)
        .collect()
}

fn parse_requirement_spec(spec: &str) -> Option<Dependency> {
    let captures = REQUIREMENT_LINE.captures(spec.trim())?;
    Some(Dependency {
        name: captures.get(1)?.as_str().to_string(),
        constraint: captures.get(2).map(|m| m.as_str().trim().to_string()),
    })
}

pub fn parse_go_mod(content: &str) -> Option<ManifestData> {
    let mut data = ManifestData::default();
    let mut in_require_block = false;

    for line in content.lines() {
        let line = line.trim();
        if let Some(module) = line.strip_prefix("module ") {
            data.name = Some(module.trim().to_string());
        } else if line.starts_with("require (") {
            in_require_block = true;
        } else if in_require_block && line == ")" {
            in_require_block = false;
        } else if in_require_block || line.starts_with("require ") {
            let spec = line.strip_prefix("require ").unwrap_or(line);
            let mut parts = spec.split_whitespace();
            if let (Some(name), Some(version)) = (parts.next(), parts.next()) {
                let dep = Dependency {
                    name: name.to_string(),
                    constraint: Some(version.to_string()),
                };
                // `// indirect` marks transitive pins, closest thing go has
                // to a dev split
                if spec.contains("// indirect") {
                    data.dev_dependencies.push(dep);
                } else {
                    data.dependencies.push(dep);
                }
            }
        }
    }

    data.name.is_some().then_some(data)
}

static POM_DEPENDENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"<dependency>.*?<groupId>([^<]+)</groupId>.*?<artifactId>([^<]+)</artifactId>(?:.*?<version>([^<]+)</version>)?.*?</dependency>",
    )
    .unwrap()
});
static POM_ARTIFACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<artifactId>([^<]+)</artifactId>").unwrap());

pub fn parse_pom_xml(content: &str) -> Option<ManifestData> {
    let flat = content.replace('\n', " ");
    let mut data = ManifestData::default();

    for captures in POM_DEPENDENCY.captures_iter(&flat) {
        let group = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let artifact = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
        if group.is_empty() || artifact.is_empty() {
            continue;
        }
        data.dependencies.push(Dependency {
            name: format!("{}:{}", group, artifact),
            constraint: captures.get(3).map(|m| m.as_str().to_string()),
        });
    }
    // First artifactId outside a <dependency> block is the project itself
    if let Some(captures) = POM_ARTIFACT.captures(&flat) {
        let first = captures.get(1).map(|m| m.as_str().to_string());
        if data.dependencies.iter().all(|d| Some(&d.name) != first.as_ref()) {
            data.name = first;
        }
    }

    (data.name.is_some() || !data.dependencies.is_empty()).then_some(data)
}

static GEMFILE_GEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*gem\s+['"]([^'"]+)['"](?:\s*,\s*['"]([^'"]+)['"])?"#).unwrap()
});

pub fn parse_gemfile(content: &str) -> Option<ManifestData> {
    let mut data = ManifestData::default();
    for captures in GEMFILE_GEM.captures_iter(content) {
        data.dependencies.push(Dependency {
            name: captures.get(1)?.as_str().to_string(),
            constraint: captures.get(2).map(|m| m.as_str().to_string()),
        });
    }
    (!data.dependencies.is_empty()).then_some(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cargo_toml_table_and_string_constraints() {
        let data = parse_cargo_toml(
            "[package]\nname = \"x\"\n[dependencies]\na = \"1\"\nb = { version = \"2\", features = [\"f\"] }\n",
        )
        .unwrap();
        assert_eq!(data.dependencies.len(), 2);
        assert_eq!(data.dependencies[0].constraint.as_deref(), Some("1"));
        assert_eq!(data.dependencies[1].constraint.as_deref(), Some("2"));
    }

    #[test]
    fn package_json_splits_dev_dependencies() {
        let data = parse_package_json(
            r#"{"name":"app","dependencies":{"react":"^18"},"devDependencies":{"jest":"^29"}}"#,
        )
        .unwrap();
        assert_eq!(data.name.as_deref(), Some("app"));
        assert_eq!(data.dependencies[0].name, "react");
        assert_eq!(data.dev_dependencies[0].name, "jest");
    }

    #[test]
    fn requirements_lines_keep_constraints_and_skip_comments() {
        let deps = parse_requirements_txt("# pinned\nrequests==2.31.0\nflask>=2\n\n-r other.txt\n");
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "requests");
        assert_eq!(deps[0].constraint.as_deref(), Some("==2.31.0"));
    }

    #[test]
    fn go_mod_require_block_and_indirect_split() {
        let data = parse_go_mod(
            "module example.com/app\n\ngo 1.22\n\nrequire (\n\tgithub.com/a/b v1.2.3\n\tgolang.org/x/sys v0.1.0 // indirect\n)\n",
        )
        .unwrap();
        assert_eq!(data.name.as_deref(), Some("example.com/app"));
        assert_eq!(data.dependencies.len(), 1);
        assert_eq!(data.dev_dependencies.len(), 1);
    }

    #[test]
    fn pom_xml_dependencies_use_group_artifact_names() {
        let data = parse_pom_xml(
            "<project><artifactId>demo</artifactId><dependencies><dependency><groupId>org.junit</groupId><artifactId>junit5</artifactId><version>5.9</version></dependency></dependencies></project>",
        )
        .unwrap();
        assert_eq!(data.name.as_deref(), Some("demo"));
        assert_eq!(data.dependencies[0].name, "org.junit:junit5");
        assert_eq!(data.dependencies[0].constraint.as_deref(), Some("5.9"));
    }

    #[test]
    fn malformed_inputs_return_none() {
        assert!(parse_cargo_toml("not [ toml").is_none());
        assert!(parse_package_json("{broken").is_none());
        assert!(parse_go_mod("go 1.22\n").is_none());
    }
}
