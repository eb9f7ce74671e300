//! Dependency manifest parsing.
//!
//! Each supported manifest format is reduced to a flat list of
//! [`PackageDependency`] records. Parsers are deliberately tolerant: a
//! malformed file yields an empty list and never aborts the pipeline. The
//! TOML-ish readers are line-based for the same reason; they must survive
//! files a real TOML parser would reject.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value as JsonValue;

use crate::types::{DependencyKind, PackageDependency, Registry};

fn regex_requirement_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9._\-]+)([><=!~^]+(.+))?").expect("valid regex literal")
    })
}

fn regex_cargo_dependency_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*([A-Za-z0-9_\-]+)\s*=\s*"([^"]+)"\s*$"#).expect("valid regex literal")
    })
}

/// Parse one manifest file into dependency records. Dispatch is by
/// case-insensitive basename; unrecognized basenames yield nothing.
pub fn parse_manifest(path: &Path, content: &str) -> Vec<PackageDependency> {
    let basename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_lowercase();

    match basename.as_str() {
        "package.json" => parse_package_json(path, content),
        "requirements.txt" => parse_requirements_txt(path, content),
        "pyproject.toml" => parse_pyproject_toml(path, content),
        "cargo.toml" => parse_cargo_toml(path, content),
        "go.mod" => parse_go_mod(path, content),
        _ => Vec::new(),
    }
}

fn parse_package_json(path: &Path, content: &str) -> Vec<PackageDependency> {
    let json: JsonValue = match serde_json::from_str(content) {
        Ok(json) => json,
        Err(err) => {
            tracing::debug!(path = %path.display(), %err, "malformed package.json");
            return Vec::new();
        }
    };

    let sections = [
        ("dependencies", DependencyKind::Production),
        ("devDependencies", DependencyKind::Development),
        ("peerDependencies", DependencyKind::Peer),
        ("optionalDependencies", DependencyKind::Optional),
    ];

    let mut deps = Vec::new();
    for (section, kind) in sections {
        let Some(map) = json.get(section).and_then(|v| v.as_object()) else {
            continue;
        };
        for (name, version) in map {
            deps.push(PackageDependency {
                name: name.clone(),
                version: version.as_str().map(|s| s.to_string()),
                kind,
                registry: Registry::Npm,
                manifest_path: path.to_path_buf(),
            });
        }
    }
    deps
}

fn parse_requirements_txt(path: &Path, content: &str) -> Vec<PackageDependency> {
    let mut deps = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        // Blank lines, comments, and pip flags (-r, --index-url, ...) carry
        // no dependency name.
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('-') {
            continue;
        }
        if let Some(caps) = regex_requirement_line().captures(trimmed) {
            deps.push(PackageDependency {
                name: caps[1].to_string(),
                version: caps.get(3).map(|m| m.as_str().trim().to_string()),
                kind: DependencyKind::Production,
                registry: Registry::Pypi,
                manifest_path: path.to_path_buf(),
            });
        }
    }
    deps
}

fn parse_pyproject_toml(path: &Path, content: &str) -> Vec<PackageDependency> {
    // Line-scan for a `dependencies = [ ... ]` list; no full TOML needed.
    let mut deps = Vec::new();
    let mut in_list = false;
    let mut buffer = String::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if !in_list {
            if let Some(rest) = trimmed
                .strip_prefix("dependencies")
                .map(str::trim_start)
                .and_then(|r| r.strip_prefix('='))
            {
                let rest = rest.trim_start();
                if let Some(list) = rest.strip_prefix('[') {
                    if let Some(end) = list.find(']') {
                        buffer.push_str(&list[..end]);
                        deps.extend(parse_python_spec_list(path, &buffer));
                        buffer.clear();
                    } else {
                        buffer.push_str(list);
                        buffer.push(',');
                        in_list = true;
                    }
                }
            }
        } else if let Some(end) = trimmed.find(']') {
            buffer.push_str(&trimmed[..end]);
            deps.extend(parse_python_spec_list(path, &buffer));
            buffer.clear();
            in_list = false;
        } else {
            buffer.push_str(trimmed);
            buffer.push(',');
        }
    }
    deps
}

fn parse_python_spec_list(path: &Path, raw: &str) -> Vec<PackageDependency> {
    let mut deps = Vec::new();
    for item in raw.split(',') {
        let spec = item.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        if spec.is_empty() || spec.starts_with('#') {
            continue;
        }
        if let Some(caps) = regex_requirement_line().captures(spec) {
            deps.push(PackageDependency {
                name: caps[1].to_string(),
                version: caps.get(3).map(|m| m.as_str().trim().to_string()),
                kind: DependencyKind::Production,
                registry: Registry::Pypi,
                manifest_path: path.to_path_buf(),
            });
        }
    }
    deps
}

fn parse_cargo_toml(path: &Path, content: &str) -> Vec<PackageDependency> {
    let mut deps = Vec::new();
    let mut table_kind: Option<DependencyKind> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            // Table header: [dependencies], [dev-dependencies],
            // [workspace.dependencies], [target.'cfg(..)'.dependencies], ...
            let header = trimmed.trim_matches(|c| c == '[' || c == ']');
            table_kind = if !header.ends_with("dependencies") {
                None
            } else if header.ends_with("dev-dependencies") {
                Some(DependencyKind::Development)
            } else {
                Some(DependencyKind::Production)
            };
            continue;
        }
        let Some(kind) = table_kind else {
            continue;
        };
        if let Some(caps) = regex_cargo_dependency_line().captures(trimmed) {
            deps.push(PackageDependency {
                name: caps[1].to_string(),
                version: Some(caps[2].to_string()),
                kind,
                registry: Registry::Crates,
                manifest_path: path.to_path_buf(),
            });
        }
    }
    deps
}

/// go.mod directive keywords that introduce something other than a module
/// requirement on their line.
const GO_DIRECTIVES: &[&str] = &[
    "module",
    "go",
    "toolchain",
    "require",
    "replace",
    "exclude",
    "retract",
];

fn parse_go_mod(path: &Path, content: &str) -> Vec<PackageDependency> {
    let mut deps = Vec::new();
    for line in content.lines() {
        let without_comment = line.split("//").next().unwrap_or("");
        let trimmed = without_comment.trim();
        if trimmed.is_empty() || trimmed == ")" || trimmed.ends_with('(') {
            continue;
        }
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        let (name, version) = match tokens.as_slice() {
            // `require github.com/x v1.2.3` single-line form.
            [directive, name, version, ..] if *directive == "require" => (*name, *version),
            [directive, ..] if GO_DIRECTIVES.contains(directive) => continue,
            [name, version, ..] => (*name, *version),
            _ => continue,
        };
        deps.push(PackageDependency {
            name: name.to_string(),
            version: Some(version.to_string()),
            kind: DependencyKind::Production,
            registry: Registry::Go,
            manifest_path: path.to_path_buf(),
        });
    }
    deps
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn parse(basename: &str, content: &str) -> Vec<PackageDependency> {
        parse_manifest(&PathBuf::from(basename), content)
    }

    #[test]
    fn package_json_all_sections() {
        let deps = parse(
            "package.json",
            r#"{
                "dependencies": { "react": "^18.0.0" },
                "devDependencies": { "vitest": "1.0.0" },
                "peerDependencies": { "react-dom": "*" },
                "optionalDependencies": { "fsevents": "2.x" }
            }"#,
        );
        assert_eq!(deps.len(), 4);
        assert!(deps.iter().all(|d| d.registry == Registry::Npm));
        let react = deps.iter().find(|d| d.name == "react").unwrap();
        assert_eq!(react.kind, DependencyKind::Production);
        assert_eq!(react.version.as_deref(), Some("^18.0.0"));
        let vitest = deps.iter().find(|d| d.name == "vitest").unwrap();
        assert_eq!(vitest.kind, DependencyKind::Development);
        let peer = deps.iter().find(|d| d.name == "react-dom").unwrap();
        assert_eq!(peer.kind, DependencyKind::Peer);
        let optional = deps.iter().find(|d| d.name == "fsevents").unwrap();
        assert_eq!(optional.kind, DependencyKind::Optional);
    }

    #[test]
    fn malformed_package_json_yields_empty() {
        assert!(parse("package.json", "{ not json").is_empty());
    }

    #[test]
    fn requirements_txt_versions_and_comments() {
        let deps = parse(
            "requirements.txt",
            "# pinned\nrequests==2.31.0\nflask>=2.0\nnumpy\n\n-r dev.txt\n",
        );
        assert_eq!(deps.len(), 3);
        assert_eq!(deps[0].name, "requests");
        assert_eq!(deps[0].version.as_deref(), Some("2.31.0"));
        assert_eq!(deps[1].name, "flask");
        assert_eq!(deps[2].name, "numpy");
        assert!(deps[2].version.is_none());
        assert!(deps.iter().all(|d| d.registry == Registry::Pypi));
    }

    #[test]
    fn pyproject_single_line_list() {
        let deps = parse(
            "pyproject.toml",
            "[project]\ndependencies = [\"httpx>=0.25\", \"pydantic\"]\n",
        );
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "httpx");
        assert_eq!(deps[1].name, "pydantic");
    }

    #[test]
    fn pyproject_multi_line_list() {
        let deps = parse(
            "pyproject.toml",
            "[project]\ndependencies = [\n  \"rich==13.0\",\n  \"typer\",\n]\n",
        );
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "rich");
        assert_eq!(deps[0].version.as_deref(), Some("13.0"));
    }

    #[test]
    fn cargo_toml_dependency_tables_only() {
        let deps = parse(
            "Cargo.toml",
            concat!(
                "[package]\n",
                "name = \"mycrate\"\n",
                "version = \"0.1.0\"\n",
                "edition = \"2021\"\n",
                "[dependencies]\n",
                "serde = \"1.0\"\n",
                "regex = \"1.12\"\n",
                "[dev-dependencies]\n",
                "tempfile = \"3\"\n",
            ),
        );
        let names: Vec<&str> = deps.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["serde", "regex", "tempfile"]);
        assert!(deps.iter().all(|d| d.registry == Registry::Crates));
        assert_eq!(deps[0].kind, DependencyKind::Production);
        assert_eq!(deps[2].kind, DependencyKind::Development);
        // Package metadata must not leak in as dependencies.
        assert!(!names.contains(&"edition"));
    }

    #[test]
    fn go_mod_require_block_and_inline() {
        let deps = parse(
            "go.mod",
            concat!(
                "module example.com/app\n",
                "go 1.21\n",
                "require github.com/solo/dep v1.0.0\n",
                "require (\n",
                "\tgithub.com/gin-gonic/gin v1.9.1\n",
                "\tgolang.org/x/sync v0.5.0 // indirect\n",
                ")\n",
            ),
        );
        let names: Vec<&str> = deps.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "github.com/solo/dep",
                "github.com/gin-gonic/gin",
                "golang.org/x/sync"
            ]
        );
        assert_eq!(deps[1].version.as_deref(), Some("v1.9.1"));
        assert!(deps.iter().all(|d| d.registry == Registry::Go));
    }

    #[test]
    fn unknown_basename_yields_empty() {
        assert!(parse("composer.json", "{}").is_empty());
    }
}
