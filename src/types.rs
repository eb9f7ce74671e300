//! Core types shared across the codevet pipeline.
//!
//! This module defines the fundamental data structures used throughout the
//! analyzer:
//! - [`Alert`] - A single finding emitted by a rule module
//! - [`Severity`] - Fixed four-level severity taxonomy
//! - [`FileRecord`] - Per-file classification produced by the scanner
//! - [`PackageDependency`] / [`PackageInfo`] - Manifest and registry records
//! - [`Report`] - The final artifact returned by a pipeline run

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Severity of an alert. Fixed per rule-id; never derived at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// All severities, most severe first.
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single finding. `id` is assigned by the coordinator after the final
/// sort, so it is stable within a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Alert {
    /// Stable within a run (1-based, assigned after ordering).
    #[serde(default)]
    pub id: u32,
    pub severity: Severity,
    /// Taxonomy key, e.g. `phantom-package`.
    pub rule_id: String,
    /// Emitting module: hallucination, laziness, security, architecture, cost.
    pub module: String,
    pub message: String,
    /// Path relative to the scan root.
    pub file: String,
    /// 1-based line, when the finding is anchored to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// 1-based column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    /// Concrete remediation step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Alert {
    pub fn new(
        severity: Severity,
        rule_id: &str,
        module: &str,
        message: impl Into<String>,
        file: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            severity,
            rule_id: rule_id.to_string(),
            module: module.to_string(),
            message: message.into(),
            file: file.into(),
            line: None,
            column: None,
            suggestion: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Deduplication key: `(file, line, rule-id, message)`.
    pub fn dedup_key(&self) -> (String, Option<usize>, String, String) {
        (
            self.file.clone(),
            self.line,
            self.rule_id.clone(),
            self.message.clone(),
        )
    }

    /// Stable ordering key: `(file, line, rule-id, message)`.
    pub fn sort_key(&self) -> (String, usize, String, String) {
        (
            self.file.clone(),
            self.line.unwrap_or(0),
            self.rule_id.clone(),
            self.message.clone(),
        )
    }
}

/// Language tag attached to every scanned file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Javascript,
    Typescript,
    Python,
    Rust,
    Go,
    Vue,
    Svelte,
    Unknown,
}

impl Language {
    /// Classify by file extension (lowercased, without the dot).
    pub fn from_extension(ext: &str) -> Language {
        match ext {
            "js" | "jsx" | "mjs" | "cjs" => Language::Javascript,
            "ts" | "tsx" | "mts" | "cts" => Language::Typescript,
            "py" => Language::Python,
            "rs" => Language::Rust,
            "go" => Language::Go,
            "vue" => Language::Vue,
            "svelte" => Language::Svelte,
            _ => Language::Unknown,
        }
    }
}

/// Per-file classification. Created by the scanner, immutable thereafter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path.
    pub path: PathBuf,
    pub language: Language,
    /// Size in bytes at scan time.
    pub size: u64,
    /// True for the fixed source-extension whitelist.
    pub is_source: bool,
    /// True for recognized dependency manifests (package.json, go.mod, ...).
    pub is_manifest: bool,
}

/// Upstream package registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Registry {
    Npm,
    Pypi,
    Crates,
    Go,
}

impl Registry {
    pub fn label(&self) -> &'static str {
        match self {
            Registry::Npm => "npm",
            Registry::Pypi => "pypi",
            Registry::Crates => "crates",
            Registry::Go => "go",
        }
    }
}

impl std::fmt::Display for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How a dependency is declared in its manifest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Production,
    Development,
    Peer,
    Optional,
}

/// One declared dependency, as parsed from a manifest file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackageDependency {
    pub name: String,
    /// Raw version/constraint string, when the manifest carries one.
    pub version: Option<String>,
    pub kind: DependencyKind,
    pub registry: Registry,
    /// Manifest the dependency was declared in.
    pub manifest_path: PathBuf,
}

/// Normalized package metadata from a registry lookup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub latest_version: String,
    pub description: Option<String>,
    /// First-published timestamp; "now" when the registry omits it.
    pub created_at: DateTime<Utc>,
    /// Download count, when the registry exposes one.
    pub downloads: Option<u64>,
    pub maintainers: Vec<String>,
    /// Canonical source repository URL, when derivable.
    pub repository_url: Option<String>,
}

/// Alert counts by severity plus the run score.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub total: usize,
    /// 0-100, higher is better.
    pub score: f64,
}

/// Metadata about a single pipeline run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanMetadata {
    /// Scan root as given to the coordinator.
    pub root: String,
    /// Files that entered analysis.
    pub file_count: usize,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
    /// Resolved configuration snapshot.
    pub config: Config,
}

/// The final artifact of a pipeline run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Report {
    pub summary: ReportSummary,
    /// Deduplicated, severity-filtered, stably ordered.
    pub alerts: Vec<Alert>,
    pub metadata: ScanMetadata,
}
