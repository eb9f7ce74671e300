//! Analysis configuration.
//!
//! The configuration is an inert immutable value passed through the pipeline.
//! Loading it from disk and schema-validating user input are the caller's
//! concern; this module only defines the recognized options, their defaults,
//! and the numeric-range validation the coordinator runs before analysis.
//!
//! Field names deserialize from the camelCase keys the host tooling uses
//! (`packageAgeThresholdDays`, `maxFileSize`, ...).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Severity;

/// A configuration value is out of range or structurally unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{option}: {value} is outside the valid range {range}")]
    OutOfRange {
        option: &'static str,
        value: String,
        range: &'static str,
    },
}

/// Root configuration for a pipeline run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Alerts are retained iff their severity is in this set.
    pub severity: Vec<Severity>,
    pub modules: ModuleToggles,
    pub hallucination: HallucinationConfig,
    pub laziness: LazinessConfig,
    pub security: SecurityConfig,
    pub architecture: ArchitectureConfig,
    pub supply_chain: SupplyChainConfig,
    pub scanning: ScanningConfig,
    /// rule-id -> glob patterns that suppress it, relative to the scan root.
    pub ignore_rules: BTreeMap<String, Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            severity: Severity::ALL.to_vec(),
            modules: ModuleToggles::default(),
            hallucination: HallucinationConfig::default(),
            laziness: LazinessConfig::default(),
            security: SecurityConfig::default(),
            architecture: ArchitectureConfig::default(),
            supply_chain: SupplyChainConfig::default(),
            scanning: ScanningConfig::default(),
            ignore_rules: BTreeMap::new(),
        }
    }
}

/// Per-module enable switches. Modules run in registration order regardless.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleToggles {
    pub hallucination: bool,
    pub laziness: bool,
    pub security: bool,
    pub architecture: bool,
    pub cost: bool,
}

impl Default for ModuleToggles {
    fn default() -> Self {
        Self {
            hallucination: true,
            laziness: true,
            security: true,
            architecture: true,
            cost: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HallucinationConfig {
    /// Packages younger than this many days are flagged as newborn.
    pub package_age_threshold_days: u32,
    /// Newborns with at least this many known downloads are not flagged.
    pub package_download_threshold: u64,
    /// Exact Levenshtein distance that triggers typosquat-risk (1-3).
    pub typosquat_levenshtein_distance: usize,
    /// How much of the top-package table to compare against.
    pub top_packages_count: usize,
}

impl Default for HallucinationConfig {
    fn default() -> Self {
        Self {
            package_age_threshold_days: 30,
            package_download_threshold: 500,
            typosquat_levenshtein_distance: 1,
            top_packages_count: 10_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LazinessConfig {
    /// Placeholder-comment regexes, matched case-insensitively per line.
    pub patterns: Vec<String>,
    pub detect_ai_preambles: bool,
    pub detect_hollow_functions: bool,
    pub detect_mock_implementations: bool,
    pub detect_placeholder_comments: bool,
    pub detect_over_commenting: bool,
    pub detect_unlogged_errors: bool,
    /// Comment-density ceiling for non-test files.
    pub comment_density_threshold: f64,
    /// Function-name prefixes checked by mock-implementation.
    pub mock_name_prefixes: Vec<String>,
}

/// Default placeholder patterns for `laziness.patterns`.
pub fn default_placeholder_patterns() -> Vec<String> {
    [
        r"TODO:?\s*implement",
        r"FIXME:?\s*implement",
        r"implement\s+(?:this\s+)?later",
        r"implementation\s+goes\s+here",
        r"your\s+(?:code|logic|implementation)\s+here",
        r"add\s+(?:your\s+)?logic\s+here",
        r"rest\s+of\s+(?:the\s+)?(?:code|function|implementation)",
        r"\.\.\.\s*existing\s+code\s*\.\.\.",
        r"placeholder",
        r"not\s+(?:yet\s+)?implemented",
        r"coming\s+soon",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for LazinessConfig {
    fn default() -> Self {
        Self {
            patterns: default_placeholder_patterns(),
            detect_ai_preambles: true,
            detect_hollow_functions: true,
            detect_mock_implementations: true,
            detect_placeholder_comments: true,
            detect_over_commenting: true,
            detect_unlogged_errors: true,
            comment_density_threshold: 0.20,
            mock_name_prefixes: vec!["calculate".to_string(), "process".to_string()],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityConfig {
    pub detect_hardcoded_secrets: bool,
    pub detect_insecure_deserialization: bool,
    pub detect_react2_shell: bool,
    pub detect_insecure_jwt: bool,
    pub detect_missing_env_check: bool,
    pub detect_hardcoded_production_url: bool,
    /// Shannon entropy (bits/char) above which a long quoted string is
    /// considered a likely secret.
    pub secret_entropy_threshold: f64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            detect_hardcoded_secrets: true,
            detect_insecure_deserialization: true,
            detect_react2_shell: true,
            detect_insecure_jwt: true,
            detect_missing_env_check: true,
            detect_hardcoded_production_url: true,
            secret_entropy_threshold: 4.5,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchitectureConfig {
    /// god-function fires only above this complexity...
    pub cyclomatic_complexity_threshold: u32,
    /// ...and above this body line count.
    pub lines_of_code_threshold: usize,
    pub detect_mixed_naming: bool,
    pub detect_circular_dependencies: bool,
    pub detect_magic_numbers: bool,
    pub detect_unused_exports: bool,
}

impl Default for ArchitectureConfig {
    fn default() -> Self {
        Self {
            cyclomatic_complexity_threshold: 25,
            lines_of_code_threshold: 100,
            detect_mixed_naming: true,
            detect_circular_dependencies: true,
            detect_magic_numbers: true,
            detect_unused_exports: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SupplyChainConfig {
    pub check_newborn: bool,
    pub check_scorecard: bool,
    pub min_scorecard_score: f64,
}

impl Default for SupplyChainConfig {
    fn default() -> Self {
        Self {
            check_newborn: false,
            check_scorecard: false,
            min_scorecard_score: 5.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanningConfig {
    /// Include globs, relative to the scan root.
    pub include: Vec<String>,
    /// Exclude globs, applied after includes together with the built-in
    /// ignore set (node_modules, .git, dist, target, ...).
    pub exclude: Vec<String>,
    /// Files larger than this many bytes are skipped.
    pub max_file_size: u64,
    pub follow_symlinks: bool,
}

/// Default include globs: source extensions plus dependency manifests.
pub fn default_include_globs() -> Vec<String> {
    [
        "**/*.js",
        "**/*.jsx",
        "**/*.mjs",
        "**/*.cjs",
        "**/*.ts",
        "**/*.tsx",
        "**/*.py",
        "**/*.rs",
        "**/*.go",
        "**/*.java",
        "**/*.kt",
        "**/*.cs",
        "**/*.cpp",
        "**/*.c",
        "**/*.h",
        "**/*.php",
        "**/*.rb",
        "**/*.swift",
        "**/*.scala",
        "**/*.vue",
        "**/*.svelte",
        "**/package.json",
        "**/requirements.txt",
        "**/pyproject.toml",
        "**/Cargo.toml",
        "**/go.mod",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            include: default_include_globs(),
            exclude: Vec::new(),
            max_file_size: 1_048_576,
            follow_symlinks: false,
        }
    }
}

impl Config {
    /// Reject out-of-range numeric options. The pipeline refuses to run on
    /// an invalid configuration; presentation is the caller's concern.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = self.hallucination.typosquat_levenshtein_distance;
        if !(1..=3).contains(&d) {
            return Err(ConfigError::OutOfRange {
                option: "hallucination.typosquatLevenshteinDistance",
                value: d.to_string(),
                range: "1-3",
            });
        }
        let density = self.laziness.comment_density_threshold;
        if !(density > 0.0 && density <= 1.0) {
            return Err(ConfigError::OutOfRange {
                option: "laziness.commentDensityThreshold",
                value: density.to_string(),
                range: "(0, 1]",
            });
        }
        let entropy = self.security.secret_entropy_threshold;
        if !(entropy > 0.0 && entropy <= 8.0) {
            return Err(ConfigError::OutOfRange {
                option: "security.secretEntropyThreshold",
                value: entropy.to_string(),
                range: "(0, 8]",
            });
        }
        let score = self.supply_chain.min_scorecard_score;
        if !(0.0..=10.0).contains(&score) {
            return Err(ConfigError::OutOfRange {
                option: "supplyChain.minScorecardScore",
                value: score.to_string(),
                range: "0-10",
            });
        }
        if self.architecture.cyclomatic_complexity_threshold == 0 {
            return Err(ConfigError::OutOfRange {
                option: "architecture.cyclomaticComplexityThreshold",
                value: "0".to_string(),
                range: ">= 1",
            });
        }
        if self.architecture.lines_of_code_threshold == 0 {
            return Err(ConfigError::OutOfRange {
                option: "architecture.linesOfCodeThreshold",
                value: "0".to_string(),
                range: ">= 1",
            });
        }
        if self.scanning.max_file_size == 0 {
            return Err(ConfigError::OutOfRange {
                option: "scanning.maxFileSize",
                value: "0".to_string(),
                range: ">= 1",
            });
        }
        Ok(())
    }

    /// True iff alerts of this severity should be retained.
    pub fn retains_severity(&self, severity: Severity) -> bool {
        self.severity.contains(&severity)
    }
}
