//! Security rules: hardcoded secrets, insecure deserialization, unvalidated
//! server actions, JWT misuse, destructive operations without environment
//! guards, hardcoded production URLs, and low supply-chain scorecards.
//!
//! All file-level checks are line-oriented regex scans so they survive
//! partial or broken source files.

use async_trait::async_trait;

use crate::config::Config;
use crate::manifest::parse_manifest;
use crate::types::{Alert, Language, Severity};

use super::regexes::{
    regex_aws_key, regex_connection_url, regex_delete_where_true, regex_destroy_force,
    regex_export_async_fn, regex_jwt, regex_jwt_none_alg, regex_long_quoted_string,
    regex_node_env_guard, regex_not_production_guard, regex_production_url,
    regex_secret_assignment, regex_typeof_check,
};
use super::textscan::{body_brace_index, find_matching_brace};
use super::{ModuleContext, RuleModule, SourceFile};

const MODULE: &str = "security";

/// Markers that make a destructive statement acceptable: some environment
/// check appeared in the preceding window. Guard shapes that mention
/// "production" are matched as patterns in [`has_env_marker`], never as a
/// bare substring (identifiers like `productionUsers` must not count).
const ENV_MARKERS: &[&str] = &["process.env", "import.meta.env"];

/// Destructive operations that must be environment-guarded.
const DESTRUCTIVE_MARKERS: &[&str] = &[
    ".deletemany(",
    ".drop(",
    ".truncate(",
    "drop table",
    "truncate table",
];

/// How many lines above a destructive call may carry the guard.
const ENV_WINDOW: usize = 10;

/// Validation markers accepted inside an exported server action.
const VALIDATION_MARKERS: &[&str] = &[
    "zod.",
    "yup.",
    "joi.",
    "validator.",
    ".parse(",
    ".validate(",
    ".validatesync(",
    "instanceof ",
];

const PYTHON_DESERIALIZATION: &[&str] = &["import pickle", "pickle.loads(", "pickle.load("];
const JS_DESERIALIZATION: &[&str] = &["eval(", "Function(", "new Function("];

pub struct SecurityModule;

#[async_trait]
impl RuleModule for SecurityModule {
    fn name(&self) -> &'static str {
        MODULE
    }

    fn is_enabled(&self, config: &Config) -> bool {
        config.modules.security
    }

    async fn analyze(&self, ctx: &ModuleContext<'_>) -> Vec<Alert> {
        let mut alerts = Vec::new();

        for file in ctx.files.iter().filter(|f| f.record.is_source) {
            if ctx.cancel.is_cancelled() {
                break;
            }
            check_file(ctx.config, file, &mut alerts);
        }

        if ctx.config.supply_chain.check_scorecard {
            check_scorecards(ctx, &mut alerts).await;
        }
        alerts
    }
}

fn is_js_family(language: Language) -> bool {
    matches!(
        language,
        Language::Javascript | Language::Typescript | Language::Vue | Language::Svelte
    )
}

fn check_file(config: &Config, file: &SourceFile, alerts: &mut Vec<Alert>) {
    let security = &config.security;
    let language = file.record.language;
    let lines: Vec<&str> = file.text.lines().collect();

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let lowered = line.to_lowercase();

        if security.detect_hardcoded_secrets
            && let Some(kind) = secret_kind(line, security.secret_entropy_threshold)
        {
            alerts.push(
                Alert::new(
                    Severity::Critical,
                    "hardcoded-secret",
                    MODULE,
                    format!("Hardcoded {kind}"),
                    file.rel_path.clone(),
                )
                .at_line(line_no)
                .suggest("Move the secret to environment configuration and rotate it"),
            );
        }

        if security.detect_insecure_deserialization {
            let markers: Option<(&[&str], Severity)> = if language == Language::Python {
                Some((PYTHON_DESERIALIZATION, Severity::Critical))
            } else if is_js_family(language) {
                Some((JS_DESERIALIZATION, Severity::High))
            } else {
                None
            };
            if let Some((markers, severity)) = markers
                && markers.iter().any(|marker| line.contains(marker))
            {
                alerts.push(
                    Alert::new(
                        severity,
                        "insecure-deserialization",
                        MODULE,
                        "Dynamic code or object deserialization from untrusted input".to_string(),
                        file.rel_path.clone(),
                    )
                    .at_line(line_no)
                    .suggest("Parse data with a safe format (JSON) instead"),
                );
            }
        }

        if security.detect_insecure_jwt {
            if line.contains("jwt.decode(") {
                alerts.push(
                    Alert::new(
                        Severity::High,
                        "insecure-jwt",
                        MODULE,
                        "JWT decoded without signature verification".to_string(),
                        file.rel_path.clone(),
                    )
                    .at_line(line_no)
                    .suggest("Use jwt.verify with the signing key"),
                );
            }
            if regex_jwt_none_alg().is_match(line) {
                alerts.push(
                    Alert::new(
                        Severity::Critical,
                        "insecure-jwt-none",
                        MODULE,
                        "JWT configured with the 'none' algorithm".to_string(),
                        file.rel_path.clone(),
                    )
                    .at_line(line_no)
                    .suggest("Pin a real signing algorithm (HS256, RS256, ...)"),
                );
            }
        }

        if security.detect_missing_env_check && is_destructive(&lowered) {
            let window_start = idx.saturating_sub(ENV_WINDOW);
            let guarded = lines[window_start..=idx]
                .iter()
                .any(|l| has_env_marker(&l.to_lowercase()));
            if !guarded {
                alerts.push(
                    Alert::new(
                        Severity::Medium,
                        "missing-env-check",
                        MODULE,
                        "Destructive operation without an environment guard".to_string(),
                        file.rel_path.clone(),
                    )
                    .at_line(line_no)
                    .suggest("Gate the operation behind an environment check (e.g. NODE_ENV)"),
                );
            }
        }

        if security.detect_hardcoded_production_url
            && !is_comment_line(line)
            && regex_production_url().is_match(line)
            && !has_env_marker(&lowered)
        {
            alerts.push(
                Alert::new(
                    Severity::High,
                    "hardcoded-production-url",
                    MODULE,
                    "Production URL hardcoded in source".to_string(),
                    file.rel_path.clone(),
                )
                .at_line(line_no)
                .suggest("Read the endpoint from configuration instead"),
            );
        }
    }

    if security.detect_react2_shell && is_js_family(language) {
        check_server_actions(file, alerts);
    }
}

fn is_comment_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with('#') || trimmed.starts_with('*') || trimmed.starts_with("/*")
}

fn has_env_marker(lowered: &str) -> bool {
    ENV_MARKERS.iter().any(|marker| lowered.contains(marker))
        || regex_node_env_guard().is_match(lowered)
        || regex_not_production_guard().is_match(lowered)
}

fn is_destructive(lowered: &str) -> bool {
    DESTRUCTIVE_MARKERS.iter().any(|marker| lowered.contains(marker))
        || regex_destroy_force().is_match(lowered)
        || regex_delete_where_true().is_match(lowered)
}

/// Classify a line against the hardcoded-secret pattern family. The
/// catch-all long-string pattern fires only above the entropy threshold.
fn secret_kind(line: &str, entropy_threshold: f64) -> Option<&'static str> {
    if regex_secret_assignment().is_match(line) {
        return Some("credential assignment");
    }
    if regex_jwt().is_match(line) {
        return Some("JWT token");
    }
    if regex_aws_key().is_match(line) {
        return Some("AWS key");
    }
    if regex_connection_url().is_match(line) {
        return Some("connection string with credentials");
    }
    for caps in regex_long_quoted_string().captures_iter(line) {
        if shannon_entropy(&caps[1]) > entropy_threshold {
            return Some("high-entropy string (likely secret)");
        }
    }
    None
}

/// Shannon entropy in bits per character.
pub fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }
    let mut counts = std::collections::HashMap::new();
    for ch in s.chars() {
        *counts.entry(ch).or_insert(0usize) += 1;
    }
    let len = s.chars().count() as f64;
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// `"use server"` actions must validate their inputs.
fn check_server_actions(file: &SourceFile, alerts: &mut Vec<Alert>) {
    if !has_use_server_pragma(&file.text) {
        return;
    }

    for caps in regex_export_async_fn().captures_iter(&file.text) {
        let whole = caps.get(0).expect("match present");
        let name = caps
            .name("name")
            .map(|m| m.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("<anonymous>");
        let line_no = file.text[..whole.start()].matches('\n').count() + 1;

        let body = body_brace_index(&file.text, whole.end()).and_then(|open| {
            find_matching_brace(&file.text, open).map(|close| &file.text[open..=close])
        });
        let Some(body) = body else {
            continue;
        };

        let lowered = body.to_lowercase();
        let validated = VALIDATION_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker))
            || regex_typeof_check().is_match(body);
        if !validated {
            alerts.push(
                Alert::new(
                    Severity::Critical,
                    "react2shell",
                    MODULE,
                    format!("Server action '{name}' accepts unvalidated input"),
                    file.rel_path.clone(),
                )
                .at_line(line_no)
                .suggest(format!("Validate the arguments of '{name}' (e.g. with zod) before use")),
            );
        }
    }
}

/// True iff the first real line of the file is the `"use server"` pragma.
fn has_use_server_pragma(text: &str) -> bool {
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_comment_line(trimmed) {
            continue;
        }
        let statement = trimmed.trim_end_matches(';');
        return statement == "\"use server\"" || statement == "'use server'";
    }
    false
}

async fn check_scorecards(ctx: &ModuleContext<'_>, alerts: &mut Vec<Alert>) {
    let min_score = ctx.config.supply_chain.min_scorecard_score;

    for file in ctx.files.iter().filter(|f| f.record.is_manifest) {
        for dep in parse_manifest(&file.record.path, &file.text) {
            if ctx.cancel.is_cancelled() {
                return;
            }
            let info = match ctx.registry.info(&dep.name, dep.registry).await {
                Ok(Some(info)) => info,
                Ok(None) => continue,
                Err(err) => {
                    tracing::debug!(name = %dep.name, %err, "registry info failed, skipping scorecard");
                    continue;
                }
            };
            let Some(repo_url) = info.repository_url else {
                continue;
            };
            let scorecard = match ctx.scorecard.fetch(&repo_url).await {
                Ok(Some(scorecard)) => scorecard,
                Ok(None) => continue,
                Err(err) => {
                    tracing::debug!(name = %dep.name, %err, "scorecard fetch failed, skipping");
                    continue;
                }
            };
            if scorecard.score < min_score {
                alerts.push(
                    Alert::new(
                        Severity::Medium,
                        "low-scorecard-score",
                        MODULE,
                        format!(
                            "Dependency '{}' scores {:.1}/10 on its security scorecard (minimum: {:.1})",
                            dep.name, scorecard.score, min_score
                        ),
                        file.rel_path.clone(),
                    )
                    .suggest(format!(
                        "Review {repo_url} for maintenance and security posture before depending on it"
                    )),
                );
            }
        }
    }
}
