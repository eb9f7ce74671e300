//! Laziness detection: AI preambles, placeholder comments, over-commented
//! files, hollow functions, mock implementations, and silently swallowed
//! errors.
//!
//! Regex checks run on the raw text so they keep working on files the
//! parser cannot digest; AST checks run only where a tree is available.

use async_trait::async_trait;
use regex::Regex;

use crate::ast::{AstNode, ParsedSource};
use crate::config::Config;
use crate::types::{Alert, Language, Severity};

use super::regexes::ai_preamble_regexes;
use super::{ModuleContext, RuleModule, SourceFile};

const MODULE: &str = "laziness";

/// Substrings that count as "the error was logged" inside a handler body.
const LOGGING_MARKERS: &[&str] = &[
    "console.log",
    "console.error",
    "console.warn",
    "logger.",
    "log.",
    "logging.",
    "sentry.",
    "logrocket.",
    "bugsnag.",
    "rollbar.",
    "print(",
    ".error(",
    ".warn(",
    ".info(",
    ".debug(",
];

const JS_FUNCTION_KINDS: &[&str] = &["function_declaration", "arrow_function", "function_expression"];
const PY_FUNCTION_KINDS: &[&str] = &["function_definition"];

pub struct LazinessModule;

#[async_trait]
impl RuleModule for LazinessModule {
    fn name(&self) -> &'static str {
        MODULE
    }

    fn is_enabled(&self, config: &Config) -> bool {
        config.modules.laziness
    }

    async fn analyze(&self, ctx: &ModuleContext<'_>) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let placeholder_patterns = compile_placeholder_patterns(&ctx.config.laziness.patterns);

        for file in ctx.files.iter().filter(|f| f.record.is_source) {
            if ctx.cancel.is_cancelled() {
                break;
            }
            check_text(ctx.config, file, &placeholder_patterns, &mut alerts);
            if let Some(parsed) = &file.parsed {
                check_tree(ctx.config, file, parsed, &mut alerts);
            }
        }
        alerts
    }
}

fn compile_placeholder_patterns(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(&format!("(?i){pattern}")) {
            Ok(re) => Some(re),
            Err(err) => {
                tracing::warn!(pattern, %err, "invalid placeholder pattern, skipping");
                None
            }
        })
        .collect()
}

// --- Text checks ---

fn check_text(config: &Config, file: &SourceFile, placeholders: &[Regex], alerts: &mut Vec<Alert>) {
    let laziness = &config.laziness;

    for (idx, line) in file.text.lines().enumerate() {
        if laziness.detect_ai_preambles
            && ai_preamble_regexes().iter().any(|re| re.is_match(line))
        {
            alerts.push(
                Alert::new(
                    Severity::Medium,
                    "ai-preamble",
                    MODULE,
                    "Conversational AI preamble left in source".to_string(),
                    file.rel_path.clone(),
                )
                .at_line(idx + 1)
                .suggest("Delete the chat narration; keep only the code"),
            );
        }
        if laziness.detect_placeholder_comments
            && placeholders.iter().any(|re| re.is_match(line))
        {
            alerts.push(
                Alert::new(
                    Severity::High,
                    "placeholder-comment",
                    MODULE,
                    format!("Placeholder comment: {}", line.trim()),
                    file.rel_path.clone(),
                )
                .at_line(idx + 1)
                .suggest("Replace the placeholder with a real implementation"),
            );
        }
    }

    if laziness.detect_over_commenting {
        check_comment_density(config, file, alerts);
    }
}

fn is_test_file(basename: &str) -> bool {
    basename.contains(".test.")
        || basename.contains(".spec.")
        || basename.starts_with("test_")
        || basename.ends_with("_test.py")
}

fn is_comment_line(trimmed: &str) -> bool {
    trimmed.starts_with("//")
        || trimmed.starts_with('#')
        || trimmed.starts_with('*')
        || trimmed.starts_with("/*")
        || trimmed.ends_with("*/")
}

fn check_comment_density(config: &Config, file: &SourceFile, alerts: &mut Vec<Alert>) {
    let basename = file
        .record
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let is_test = is_test_file(basename);
    let threshold = if is_test {
        0.40
    } else {
        config.laziness.comment_density_threshold
    };

    let mut non_blank = 0usize;
    let mut comments = 0usize;
    for line in file.text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        non_blank += 1;
        if is_test && (trimmed.starts_with("\"\"\"") || trimmed.starts_with("'''")) {
            continue;
        }
        if is_comment_line(trimmed) {
            comments += 1;
        }
    }

    if non_blank < 5 {
        return;
    }
    let density = comments as f64 / non_blank as f64;
    if density > threshold {
        alerts.push(
            Alert::new(
                Severity::Low,
                "over-commenting",
                MODULE,
                format!(
                    "{:.0}% of non-blank lines are comments (threshold: {:.0}%)",
                    density * 100.0,
                    threshold * 100.0
                ),
                file.rel_path.clone(),
            )
            .suggest("Heavy narration often hides generated code; trim comments that restate the code"),
        );
    }
}

// --- Tree checks ---

fn check_tree(config: &Config, file: &SourceFile, parsed: &ParsedSource, alerts: &mut Vec<Alert>) {
    let is_python = file.record.language == Language::Python;
    let function_kinds = if is_python {
        PY_FUNCTION_KINDS
    } else {
        JS_FUNCTION_KINDS
    };

    if config.laziness.detect_hollow_functions || config.laziness.detect_mock_implementations {
        for node in parsed.find_kinds(function_kinds) {
            if config.laziness.detect_hollow_functions
                && let Some(body) = hollow_body(&node, is_python)
            {
                let name = function_name(&node).unwrap_or_else(|| "<anonymous>".to_string());
                alerts.push(
                    Alert::new(
                        Severity::High,
                        "hollow-function",
                        MODULE,
                        format!("Function '{name}' has no real implementation"),
                        file.rel_path.clone(),
                    )
                    .at_line(parsed.line_of(&body))
                    .suggest(format!("Implement '{name}' or remove it")),
                );
            }
            if config.laziness.detect_mock_implementations {
                check_mock_implementation(config, file, parsed, &node, is_python, alerts);
            }
        }
    }

    if config.laziness.detect_unlogged_errors {
        let handler_kind = if is_python {
            "except_clause"
        } else {
            "catch_clause"
        };
        for node in parsed.find_kinds(&[handler_kind]) {
            let body = handler_body(&node);
            let text = body
                .as_ref()
                .map(|b| b.text().to_lowercase())
                .unwrap_or_default();
            if !LOGGING_MARKERS.iter().any(|marker| text.contains(marker)) {
                let anchor = body.as_ref().unwrap_or(&node);
                alerts.push(
                    Alert::new(
                        Severity::Medium,
                        "unlogged-error",
                        MODULE,
                        "Caught error is neither logged nor reported".to_string(),
                        file.rel_path.clone(),
                    )
                    .at_line(parsed.line_of(anchor))
                    .suggest("Log the error or rethrow it; silent catches hide failures"),
                );
            }
        }
    }
}

/// Punctuation kinds that never count as body content.
fn is_structural_kind(kind: &str) -> bool {
    matches!(kind, "{" | "}" | ":" | ";" | "," | "comment")
}

/// If the function body is hollow, return the body node for anchoring.
fn hollow_body<'a>(node: &AstNode<'a>, is_python: bool) -> Option<AstNode<'a>> {
    let body = node.field("body")?;
    if is_python {
        if body.kind().as_ref() != "block" {
            return None;
        }
        let hollow = body.children().all(|child| {
            let kind = child.kind();
            is_structural_kind(kind.as_ref())
                || kind.as_ref() == "pass_statement"
                || is_docstring_statement(&child)
        });
        return hollow.then_some(body);
    }

    // Arrow functions with expression bodies always compute something.
    if body.kind().as_ref() != "statement_block" {
        return None;
    }
    let hollow = body.children().all(|child| {
        let kind = child.kind();
        is_structural_kind(kind.as_ref()) || is_trivial_return(&child)
    });
    hollow.then_some(body)
}

fn is_docstring_statement(node: &AstNode<'_>) -> bool {
    if node.kind().as_ref() != "expression_statement" {
        return false;
    }
    let meaningful: Vec<_> = node
        .children()
        .filter(|child| !is_structural_kind(child.kind().as_ref()))
        .collect();
    meaningful.len() == 1 && meaningful[0].kind().as_ref() == "string"
}

/// `return;`, `return null;`, `return undefined;` carry no implementation.
fn is_trivial_return(node: &AstNode<'_>) -> bool {
    if node.kind().as_ref() != "return_statement" {
        return false;
    }
    let normalized: String = node.text().split_whitespace().collect::<Vec<_>>().join(" ");
    let value = normalized
        .trim_start_matches("return")
        .trim()
        .trim_end_matches(';')
        .trim();
    matches!(value, "" | "null" | "undefined")
}

/// Name of a function node; arrows look through their variable declarator.
fn function_name(node: &AstNode<'_>) -> Option<String> {
    if let Some(name) = node.field("name") {
        return Some(name.text().to_string());
    }
    let parent = node.parent()?;
    if parent.kind().as_ref() == "variable_declarator"
        && let Some(name) = parent.field("name")
    {
        return Some(name.text().to_string());
    }
    None
}

fn check_mock_implementation(
    config: &Config,
    file: &SourceFile,
    parsed: &ParsedSource,
    node: &AstNode<'_>,
    is_python: bool,
    alerts: &mut Vec<Alert>,
) {
    let Some(name) = function_name(node) else {
        return;
    };
    let lowered = name.to_lowercase();
    let prefixed = config
        .laziness
        .mock_name_prefixes
        .iter()
        .any(|prefix| lowered.starts_with(&prefix.to_lowercase()));
    if !prefixed {
        return;
    }

    let Some(body) = node.field("body") else {
        return;
    };
    let body_text = body.text().to_lowercase();
    let mocked = if is_python {
        body_text.contains("time.sleep") || body_text.contains("sleep(")
    } else {
        body_text.contains("settimeout(") || body_text.contains("sleep(")
    };
    if mocked {
        alerts.push(
            Alert::new(
                Severity::High,
                "mock-implementation",
                MODULE,
                format!("'{name}' looks like a mock: it delays instead of computing"),
                file.rel_path.clone(),
            )
            .at_line(parsed.line_of(node))
            .suggest(format!("Replace the artificial delay in '{name}' with a real implementation")),
        );
    }
}

/// Body of a catch/except clause.
fn handler_body<'a>(node: &AstNode<'a>) -> Option<AstNode<'a>> {
    if let Some(body) = node.field("body") {
        return Some(body);
    }
    node.children()
        .filter(|child| matches!(child.kind().as_ref(), "block" | "statement_block"))
        .last()
}
