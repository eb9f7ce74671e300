//! Architectural rules: oversized functions, mixed naming conventions,
//! magic numbers, circular dependencies, and unused exports.
//!
//! The per-file checks are text-based (with string spans masked through the
//! tokenizer in [`super::textscan`]) so they keep working on files the
//! parser cannot fully digest; the cross-file checks read the import graph
//! built before any module runs.

use async_trait::async_trait;

use crate::config::Config;
use crate::types::{Alert, Language, Severity};

use super::cycles::find_cycles;
use super::regexes::{
    regex_const_decl_prefix, regex_decision_keyword, regex_go_function_head, regex_identifier,
    regex_interface_head, regex_js_arrow_head, regex_js_function_head, regex_number_literal,
    regex_py_const_assignment, regex_py_function_head, regex_rust_function_head,
    regex_type_alias_line,
};
use super::textscan::{body_brace_index, find_matching_brace, mask_strings};
use super::{ModuleContext, RuleModule, SourceFile};

const MODULE: &str = "architecture";

/// Numbers that never count as magic.
const SAFE_NUMBERS: &[f64] = &[0.0, 1.0, 2.0, 10.0, 100.0, -1.0];

/// Files whose exports are reachable from outside the graph.
const ENTRYPOINT_BASENAMES: &[&str] = &["index.ts", "index.js", "main.ts", "App.tsx"];

pub struct ArchitectureModule;

#[async_trait]
impl RuleModule for ArchitectureModule {
    fn name(&self) -> &'static str {
        MODULE
    }

    fn is_enabled(&self, config: &Config) -> bool {
        config.modules.architecture
    }

    async fn analyze(&self, ctx: &ModuleContext<'_>) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let architecture = &ctx.config.architecture;

        for file in ctx.files.iter().filter(|f| f.record.is_source) {
            if ctx.cancel.is_cancelled() {
                return alerts;
            }
            check_god_functions(ctx.config, file, &mut alerts);
            if architecture.detect_mixed_naming
                && matches!(
                    file.record.language,
                    Language::Javascript | Language::Typescript
                )
            {
                check_mixed_naming(file, &mut alerts);
            }
            if architecture.detect_magic_numbers {
                check_magic_numbers(file, &mut alerts);
            }
        }

        if architecture.detect_circular_dependencies {
            check_cycles(ctx, &mut alerts);
        }
        if architecture.detect_unused_exports {
            check_unused_exports(ctx, &mut alerts);
        }
        alerts
    }
}

// --- god-function ---

struct FunctionSpan {
    name: String,
    head_line: usize,
    body_lines: usize,
    complexity: u32,
}

fn check_god_functions(config: &Config, file: &SourceFile, alerts: &mut Vec<Alert>) {
    let spans = match file.record.language {
        Language::Javascript | Language::Typescript => scan_brace_functions(
            &file.text,
            &[regex_js_function_head(), regex_js_arrow_head()],
        ),
        Language::Rust => scan_brace_functions(&file.text, &[regex_rust_function_head()]),
        Language::Go => scan_brace_functions(&file.text, &[regex_go_function_head()]),
        Language::Python => scan_indent_functions(&file.text),
        _ => Vec::new(),
    };

    let complexity_threshold = config.architecture.cyclomatic_complexity_threshold;
    let loc_threshold = config.architecture.lines_of_code_threshold;
    for span in spans {
        if span.complexity > complexity_threshold && span.body_lines > loc_threshold {
            alerts.push(
                Alert::new(
                    Severity::High,
                    "god-function",
                    MODULE,
                    format!(
                        "Function '{}' spans {} lines with cyclomatic complexity {}",
                        span.name, span.body_lines, span.complexity
                    ),
                    file.rel_path.clone(),
                )
                .at_line(span.head_line)
                .suggest(format!(
                    "Split '{}' into smaller functions with single responsibilities",
                    span.name
                )),
            );
        }
    }
}

/// Brace-delimited languages: find heads by regex, then measure the body by
/// matching braces over the string-masked text.
fn scan_brace_functions(text: &str, heads: &[&regex::Regex]) -> Vec<FunctionSpan> {
    let masked = mask_strings(text);
    let mut spans = Vec::new();

    for head in heads {
        for caps in head.captures_iter(&masked) {
            let whole = caps.get(0).expect("match present");
            let name = caps
                .name("name")
                .map(|m| m.as_str())
                .filter(|n| !n.is_empty())
                .unwrap_or("<anonymous>")
                .to_string();

            let Some(open) = body_brace_index(&masked, whole.start()) else {
                continue;
            };
            let Some(close) = find_matching_brace(&masked, open) else {
                continue;
            };
            let head_line = masked[..whole.start()].matches('\n').count() + 1;
            let close_line = masked[..close].matches('\n').count() + 1;
            let body = &masked[open..=close];

            spans.push(FunctionSpan {
                name,
                head_line,
                body_lines: close_line - head_line + 1,
                complexity: cyclomatic_complexity(body),
            });
        }
    }
    spans
}

/// Python: the body is every following line indented deeper than the `def`.
fn scan_indent_functions(text: &str) -> Vec<FunctionSpan> {
    let masked = mask_strings(text);
    let lines: Vec<&str> = masked.lines().collect();
    let mut spans = Vec::new();

    for caps in regex_py_function_head().captures_iter(&masked) {
        let whole = caps.get(0).expect("match present");
        let indent = caps.name("indent").map(|m| m.as_str().len()).unwrap_or(0);
        let name = caps["name"].to_string();
        let head_idx = masked[..whole.start()].matches('\n').count();

        let mut end_idx = head_idx;
        for (idx, line) in lines.iter().enumerate().skip(head_idx + 1) {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let line_indent = line.len() - line.trim_start().len();
            if line_indent <= indent {
                break;
            }
            end_idx = idx;
        }
        if end_idx == head_idx {
            continue;
        }

        let body = lines[head_idx + 1..=end_idx].join("\n");
        spans.push(FunctionSpan {
            name,
            head_line: head_idx + 1,
            body_lines: end_idx - head_idx,
            complexity: cyclomatic_complexity(&body),
        });
    }
    spans
}

/// 1 + decision tokens (branch keywords, `&&`, `||`, ternaries).
fn cyclomatic_complexity(masked_body: &str) -> u32 {
    let keywords = regex_decision_keyword().find_iter(masked_body).count();
    let ands = masked_body.matches("&&").count();
    let ors = masked_body.matches("||").count();
    let ternaries = count_ternaries(masked_body);
    1 + (keywords + ands + ors + ternaries) as u32
}

/// `cond ? a : b` per line; `?.` and `??` are not ternaries.
fn count_ternaries(text: &str) -> usize {
    let mut total = 0;
    for line in text.lines() {
        let bytes = line.as_bytes();
        let mut idx = 0;
        while idx < bytes.len() {
            if bytes[idx] == b'?' {
                let next = bytes.get(idx + 1);
                if matches!(next, Some(b'?') | Some(b'.')) {
                    idx += 2;
                    continue;
                }
                if line[idx + 1..].contains(':') {
                    total += 1;
                }
            }
            idx += 1;
        }
    }
    total
}

// --- mixed-naming ---

fn is_camel_case(ident: &str) -> bool {
    let mut chars = ident.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_lowercase()
        && !ident.contains('_')
        && ident.chars().any(|c| c.is_ascii_uppercase())
}

fn is_snake_case(ident: &str) -> bool {
    let Some(first) = ident.chars().next() else {
        return false;
    };
    first.is_ascii_lowercase()
        && ident.contains('_')
        && !ident.chars().any(|c| c.is_ascii_uppercase())
}

fn check_mixed_naming(file: &SourceFile, alerts: &mut Vec<Alert>) {
    let masked = mask_strings(&file.text);
    let mut interface_depth: Option<i64> = None;

    for (idx, line) in masked.lines().enumerate() {
        let opens = line.matches('{').count() as i64;
        let closes = line.matches('}').count() as i64;

        if let Some(depth) = interface_depth.as_mut() {
            *depth += opens - closes;
            if *depth <= 0 {
                interface_depth = None;
            }
            continue;
        }
        if regex_interface_head().is_match(line) {
            let depth = opens - closes;
            if depth > 0 {
                interface_depth = Some(depth);
            }
            continue;
        }
        // Single-line type aliases carry backend field names by design.
        if regex_type_alias_line().is_match(line) {
            continue;
        }
        if line.trim_start().starts_with("//") {
            continue;
        }

        let mut has_camel = false;
        let mut has_snake = false;
        for ident in regex_identifier().find_iter(line) {
            let ident = ident.as_str();
            has_camel |= is_camel_case(ident);
            has_snake |= is_snake_case(ident);
        }
        if has_camel && has_snake {
            alerts.push(
                Alert::new(
                    Severity::Medium,
                    "mixed-naming",
                    MODULE,
                    "camelCase and snake_case mixed on one line".to_string(),
                    file.rel_path.clone(),
                )
                .at_line(idx + 1)
                .suggest("Pick one convention per layer; map external field names at the boundary"),
            );
        }
    }
}

// --- magic-number ---

fn check_magic_numbers(file: &SourceFile, alerts: &mut Vec<Alert>) {
    let masked = mask_strings(&file.text);
    let language = file.record.language;
    let mut in_paren_block = false;

    for (idx, line) in masked.lines().enumerate() {
        let trimmed = line.trim_start();

        // Go-style grouped declarations: `const (` / `var (` / `import (`.
        if in_paren_block {
            if trimmed.starts_with(')') {
                in_paren_block = false;
            }
            continue;
        }
        if trimmed.starts_with("const (") || trimmed.starts_with("var (") || trimmed.starts_with("import (") {
            in_paren_block = true;
            continue;
        }

        if trimmed.is_empty() || is_comment_line(trimmed) || is_import_line(trimmed, language) {
            continue;
        }
        if regex_const_decl_prefix().is_match(line) {
            continue;
        }
        if language == Language::Python && regex_py_const_assignment().is_match(line) {
            continue;
        }

        for caps in regex_number_literal().captures_iter(line) {
            let num = caps.name("num").expect("group present");
            let raw = num.as_str();
            // Hex/binary/octal literals are addresses, masks, and modes,
            // not tuning constants.
            if raw.contains(['x', 'X', 'b', 'B', 'o', 'O']) {
                continue;
            }
            let Ok(value) = raw.replace('_', "").parse::<f64>() else {
                continue;
            };
            if SAFE_NUMBERS.contains(&value) {
                continue;
            }
            alerts.push(
                Alert::new(
                    Severity::Low,
                    "magic-number",
                    MODULE,
                    format!("Magic number {raw}"),
                    file.rel_path.clone(),
                )
                .at(idx + 1, num.start() + 1)
                .suggest(format!("Name {raw} as a constant to document its meaning")),
            );
        }
    }
}

fn is_comment_line(trimmed: &str) -> bool {
    trimmed.starts_with("//")
        || trimmed.starts_with('#')
        || trimmed.starts_with('*')
        || trimmed.starts_with("/*")
}

fn is_import_line(trimmed: &str, language: Language) -> bool {
    // `export const x = 9` is exempted by the constant-declaration check,
    // not here; an exported function body is still scanned.
    match language {
        Language::Python => trimmed.starts_with("import ") || trimmed.starts_with("from "),
        Language::Rust => trimmed.starts_with("use "),
        _ => trimmed.starts_with("import "),
    }
}

// --- cross-file ---

fn check_cycles(ctx: &ModuleContext<'_>, alerts: &mut Vec<Alert>) {
    let edges = ctx.graph.resolved_edges();
    for cycle in find_cycles(&edges) {
        let anchor = cycle.first().expect("cycles have members").clone();
        let mut path = cycle.join(" -> ");
        path.push_str(&format!(" -> {anchor}"));
        alerts.push(
            Alert::new(
                Severity::High,
                "circular-dependency",
                MODULE,
                format!("Circular import: {path}"),
                anchor,
            )
            .suggest("Break the cycle by extracting the shared pieces into their own module"),
        );
    }
}

fn check_unused_exports(ctx: &ModuleContext<'_>, alerts: &mut Vec<Alert>) {
    let unions = ctx.graph.imported_symbols_by_target();

    for node in ctx.graph.nodes() {
        let basename = node.path.rsplit('/').next().unwrap_or(&node.path);
        if ENTRYPOINT_BASENAMES.contains(&basename) {
            continue;
        }
        let imported = unions.get(&node.path);
        let namespace_used = imported.is_some_and(super::graph::ImportGraph::target_fully_used);
        if namespace_used {
            continue;
        }

        for export in &node.exports {
            let used_by_name = imported.is_some_and(|set| set.contains(export));
            let used_as_default = node.default_export.as_deref() == Some(export)
                && imported.is_some_and(|set| set.contains(super::imports::DEFAULT_SYMBOL));
            if used_by_name || used_as_default {
                continue;
            }
            alerts.push(
                Alert::new(
                    Severity::Low,
                    "unused-export",
                    MODULE,
                    format!("Exported symbol '{export}' is never imported"),
                    node.path.clone(),
                )
                .suggest(format!("Delete '{export}' or stop exporting it")),
            );
        }
    }
}
