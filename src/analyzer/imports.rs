//! Best-effort import/export extraction.
//!
//! Deliberately regex-based rather than AST-based: the import graph must
//! still come out of files the parser cannot fully digest. For Vue/Svelte
//! the extraction runs over the component's script block.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ast::extract_script_block;
use crate::types::Language;

use super::regexes::{regex_js_export, regex_js_import, regex_js_require, regex_py_from_import};

/// The namespace symbol: `import * as ns` and `require(..)` record this.
pub const NAMESPACE_SYMBOL: &str = "*";

/// The default-binding symbol.
pub const DEFAULT_SYMBOL: &str = "default";

/// Per-file import/export record; one graph vertex.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ImportNode {
    /// Path relative to the scan root.
    pub path: String,
    /// Raw import specifiers, in source order, deduplicated.
    pub imports: Vec<String>,
    /// Raw specifier -> imported symbols (`*` = whole namespace,
    /// `default` = default binding).
    pub symbols: BTreeMap<String, BTreeSet<String>>,
    /// Exported symbol names, in source order.
    pub exports: Vec<String>,
    /// The name bound by `export default <decl> Name`, when present.
    pub default_export: Option<String>,
}

/// True for specifiers that can resolve inside the project.
pub fn is_local_specifier(spec: &str) -> bool {
    spec.starts_with('.') || spec.starts_with("@/")
}

/// Extract the import node for one source file.
pub fn extract_import_node(path: &str, language: Language, text: &str) -> ImportNode {
    let mut node = ImportNode {
        path: path.to_string(),
        ..ImportNode::default()
    };

    match language {
        Language::Javascript | Language::Typescript => extract_js(&mut node, text),
        Language::Vue | Language::Svelte => {
            if let Some(block) = extract_script_block(text) {
                extract_js(&mut node, &block.text);
            }
        }
        Language::Python => extract_py(&mut node, text),
        _ => {}
    }
    node
}

fn record_import(node: &mut ImportNode, spec: &str, symbols: impl IntoIterator<Item = String>) {
    if !node.imports.iter().any(|existing| existing == spec) {
        node.imports.push(spec.to_string());
    }
    if is_local_specifier(spec) {
        node.symbols
            .entry(spec.to_string())
            .or_default()
            .extend(symbols);
    }
}

fn extract_js(node: &mut ImportNode, text: &str) {
    for caps in regex_js_import().captures_iter(text) {
        let spec = &caps["spec"];
        let symbols = match caps.name("clause") {
            Some(clause) => classify_js_clause(clause.as_str()),
            // Side-effect import: edge without named symbols.
            None => Vec::new(),
        };
        record_import(node, spec, symbols);
    }

    for caps in regex_js_require().captures_iter(text) {
        record_import(node, &caps["spec"], [NAMESPACE_SYMBOL.to_string()]);
    }

    for caps in regex_js_export().captures_iter(text) {
        let name = caps["name"].to_string();
        if caps.name("default").is_some() {
            node.default_export = Some(name.clone());
        }
        if !node.exports.contains(&name) {
            node.exports.push(name);
        }
    }
}

/// Classify an import clause into the symbols it binds.
///
/// `* as ns` -> `*`; `{A, B as C, type D}` -> left-hand names with any
/// `type` prefix dropped; anything else is the default binding. A combined
/// clause (`Default, {A}`) records both.
fn classify_js_clause(clause: &str) -> Vec<String> {
    let clause = clause.trim();
    let mut symbols = Vec::new();

    if clause.starts_with('*') {
        symbols.push(NAMESPACE_SYMBOL.to_string());
        return symbols;
    }

    let (head, braces) = match clause.find('{') {
        Some(open) => {
            let close = clause
                .rfind('}')
                .filter(|&close| close > open)
                .unwrap_or(clause.len());
            (&clause[..open], Some(&clause[open + 1..close]))
        }
        None => (clause, None),
    };

    if let Some(named) = braces {
        for part in named.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let part = part.strip_prefix("type ").unwrap_or(part).trim();
            // Keep the exported (left-hand) name of `A as B`.
            let name = part.split_whitespace().next().unwrap_or(part);
            if !name.is_empty() {
                symbols.push(name.to_string());
            }
        }
    }

    // A `type`-only clause binds no default; `import type { A } from 'x'`.
    let head = head.trim().trim_end_matches(',').trim();
    if !head.is_empty() && head != "type" {
        symbols.push(DEFAULT_SYMBOL.to_string());
    } else if head.is_empty() && braces.is_none() {
        symbols.push(DEFAULT_SYMBOL.to_string());
    }

    symbols
}

fn extract_py(node: &mut ImportNode, text: &str) {
    for caps in regex_py_from_import().captures_iter(text) {
        let module = &caps["module"];
        if !module.starts_with('.') {
            continue;
        }
        let names = caps["names"].split('#').next().unwrap_or("");
        let mut symbols = Vec::new();
        for part in names.split(',') {
            let part = part.trim().trim_matches(|c| c == '(' || c == ')').trim();
            if part.is_empty() {
                continue;
            }
            // Keep the source-module name of `A as B`.
            let name = part.split_whitespace().next().unwrap_or(part);
            symbols.push(name.to_string());
        }
        record_import(node, module, symbols);
    }
}
