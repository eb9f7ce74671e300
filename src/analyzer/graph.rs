//! The cross-file import graph.
//!
//! Vertices are root-relative file paths; edges carry the raw import
//! specifier they came from. Construction is deterministic with respect to
//! the input file order, and resolution of a raw specifier to another
//! vertex happens lazily on the consumer side (third-party specifiers
//! simply resolve to nothing).

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::types::Language;

use super::imports::{ImportNode, NAMESPACE_SYMBOL, extract_import_node, is_local_specifier};
use super::resolvers::resolve_specifier;

/// One directed edge: importing vertex index + raw specifier.
#[derive(Clone, Debug)]
pub struct ImportEdge {
    pub from: usize,
    pub raw: String,
}

#[derive(Default)]
pub struct ImportGraph {
    nodes: Vec<ImportNode>,
    index: HashMap<String, usize>,
    edges: Vec<ImportEdge>,
}

impl ImportGraph {
    /// Build the graph from `(relative path, language, text)` triples, in
    /// input order. Every file becomes exactly one vertex.
    pub fn build(files: &[(String, Language, &str)]) -> Self {
        let mut graph = ImportGraph::default();
        for (path, language, text) in files {
            let node = extract_import_node(path, *language, text);
            let idx = graph.nodes.len();
            if graph.index.contains_key(path) {
                continue;
            }
            graph.index.insert(path.clone(), idx);
            // An edge exists only because the node's import list carries
            // the raw path; bare third-party specifiers never become edges.
            for raw in &node.imports {
                if is_local_specifier(raw) {
                    graph.edges.push(ImportEdge {
                        from: idx,
                        raw: raw.clone(),
                    });
                }
            }
            graph.nodes.push(node);
        }
        graph
    }

    pub fn nodes(&self) -> &[ImportNode] {
        &self.nodes
    }

    pub fn node(&self, path: &str) -> Option<&ImportNode> {
        self.index.get(path).map(|&idx| &self.nodes[idx])
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolve every edge against the vertex set, yielding `(from, to)`
    /// pairs of relative paths. Unresolvable edges are dropped.
    pub fn resolved_edges(&self) -> Vec<(String, String)> {
        let known = |candidate: &str| self.index.contains_key(candidate);
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for edge in &self.edges {
            let from = &self.nodes[edge.from].path;
            if let Some(to) = resolve_specifier(from, &edge.raw, &known)
                && seen.insert((edge.from, to.clone()))
            {
                out.push((from.clone(), to));
            }
        }
        out
    }

    /// Union of imported symbols per resolvable target path. A namespace
    /// import (`*`) is carried through so consumers can treat every export
    /// of that target as used.
    pub fn imported_symbols_by_target(&self) -> BTreeMap<String, BTreeSet<String>> {
        let known = |candidate: &str| self.index.contains_key(candidate);
        let mut out: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for node in &self.nodes {
            for (raw, symbols) in &node.symbols {
                let Some(target) = resolve_specifier(&node.path, raw, &known) else {
                    continue;
                };
                let entry = out.entry(target).or_default();
                if symbols.is_empty() {
                    // Side-effect import: the edge exists but binds nothing.
                    continue;
                }
                entry.extend(symbols.iter().cloned());
            }
        }
        out
    }

    /// True iff the union for `target` marks every export used.
    pub fn target_fully_used(symbols: &BTreeSet<String>) -> bool {
        symbols.contains(NAMESPACE_SYMBOL)
    }
}
