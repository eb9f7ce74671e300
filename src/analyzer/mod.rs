//! The rule engine.
//!
//! Five rule modules run in fixed registration order — hallucination,
//! laziness, security, architecture, cost — each consuming the shared
//! per-file working set and emitting [`Alert`]s. The coordinator in
//! [`runner`] drives them and assembles the final report.
//!
//! # Submodules
//!
//! - [`imports`] - Regex-based import/export extraction (JS/TS, Python)
//! - [`resolvers`] - Raw import specifier -> file resolution
//! - [`graph`] - Cross-file import graph
//! - [`cycles`] - Tarjan SCC over the resolved graph
//! - [`regexes`] - Shared compiled patterns
//! - [`hallucination`], [`laziness`], [`security`], [`architecture`],
//!   [`cost`] - The rule modules
//! - [`runner`] - Coordinator: orchestration, dedup, scoring

pub mod architecture;
pub mod cost;
pub mod cycles;
pub mod graph;
pub mod hallucination;
pub mod imports;
pub mod laziness;
pub mod regexes;
pub mod resolvers;
pub mod runner;
pub mod security;
pub mod textscan;

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::ast::ParsedSource;
use crate::config::Config;
use crate::registry::PackageLookup;
use crate::scorecard::ScorecardClient;
use crate::types::{Alert, FileRecord};

use graph::ImportGraph;

/// A scanned file with its content loaded and, where supported, parsed.
pub struct SourceFile {
    pub record: FileRecord,
    /// Path relative to the scan root, forward-slashed; the `file` field of
    /// every alert about this file.
    pub rel_path: String,
    pub text: String,
    /// Present for languages with AST support whose text produced a tree.
    pub parsed: Option<ParsedSource>,
}

impl SourceFile {
    pub fn new(record: FileRecord, rel_path: String, text: String) -> Self {
        let parsed = if record.is_source {
            ParsedSource::parse(record.language, &text)
        } else {
            None
        };
        Self {
            record,
            rel_path,
            text,
            parsed,
        }
    }
}

/// Everything a rule module may consult during a run.
pub struct ModuleContext<'a> {
    pub root: &'a Path,
    pub files: &'a [SourceFile],
    pub config: &'a Config,
    pub registry: &'a dyn PackageLookup,
    pub scorecard: &'a ScorecardClient,
    /// Top-package table for typosquat comparison, already truncated to
    /// the configured count.
    pub top_packages: &'a [String],
    /// Fully constructed before any module runs; read-only thereafter.
    pub graph: &'a ImportGraph,
    pub cancel: &'a CancellationToken,
}

/// Capability set of one rule module.
#[async_trait]
pub trait RuleModule: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_enabled(&self, config: &Config) -> bool;

    /// Emit alerts for this run. Modules isolate their own failures: a
    /// registry error or unparseable file is logged and produces no alert,
    /// never an abort.
    async fn analyze(&self, ctx: &ModuleContext<'_>) -> Vec<Alert>;
}

/// The five modules in registration order.
pub fn default_modules() -> Vec<Box<dyn RuleModule>> {
    vec![
        Box::new(hallucination::HallucinationModule),
        Box::new(laziness::LazinessModule),
        Box::new(security::SecurityModule),
        Box::new(architecture::ArchitectureModule),
        Box::new(cost::CostModule),
    ]
}
