//! # codevet
//!
//! Static analysis core for catching the hallmarks of careless or
//! AI-assisted code generation in mixed-language source trees
//! (JavaScript, TypeScript, Python, Rust, Go, Vue/Svelte).
//!
//! ## What it finds
//!
//! - **Hallucinations** - dependencies that don't exist on their registry,
//!   newborn packages, typosquat-distance names
//! - **Laziness** - AI chat preambles, placeholder comments, hollow
//!   functions, mock implementations, silently swallowed errors
//! - **Security** - hardcoded secrets, insecure deserialization,
//!   unvalidated server actions, JWT misuse, unguarded destructive
//!   operations, hardcoded production URLs
//! - **Architecture** - god functions, mixed naming, magic numbers,
//!   circular imports, unused exports
//! - **Cost** - expensive vendor APIs in unthrottled loops or without a
//!   cache in front of them
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use codevet::{Config, analyze};
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), codevet::AnalyzeError> {
//! let report = analyze(Path::new("."), Config::default()).await?;
//! println!("score: {:.1}, alerts: {}", report.summary.score, report.summary.total);
//! # Ok(())
//! # }
//! ```
//!
//! Results are heuristic and advisory; the pipeline is neither a type
//! checker nor a full linter, and it claims no soundness or completeness.
//! Report formatting, CLI handling, and configuration loading are the
//! caller's concern — this crate takes a [`Config`] value and returns a
//! [`Report`] value.

/// The rule engine: import graph, cycles, the five rule modules, and the
/// coordinator.
///
/// # Submodules
///
/// - [`analyzer::hallucination`] - Phantom/newborn/typosquat dependency checks
/// - [`analyzer::laziness`] - Placeholder and hollow-implementation checks
/// - [`analyzer::security`] - Secret, deserialization, and env-guard checks
/// - [`analyzer::architecture`] - Complexity, naming, magic-number, graph checks
/// - [`analyzer::cost`] - Expensive-API usage checks
/// - [`analyzer::runner`] - The coordinator driving everything
pub mod analyzer;

/// Multi-language syntax-tree facade (ast-grep / tree-sitter).
pub mod ast;

/// Configuration tree with defaults and range validation.
pub mod config;

/// Per-rule suppression globs.
pub mod ignore_rules;

/// Dependency manifest parsing (package.json, requirements.txt,
/// pyproject.toml, Cargo.toml, go.mod).
pub mod manifest;

/// Registry clients (npm, PyPI, crates.io, Go proxy) with TTL caching.
pub mod registry;

/// File discovery and classification.
pub mod scanner;

/// OpenSSF Scorecard client.
pub mod scorecard;

/// Shared taxonomy: alerts, severities, file records, reports.
pub mod types;

pub use analyzer::runner::{AnalyzeError, Analyzer, analyze};
pub use analyzer::{ModuleContext, RuleModule};
pub use config::{Config, ConfigError};
pub use registry::{PackageLookup, RegistryClient, RegistryError};
pub use scorecard::ScorecardClient;
pub use types::{Alert, FileRecord, Language, PackageInfo, Registry, Report, Severity};
