//! The pipeline coordinator.
//!
//! Drives the run end to end: scan, load, build the import graph, run the
//! enabled rule modules in registration order, then filter, deduplicate,
//! order, and score the combined alert list. A failure in any one file or
//! module is isolated; only an invalid configuration or an explicit
//! cancellation aborts the pipeline.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, ConfigError};
use crate::ignore_rules::IgnoreRules;
use crate::registry::{PackageLookup, RegistryClient};
use crate::scanner::scan_files;
use crate::scorecard::ScorecardClient;
use crate::types::{Alert, Language, Report, ReportSummary, ScanMetadata, Severity};

use super::graph::ImportGraph;
use super::hallucination::TOP_PACKAGES;
use super::{ModuleContext, SourceFile, default_modules};

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("scan root '{0}' is not a directory")]
    RootNotADirectory(String),

    #[error("analysis cancelled")]
    Cancelled,
}

/// Reusable pipeline front door. Holds the registry/scorecard clients so
/// their caches survive across runs within the process.
pub struct Analyzer {
    config: Config,
    registry: Arc<dyn PackageLookup>,
    scorecard: Arc<ScorecardClient>,
    top_packages: Vec<String>,
    cancel: CancellationToken,
}

impl Analyzer {
    /// Validate the configuration and set up default clients.
    pub fn new(config: Config) -> Result<Self, AnalyzeError> {
        config.validate()?;
        let top_packages = TOP_PACKAGES
            .iter()
            .take(config.hallucination.top_packages_count)
            .map(|s| s.to_string())
            .collect();
        Ok(Self {
            config,
            registry: Arc::new(RegistryClient::new()),
            scorecard: Arc::new(ScorecardClient::new()),
            top_packages,
            cancel: CancellationToken::new(),
        })
    }

    /// Substitute the registry lookup (shared caches, test fakes).
    pub fn with_registry(mut self, registry: Arc<dyn PackageLookup>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_scorecard(mut self, scorecard: Arc<ScorecardClient>) -> Self {
        self.scorecard = scorecard;
        self
    }

    /// Substitute the typosquat reference list.
    pub fn with_top_packages(mut self, top_packages: Vec<String>) -> Self {
        let count = self.config.hallucination.top_packages_count;
        self.top_packages = top_packages.into_iter().take(count).collect();
        self
    }

    /// Token for cancelling this analyzer's runs. Cancelling discards all
    /// partially computed alerts.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the full pipeline over `root`.
    pub async fn analyze(&self, root: &Path) -> Result<Report, AnalyzeError> {
        let started = Instant::now();
        let timestamp = Utc::now();

        if !root.is_dir() {
            return Err(AnalyzeError::RootNotADirectory(
                root.display().to_string(),
            ));
        }

        let records = scan_files(root, &self.config.scanning);

        let mut files = Vec::with_capacity(records.len());
        for record in records {
            if self.cancel.is_cancelled() {
                return Err(AnalyzeError::Cancelled);
            }
            let rel_path = relative_slash_path(root, &record.path);
            match std::fs::read_to_string(&record.path) {
                Ok(text) => files.push(SourceFile::new(record, rel_path, text)),
                Err(err) => {
                    tracing::warn!(path = %record.path.display(), %err,
                        "cannot read file, dropping from analysis");
                }
            }
        }

        // The graph is fully constructed before any module runs, so every
        // cross-file check reads a finished structure.
        let graph_inputs: Vec<(String, Language, &str)> = files
            .iter()
            .filter(|f| f.record.is_source)
            .map(|f| (f.rel_path.clone(), f.record.language, f.text.as_str()))
            .collect();
        let graph = ImportGraph::build(&graph_inputs);

        let ctx = ModuleContext {
            root,
            files: &files,
            config: &self.config,
            registry: self.registry.as_ref(),
            scorecard: &self.scorecard,
            top_packages: &self.top_packages,
            graph: &graph,
            cancel: &self.cancel,
        };

        let mut alerts = Vec::new();
        for module in default_modules() {
            if self.cancel.is_cancelled() {
                return Err(AnalyzeError::Cancelled);
            }
            if !module.is_enabled(&self.config) {
                continue;
            }
            let module_alerts = module.analyze(&ctx).await;
            tracing::debug!(module = module.name(), count = module_alerts.len(), "module finished");
            alerts.extend(module_alerts);
        }
        if self.cancel.is_cancelled() {
            return Err(AnalyzeError::Cancelled);
        }

        let ignore = IgnoreRules::new(&self.config.ignore_rules);
        alerts.retain(|alert| {
            self.config.retains_severity(alert.severity)
                && !ignore.is_suppressed(&alert.rule_id, &alert.file)
        });

        let mut alerts = dedup_and_sort(alerts);
        for (idx, alert) in alerts.iter_mut().enumerate() {
            alert.id = idx as u32 + 1;
        }

        let summary = summarize(&alerts);
        Ok(Report {
            summary,
            alerts,
            metadata: ScanMetadata {
                root: root.display().to_string(),
                file_count: files.len(),
                duration_ms: started.elapsed().as_millis() as u64,
                timestamp,
                config: self.config.clone(),
            },
        })
    }
}

/// One-call convenience entry point.
pub async fn analyze(root: &Path, config: Config) -> Result<Report, AnalyzeError> {
    Analyzer::new(config)?.analyze(root).await
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect::<Vec<_>>()
        .join("/")
}

/// Keep the first occurrence per `(file, line, rule-id, message)`, then
/// order by `(file, line, rule-id, message)` for byte-stable output.
pub fn dedup_and_sort(mut alerts: Vec<Alert>) -> Vec<Alert> {
    let mut seen = HashSet::new();
    alerts.retain(|alert| seen.insert(alert.dedup_key()));
    alerts.sort_by_key(Alert::sort_key);
    alerts
}

/// `100 − 20·log10(1+5c) − 10·log10(1+5h) − 5·log10(1+m) − 2·log10(1+l)`,
/// clamped at zero.
pub fn score(critical: usize, high: usize, medium: usize, low: usize) -> f64 {
    let value = 100.0
        - 20.0 * (1.0 + 5.0 * critical as f64).log10()
        - 10.0 * (1.0 + 5.0 * high as f64).log10()
        - 5.0 * (1.0 + medium as f64).log10()
        - 2.0 * (1.0 + low as f64).log10();
    value.max(0.0)
}

fn summarize(alerts: &[Alert]) -> ReportSummary {
    let count = |severity: Severity| alerts.iter().filter(|a| a.severity == severity).count();
    let critical = count(Severity::Critical);
    let high = count(Severity::High);
    let medium = count(Severity::Medium);
    let low = count(Severity::Low);
    ReportSummary {
        critical,
        high,
        medium,
        low,
        total: alerts.len(),
        score: score(critical, high, medium, low),
    }
}
