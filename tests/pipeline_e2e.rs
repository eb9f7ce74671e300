//! End-to-end pipeline tests over real temp-directory fixtures.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use codevet::registry::RegistryError;
use codevet::types::PackageInfo;
use codevet::{Analyzer, Config, PackageLookup, Registry, Report, Severity};

/// Registry fake: everything exists (aged five years) except the names
/// listed as missing. No network involved.
struct FakeRegistry {
    missing: HashSet<String>,
}

impl FakeRegistry {
    fn new(missing: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            missing: missing.iter().map(|s| s.to_string()).collect(),
        })
    }
}

#[async_trait]
impl PackageLookup for FakeRegistry {
    async fn exists(&self, name: &str, _registry: Registry) -> Result<bool, RegistryError> {
        Ok(!self.missing.contains(name))
    }

    async fn info(
        &self,
        name: &str,
        _registry: Registry,
    ) -> Result<Option<PackageInfo>, RegistryError> {
        if self.missing.contains(name) {
            return Ok(None);
        }
        Ok(Some(PackageInfo {
            name: name.to_string(),
            latest_version: "1.0.0".to_string(),
            description: None,
            created_at: Utc::now() - Duration::days(5 * 365),
            downloads: Some(1_000_000),
            maintainers: vec!["someone".to_string()],
            repository_url: None,
        }))
    }
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

async fn run(root: &Path, config: Config) -> Report {
    Analyzer::new(config)
        .unwrap()
        .with_registry(FakeRegistry::new(&[]))
        .analyze(root)
        .await
        .unwrap()
}

// ============================================
// Literal scenarios
// ============================================

#[tokio::test]
async fn hollow_function_in_typescript() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "a.ts",
        "function empty() { // TODO: Implement later\n return null; }\n",
    );

    let report = run(tmp.path(), Config::default()).await;
    let hollow: Vec<_> = report
        .alerts
        .iter()
        .filter(|a| a.rule_id == "hollow-function")
        .collect();
    assert_eq!(hollow.len(), 1);
    assert_eq!(hollow[0].severity, Severity::High);
    assert_eq!(hollow[0].line, Some(1));
    assert_eq!(hollow[0].file, "a.ts");
}

#[tokio::test]
async fn magic_number_outside_sql_string() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "q.go",
        "query := `SELECT * FROM users WHERE age > 18 AND status = 1`\nval := 999\n",
    );

    let report = run(tmp.path(), Config::default()).await;
    let magic: Vec<_> = report
        .alerts
        .iter()
        .filter(|a| a.rule_id == "magic-number")
        .collect();
    assert_eq!(magic.len(), 1);
    assert!(magic[0].message.contains("999"));
    assert_eq!(magic[0].line, Some(2));
}

#[tokio::test]
async fn interface_fields_do_not_count_as_mixed_naming() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "types.ts",
        "export interface BackendResponse {\n  user_id: string;\n  created_at: string;\n}\nfunction run() { const validCamelCase = \"ok\"; }\n",
    );

    let report = run(tmp.path(), Config::default()).await;
    assert!(report.alerts.iter().all(|a| a.rule_id != "mixed-naming"));
}

#[tokio::test]
async fn unlogged_catch_flagged_at_body_line() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "h.ts", "try { doWork(); } catch (e) { /* silent */ }\n");

    let report = run(tmp.path(), Config::default()).await;
    let unlogged: Vec<_> = report
        .alerts
        .iter()
        .filter(|a| a.rule_id == "unlogged-error")
        .collect();
    assert_eq!(unlogged.len(), 1);
    assert_eq!(unlogged[0].severity, Severity::Medium);
    assert_eq!(unlogged[0].line, Some(1));
}

#[tokio::test]
async fn circular_imports_reported_once_per_cycle() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "src/a.ts", "import { b } from './b';\nexport const a = 1;\n");
    write(tmp.path(), "src/b.ts", "import { a } from './a';\nexport const b = 2;\n");

    let report = run(tmp.path(), Config::default()).await;
    let cycles: Vec<_> = report
        .alerts
        .iter()
        .filter(|a| a.rule_id == "circular-dependency")
        .collect();
    assert_eq!(cycles.len(), 1);
    // Anchored on the lexicographically first member.
    assert_eq!(cycles[0].file, "src/a.ts");
    assert!(cycles[0].message.contains("src/b.ts"));
}

#[tokio::test]
async fn unused_export_found_and_entrypoints_exempt() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "src/lib.ts",
        "export const used = 1;\nexport const neverImported = 2;\n",
    );
    write(tmp.path(), "src/app.ts", "import { used } from './lib';\nconsole.log(used);\n");
    write(tmp.path(), "src/index.ts", "export const publicApi = 1;\n");

    let report = run(tmp.path(), Config::default()).await;
    let unused: Vec<_> = report
        .alerts
        .iter()
        .filter(|a| a.rule_id == "unused-export")
        .collect();
    assert_eq!(unused.len(), 1);
    assert_eq!(unused[0].file, "src/lib.ts");
    assert!(unused[0].message.contains("neverImported"));
}

// ============================================
// Universal properties
// ============================================

#[tokio::test]
async fn reports_are_deterministic() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.ts", "function empty() { return null; }\nconst x = row.user_id ?? fallbackValue;\n");
    write(tmp.path(), "b.py", "def f():\n    pass\nRETRY = 3\ncount = 42\n");
    write(tmp.path(), "q.go", "val := 999\n");

    let first = run(tmp.path(), Config::default()).await;
    let second = run(tmp.path(), Config::default()).await;

    let alerts_a = serde_json::to_string(&first.alerts).unwrap();
    let alerts_b = serde_json::to_string(&second.alerts).unwrap();
    assert_eq!(alerts_a, alerts_b);
    let summary_a = serde_json::to_string(&first.summary).unwrap();
    let summary_b = serde_json::to_string(&second.summary).unwrap();
    assert_eq!(summary_a, summary_b);
}

#[cfg(unix)]
#[tokio::test]
async fn unreadable_entry_leaves_other_files_untouched() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.ts", "function empty() { return null; }\n");

    let mut config = Config::default();
    config.scanning.follow_symlinks = true;
    let baseline = run(tmp.path(), config.clone()).await;

    // A dangling symlink fails on stat/read; it must be skipped with a
    // warning, not abort the run.
    std::os::unix::fs::symlink(tmp.path().join("missing.ts"), tmp.path().join("broken.ts"))
        .unwrap();
    let with_broken = run(tmp.path(), config).await;

    assert_eq!(
        serde_json::to_string(&baseline.alerts).unwrap(),
        serde_json::to_string(&with_broken.alerts).unwrap()
    );
}

#[tokio::test]
async fn severity_filter_is_exact() {
    let tmp = TempDir::new().unwrap();
    // Produces HIGH (hollow-function), MEDIUM (unlogged-error is separate
    // file), and LOW (magic-number) alerts.
    write(tmp.path(), "a.ts", "function empty() { return null; }\n");
    write(tmp.path(), "h.ts", "try { doWork(); } catch (e) { }\n");
    write(tmp.path(), "m.go", "val := 999\n");

    let full = run(tmp.path(), Config::default()).await;
    assert!(full.alerts.iter().any(|a| a.severity == Severity::High));
    assert!(full.alerts.iter().any(|a| a.severity == Severity::Low));

    let mut config = Config::default();
    config.severity = vec![Severity::High];
    let filtered = run(tmp.path(), config).await;

    assert!(!filtered.alerts.is_empty());
    assert!(filtered.alerts.iter().all(|a| a.severity == Severity::High));
    // The filtered set is exactly the HIGH subset of the full run.
    let expected: Vec<_> = full
        .alerts
        .iter()
        .filter(|a| a.severity == Severity::High)
        .map(|a| a.dedup_key())
        .collect();
    let actual: Vec<_> = filtered.alerts.iter().map(|a| a.dedup_key()).collect();
    assert_eq!(expected, actual);
}

#[tokio::test]
async fn ignore_rules_suppress_by_rule_and_glob() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "m.go", "val := 999\n");
    write(tmp.path(), "a.ts", "function empty() { return null; }\n");

    let mut config = Config::default();
    config
        .ignore_rules
        .insert("magic-number".to_string(), vec!["**/*.go".to_string()]);
    let report = run(tmp.path(), config).await;

    // The suppressed rule is gone for matching files...
    assert!(report.alerts.iter().all(|a| a.rule_id != "magic-number"));
    // ...while other rules still fire.
    assert!(report.alerts.iter().any(|a| a.rule_id == "hollow-function"));
}

#[tokio::test]
async fn module_toggles_disable_their_alerts() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.ts", "function empty() { return null; }\n");
    write(tmp.path(), "m.go", "val := 999\n");

    let mut config = Config::default();
    config.modules.laziness = false;
    let report = run(tmp.path(), config).await;

    assert!(report.alerts.iter().all(|a| a.module != "laziness"));
    assert!(report.alerts.iter().any(|a| a.module == "architecture"));
}

#[tokio::test]
async fn alert_ids_are_stable_and_sequential() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "m.go", "a := 7\nb := 42\n");

    let report = run(tmp.path(), Config::default()).await;
    let ids: Vec<u32> = report.alerts.iter().map(|a| a.id).collect();
    let expected: Vec<u32> = (1..=report.alerts.len() as u32).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn summary_counts_match_alerts() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.ts", "function empty() { return null; }\n");
    write(tmp.path(), "m.go", "val := 999\n");

    let report = run(tmp.path(), Config::default()).await;
    let count = |s: Severity| report.alerts.iter().filter(|a| a.severity == s).count();
    assert_eq!(report.summary.critical, count(Severity::Critical));
    assert_eq!(report.summary.high, count(Severity::High));
    assert_eq!(report.summary.medium, count(Severity::Medium));
    assert_eq!(report.summary.low, count(Severity::Low));
    assert_eq!(report.summary.total, report.alerts.len());
    assert!(report.summary.score < 100.0);
    assert_eq!(report.metadata.file_count, 2);
}

#[tokio::test]
async fn cancellation_discards_partial_results() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.ts", "function empty() { return null; }\n");

    let analyzer = Analyzer::new(Config::default())
        .unwrap()
        .with_registry(FakeRegistry::new(&[]));
    analyzer.cancellation_token().cancel();
    let err = analyzer.analyze(tmp.path()).await.unwrap_err();
    assert!(matches!(err, codevet::AnalyzeError::Cancelled));
}

#[tokio::test]
async fn vue_sfc_lines_map_to_whole_file() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "App.vue",
        "<template>\n  <div/>\n</template>\n<script>\nfunction empty() { return null; }\n</script>\n",
    );

    let report = run(tmp.path(), Config::default()).await;
    let hollow: Vec<_> = report
        .alerts
        .iter()
        .filter(|a| a.rule_id == "hollow-function")
        .collect();
    assert_eq!(hollow.len(), 1);
    assert_eq!(hollow[0].line, Some(5));
}
