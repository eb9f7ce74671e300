//! Hallucinated-dependency detection.
//!
//! Checks every declared dependency against its ecosystem registry:
//! - `phantom-package` - the registry has never heard of it
//! - `newborn-package` - it was published suspiciously recently
//! - `typosquat-risk` - its name sits one edit away from a popular package

use async_trait::async_trait;
use chrono::Utc;

use crate::manifest::parse_manifest;
use crate::types::{Alert, PackageDependency, Severity};

use super::{ModuleContext, RuleModule};

const MODULE: &str = "hallucination";

/// Popular package names across npm/pypi/crates/go, used as the reference
/// set for typosquat comparison. A process-wide constant; callers may
/// substitute their own list on the coordinator.
pub static TOP_PACKAGES: &[&str] = &[
    // npm
    "react", "react-dom", "lodash", "express", "axios", "chalk", "commander", "debug", "vue",
    "next", "webpack", "vite", "typescript", "eslint", "prettier", "jest", "vitest", "mocha",
    "moment", "dayjs", "uuid", "classnames", "redux", "zustand", "rxjs", "tslib", "dotenv",
    "cors", "body-parser", "jsonwebtoken", "bcrypt", "mongoose", "sequelize", "prisma", "knex",
    "pg", "mysql2", "redis", "ioredis", "socket.io", "ws", "graphql", "apollo-server", "zod",
    "yup", "joi", "ajv", "validator", "nodemon", "ts-node", "esbuild", "rollup", "babel-core",
    "styled-components", "tailwindcss", "svelte", "solid-js", "preact", "angular", "jquery",
    "inquirer", "yargs", "minimist", "glob", "rimraf", "fs-extra", "node-fetch", "got",
    "superagent", "cheerio", "puppeteer", "playwright", "sharp", "multer", "passport",
    "helmet", "compression", "morgan", "winston", "pino", "bunyan",
    // pypi
    "requests", "numpy", "pandas", "flask", "django", "fastapi", "pydantic", "sqlalchemy",
    "celery", "boto3", "urllib3", "certifi", "idna", "charset-normalizer", "setuptools",
    "pip", "wheel", "pytest", "tox", "black", "flake8", "mypy", "isort", "click", "typer",
    "rich", "httpx", "aiohttp", "uvicorn", "gunicorn", "jinja2", "markupsafe", "pyyaml",
    "toml", "python-dotenv", "cryptography", "pyjwt", "passlib", "pillow", "matplotlib",
    "scipy", "scikit-learn", "torch", "tensorflow", "transformers", "openai", "anthropic",
    "langchain", "tqdm", "colorama", "beautifulsoup4", "lxml", "selenium", "redis-py",
    // crates
    "serde", "serde_json", "tokio", "anyhow", "thiserror", "clap", "regex", "rand", "log",
    "tracing", "reqwest", "hyper", "axum", "actix-web", "chrono", "time", "uuid-rs",
    "itertools", "futures", "bytes", "once_cell", "lazy_static", "parking_lot", "crossbeam",
    "rayon", "walkdir", "globset", "tempfile", "libc", "syn", "quote", "proc-macro2",
    // go
    "github.com/gin-gonic/gin", "github.com/gorilla/mux", "github.com/spf13/cobra",
    "github.com/spf13/viper", "github.com/stretchr/testify", "github.com/sirupsen/logrus",
    "github.com/pkg/errors", "github.com/go-redis/redis", "github.com/lib/pq",
    "github.com/golang-jwt/jwt", "google.golang.org/grpc", "golang.org/x/sync",
];

pub struct HallucinationModule;

#[async_trait]
impl RuleModule for HallucinationModule {
    fn name(&self) -> &'static str {
        MODULE
    }

    fn is_enabled(&self, config: &crate::config::Config) -> bool {
        config.modules.hallucination
    }

    async fn analyze(&self, ctx: &ModuleContext<'_>) -> Vec<Alert> {
        let mut alerts = Vec::new();

        for file in ctx.files.iter().filter(|f| f.record.is_manifest) {
            if ctx.cancel.is_cancelled() {
                break;
            }
            let deps = parse_manifest(&file.record.path, &file.text);
            for dep in deps {
                self.check_dependency(ctx, file, &dep, &mut alerts).await;
            }
        }
        alerts
    }
}

impl HallucinationModule {
    async fn check_dependency(
        &self,
        ctx: &ModuleContext<'_>,
        file: &super::SourceFile,
        dep: &PackageDependency,
        alerts: &mut Vec<Alert>,
    ) {
        let line = line_of_dependency(&file.text, &dep.name);

        match ctx.registry.exists(&dep.name, dep.registry).await {
            Ok(false) => {
                let mut alert = Alert::new(
                    Severity::Critical,
                    "phantom-package",
                    MODULE,
                    format!(
                        "Dependency '{}' does not exist on the {} registry",
                        dep.name, dep.registry
                    ),
                    file.rel_path.clone(),
                )
                .suggest(format!(
                    "Remove '{}' from {} or replace it with a real package",
                    dep.name, file.rel_path
                ));
                if let Some(line) = line {
                    alert = alert.at_line(line);
                }
                alerts.push(alert);
                // Phantom: no further checks on this dependency.
                return;
            }
            Ok(true) => {}
            Err(err) => {
                // Network trouble is not evidence of anything; skip the
                // dependency without emitting.
                tracing::debug!(name = %dep.name, registry = %dep.registry, %err,
                    "registry lookup failed, skipping dependency");
                return;
            }
        }

        if ctx.config.supply_chain.check_newborn {
            match ctx.registry.info(&dep.name, dep.registry).await {
                Ok(Some(info)) => {
                    let age_days = (Utc::now() - info.created_at).num_days();
                    let threshold = ctx.config.hallucination.package_age_threshold_days as i64;
                    let well_known = info
                        .downloads
                        .is_some_and(|d| d >= ctx.config.hallucination.package_download_threshold);
                    if age_days < threshold && !well_known {
                        let mut alert = Alert::new(
                            Severity::Medium,
                            "newborn-package",
                            MODULE,
                            format!(
                                "Dependency '{}' was first published {} day(s) ago (threshold: {})",
                                dep.name, age_days.max(0), threshold
                            ),
                            file.rel_path.clone(),
                        )
                        .suggest(format!(
                            "Verify that '{}' is the package you meant; brand-new names are a \
                             common supply-chain attack vector",
                            dep.name
                        ));
                        if let Some(line) = line {
                            alert = alert.at_line(line);
                        }
                        alerts.push(alert);
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(name = %dep.name, %err, "registry info failed, skipping newborn check");
                }
            }
        }

        let distance = ctx.config.hallucination.typosquat_levenshtein_distance;
        // A name that is itself popular is not a squat of its neighbors.
        let is_top = ctx.top_packages.iter().any(|top| top == &dep.name);
        if !is_top
            && let Some(matched) = ctx
                .top_packages
                .iter()
                .find(|top| strsim::levenshtein(&dep.name, top) == distance)
        {
            let mut alert = Alert::new(
                Severity::Medium,
                "typosquat-risk",
                MODULE,
                format!(
                    "Dependency '{}' is suspiciously similar to the popular package '{}'",
                    dep.name, matched
                ),
                file.rel_path.clone(),
            )
            .suggest(format!("Did you mean '{matched}'?"));
            if let Some(line) = line {
                alert = alert.at_line(line);
            }
            alerts.push(alert);
        }
    }
}

/// 1-based line where the dependency name first appears in the manifest.
fn line_of_dependency(text: &str, name: &str) -> Option<usize> {
    text.lines()
        .position(|line| line.contains(name))
        .map(|idx| idx + 1)
}
