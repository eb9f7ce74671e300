//! Cost rules: expensive vendor APIs called in loops, and expensive calls
//! without any caching layer in front of them.

use async_trait::async_trait;

use crate::ast::ParsedSource;
use crate::config::Config;
use crate::types::{Alert, Language, Severity};

use super::{ModuleContext, RuleModule, SourceFile};

const MODULE: &str = "cost";

/// Vendor calls with known per-invocation cost, matched as lowercase
/// substrings of the node text.
const EXPENSIVE_APIS: &[&str] = &[
    "openai.chat.completions.create",
    "openai.completions.create",
    "openai.embeddings.create",
    "openai.images.generate",
    "anthropic.messages.create",
    "anthropic.completions.create",
    "cohere.generate",
    "replicate.run",
    "cloudinary.uploader.upload",
    "cloudinary.uploader.destroy",
    "sharp(",
    "ffmpeg",
    "cloudconvert",
];

/// Evidence that the loop is intentionally throttled.
const RATE_LIMIT_MARKERS: &[&str] = &[
    "p-limit",
    "plimit",
    "bottleneck",
    "ratelimit",
    "sleep(",
    "delay(",
    "wait(",
    "throttle",
    "debounce",
    "asyncio.sleep",
    "time.sleep",
];

/// Evidence that results are cached somewhere.
const CACHE_MARKERS: &[&str] = &[
    "cache.get",
    "cache.set",
    "redis.get",
    "redis.set",
    "localstorage.get",
    "sessionstorage.get",
    "map.get",
    "map.set",
    "lru",
    "memoize",
    "@cache",
    "functools.lru_cache",
];

const JS_LOOP_KINDS: &[&str] = &[
    "for_statement",
    "for_in_statement",
    "while_statement",
    "do_statement",
];
const PY_LOOP_KINDS: &[&str] = &["for_statement", "while_statement"];

const JS_FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "arrow_function",
    "function_expression",
    "method_definition",
];
const PY_FUNCTION_KINDS: &[&str] = &["function_definition"];

pub struct CostModule;

#[async_trait]
impl RuleModule for CostModule {
    fn name(&self) -> &'static str {
        MODULE
    }

    fn is_enabled(&self, config: &Config) -> bool {
        config.modules.cost
    }

    async fn analyze(&self, ctx: &ModuleContext<'_>) -> Vec<Alert> {
        let mut alerts = Vec::new();
        for file in ctx.files.iter().filter(|f| f.record.is_source) {
            if ctx.cancel.is_cancelled() {
                break;
            }
            if let Some(parsed) = &file.parsed {
                check_file(file, parsed, &mut alerts);
            }
        }
        alerts
    }
}

fn expensive_api(lowered: &str) -> Option<&'static str> {
    EXPENSIVE_APIS
        .iter()
        .find(|api| lowered.contains(*api))
        .copied()
}

fn check_file(file: &SourceFile, parsed: &ParsedSource, alerts: &mut Vec<Alert>) {
    let is_python = file.record.language == Language::Python;
    let (loop_kinds, function_kinds) = if is_python {
        (PY_LOOP_KINDS, PY_FUNCTION_KINDS)
    } else {
        (JS_LOOP_KINDS, JS_FUNCTION_KINDS)
    };

    for node in parsed.find_kinds(loop_kinds) {
        let lowered = node.text().to_lowercase();
        let Some(api) = expensive_api(&lowered) else {
            continue;
        };
        let throttled = RATE_LIMIT_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker));
        if !throttled {
            alerts.push(
                Alert::new(
                    Severity::High,
                    "expensive-api-in-loop",
                    MODULE,
                    format!("Expensive API '{api}' called inside an unthrottled loop"),
                    file.rel_path.clone(),
                )
                .at_line(parsed.line_of(&node))
                .suggest("Batch the calls or add rate limiting (p-limit, sleep, ...)"),
            );
        }
    }

    for node in parsed.find_kinds(function_kinds) {
        let Some(body) = node.field("body") else {
            continue;
        };
        let lowered = body.text().to_lowercase();
        let Some(api) = expensive_api(&lowered) else {
            continue;
        };
        // Python cache decorators live on the wrapping decorated_definition,
        // outside the body node.
        let mut searchable = lowered.clone();
        if let Some(parent) = node.parent()
            && parent.kind().as_ref() == "decorated_definition"
        {
            searchable = parent.text().to_lowercase();
        }
        let cached = CACHE_MARKERS.iter().any(|marker| searchable.contains(marker));
        if !cached {
            alerts.push(
                Alert::new(
                    Severity::Medium,
                    "missing-cache-for-expensive-call",
                    MODULE,
                    format!("Expensive API '{api}' called without a cache in front of it"),
                    file.rel_path.clone(),
                )
                .at_line(parsed.line_of(&node))
                .suggest("Cache results keyed by input (redis, lru, memoize, ...)"),
            );
        }
    }
}
