//! OpenSSF Scorecard client.
//!
//! Given a canonical repository URL, fetches the project's security
//! scorecard. Only github.com and gitlab.com repositories are supported;
//! anything else resolves to nothing without touching the network.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::registry::RegistryError;

/// Scorecard results are cached this long per normalized repository key.
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const SUPPORTED_HOSTS: &[&str] = &["github.com", "gitlab.com"];

/// One security scorecard, as served by api.securityscorecards.dev.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scorecard {
    /// Aggregate score in [0, 10].
    pub score: f64,
    /// Per-check detail.
    #[serde(default)]
    pub checks: Vec<ScorecardCheck>,
    /// As-of date reported by the scorecard service.
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScorecardCheck {
    pub name: String,
    pub score: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize)]
struct ScorecardResponse {
    score: Option<f64>,
    #[serde(default)]
    checks: Vec<ScorecardResponseCheck>,
    date: Option<String>,
}

#[derive(Deserialize)]
struct ScorecardResponseCheck {
    name: Option<String>,
    score: Option<f64>,
    reason: Option<String>,
}

/// `host/org/repo` extracted from a repository URL, or `None` when the host
/// is unsupported or the path is too shallow.
pub fn normalize_repo_key(repo_url: &str) -> Option<String> {
    let stripped = repo_url
        .trim()
        .trim_start_matches("git+")
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("git://")
        .trim_start_matches("www.")
        .trim_end_matches('/')
        .trim_end_matches(".git");

    let mut parts = stripped.split('/');
    let host = parts.next()?;
    if !SUPPORTED_HOSTS.contains(&host) {
        return None;
    }
    let org = parts.next()?;
    let repo = parts.next()?;
    if org.is_empty() || repo.is_empty() {
        return None;
    }
    Some(format!("{host}/{org}/{repo}"))
}

struct CacheEntry {
    fetched_at: Instant,
    scorecard: Option<Scorecard>,
}

/// HTTP client with a 1-hour TTL cache keyed by normalized repository.
pub struct ScorecardClient {
    http: reqwest::Client,
    base_url: String,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl Default for ScorecardClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScorecardClient {
    pub fn new() -> Self {
        Self::with_base_url("https://api.securityscorecards.dev")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .user_agent(concat!("codevet/", env!("CARGO_PKG_VERSION")))
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client should build"),
            base_url: base_url.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the scorecard for a repository URL. `None` for unsupported
    /// hosts and for 404 (both cached); transport errors propagate.
    pub async fn fetch(&self, repo_url: &str) -> Result<Option<Scorecard>, RegistryError> {
        let Some(key) = normalize_repo_key(repo_url) else {
            return Ok(None);
        };

        {
            let cache = self.cache.lock().expect("scorecard cache poisoned");
            if let Some(entry) = cache.get(&key)
                && entry.fetched_at.elapsed() < CACHE_TTL
            {
                return Ok(entry.scorecard.clone());
            }
        }

        let url = format!("{}/projects/{}", self.base_url, key);
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        let scorecard = if status.as_u16() == 404 {
            None
        } else if !status.is_success() {
            return Err(RegistryError::Status {
                status: status.as_u16(),
            });
        } else {
            resp.json::<ScorecardResponse>().await.ok().map(|doc| Scorecard {
                score: doc.score.unwrap_or(0.0),
                checks: doc
                    .checks
                    .into_iter()
                    .filter_map(|check| {
                        Some(ScorecardCheck {
                            name: check.name?,
                            score: check.score.unwrap_or(0.0),
                            reason: check.reason,
                        })
                    })
                    .collect(),
                date: doc.date,
            })
        };

        let mut cache = self.cache.lock().expect("scorecard cache poisoned");
        cache.insert(
            key,
            CacheEntry {
                fetched_at: Instant::now(),
                scorecard: scorecard.clone(),
            },
        );
        Ok(scorecard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn normalizes_github_urls() {
        assert_eq!(
            normalize_repo_key("https://github.com/psf/requests").as_deref(),
            Some("github.com/psf/requests")
        );
        assert_eq!(
            normalize_repo_key("git+https://github.com/expressjs/express.git").as_deref(),
            Some("github.com/expressjs/express")
        );
        assert_eq!(
            normalize_repo_key("https://gitlab.com/group/project/").as_deref(),
            Some("gitlab.com/group/project")
        );
    }

    #[test]
    fn rejects_unsupported_hosts_and_shallow_paths() {
        assert!(normalize_repo_key("https://bitbucket.org/x/y").is_none());
        assert!(normalize_repo_key("https://github.com/only-org").is_none());
        assert!(normalize_repo_key("not a url").is_none());
    }

    #[tokio::test]
    async fn unsupported_host_skips_network() {
        // Base URL points nowhere; the call must still succeed with None.
        let client = ScorecardClient::with_base_url("http://127.0.0.1:1");
        let result = client.fetch("https://sr.ht/~x/y").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn fetches_and_caches_scorecard() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/github.com/psf/requests"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{ "score": 7.5, "date": "2026-07-01",
                     "checks": [{ "name": "Maintained", "score": 10, "reason": "active" }] }"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = ScorecardClient::with_base_url(server.uri());
        let first = client
            .fetch("https://github.com/psf/requests")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.score, 7.5);
        assert_eq!(first.checks.len(), 1);

        // Served from cache; wiremock enforces the single upstream call.
        let second = client
            .fetch("https://github.com/psf/requests")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.score, 7.5);
    }

    #[tokio::test]
    async fn not_found_is_cached_as_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/github.com/no/body"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = ScorecardClient::with_base_url(server.uri());
        assert!(client.fetch("https://github.com/no/body").await.unwrap().is_none());
        assert!(client.fetch("https://github.com/no/body").await.unwrap().is_none());
    }
}
