//! Package registry HTTP clients.
//!
//! Answers existence and metadata queries against npm, PyPI, crates.io and
//! the Go module proxy. A 404 is a legitimate negative result — it is
//! cached and surfaced as `false`/`None`, never as an error. Any other
//! failure propagates as [`RegistryError`] so callers can decide whether to
//! skip dependent checks.
//!
//! Responses are mapped through tolerant structs: absent or oddly shaped
//! fields degrade to `None` instead of failing the lookup.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::types::{PackageInfo, Registry};

/// Positive and negative lookups are cached this long per (registry, name).
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Per-request timeout for registry calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from registry interactions. A 404 is not an error.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Transport failure (DNS, TLS, timeout, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success, non-404 status from the registry.
    #[error("registry returned status {status}")]
    Status { status: u16 },
}

/// Lookup seam consumed by the rule modules. The default implementation is
/// [`RegistryClient`]; tests inject fakes.
#[async_trait]
pub trait PackageLookup: Send + Sync {
    /// False iff the registry answered 404 for this name.
    async fn exists(&self, name: &str, registry: Registry) -> Result<bool, RegistryError>;

    /// Metadata for the package, or `None` on 404.
    async fn info(&self, name: &str, registry: Registry)
    -> Result<Option<PackageInfo>, RegistryError>;
}

/// Base URLs, overridable for tests.
#[derive(Clone, Debug)]
pub struct RegistryEndpoints {
    pub npm: String,
    pub pypi: String,
    pub crates: String,
    pub go: String,
}

impl Default for RegistryEndpoints {
    fn default() -> Self {
        Self {
            npm: "https://registry.npmjs.org".to_string(),
            pypi: "https://pypi.org".to_string(),
            crates: "https://crates.io".to_string(),
            go: "https://proxy.golang.org".to_string(),
        }
    }
}

struct CacheEntry {
    fetched_at: Instant,
    info: Option<PackageInfo>,
}

/// HTTP client with an in-process TTL cache keyed by (registry, name).
pub struct RegistryClient {
    http: reqwest::Client,
    endpoints: RegistryEndpoints,
    cache: Mutex<HashMap<(Registry, String), CacheEntry>>,
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryClient {
    pub fn new() -> Self {
        Self::with_endpoints(RegistryEndpoints::default())
    }

    pub fn with_endpoints(endpoints: RegistryEndpoints) -> Self {
        Self {
            http: reqwest::Client::builder()
                .user_agent(concat!("codevet/", env!("CARGO_PKG_VERSION")))
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client should build"),
            endpoints,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, registry: Registry, name: &str) -> Option<Option<PackageInfo>> {
        let cache = self.cache.lock().expect("registry cache poisoned");
        cache
            .get(&(registry, name.to_string()))
            .filter(|entry| entry.fetched_at.elapsed() < CACHE_TTL)
            .map(|entry| entry.info.clone())
    }

    fn store(&self, registry: Registry, name: &str, info: Option<PackageInfo>) {
        let mut cache = self.cache.lock().expect("registry cache poisoned");
        cache.insert(
            (registry, name.to_string()),
            CacheEntry {
                fetched_at: Instant::now(),
                info,
            },
        );
    }

    /// One cached lookup backing both `exists` and `info`.
    async fn lookup(
        &self,
        name: &str,
        registry: Registry,
    ) -> Result<Option<PackageInfo>, RegistryError> {
        if let Some(hit) = self.cached(registry, name) {
            return Ok(hit);
        }

        let url = match registry {
            Registry::Npm => {
                // Scoped names keep their `@` but escape the separator.
                format!("{}/{}", self.endpoints.npm, name.replace('/', "%2F"))
            }
            Registry::Pypi => format!("{}/pypi/{}/json", self.endpoints.pypi, name),
            Registry::Crates => format!("{}/api/v1/crates/{}", self.endpoints.crates, name),
            Registry::Go => format!("{}/{}/@v/list", self.endpoints.go, name),
        };

        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if status.as_u16() == 404 {
            self.store(registry, name, None);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RegistryError::Status {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await?;
        let info = match registry {
            Registry::Npm => map_npm(name, &body),
            Registry::Pypi => map_pypi(name, &body),
            Registry::Crates => map_crates(name, &body),
            Registry::Go => map_go(name, &body),
        };
        let info = info.unwrap_or_else(|| {
            tracing::debug!(%name, registry = %registry, "unparseable registry response, degrading");
            fallback_info(name)
        });
        self.store(registry, name, Some(info.clone()));
        Ok(Some(info))
    }
}

#[async_trait]
impl PackageLookup for RegistryClient {
    async fn exists(&self, name: &str, registry: Registry) -> Result<bool, RegistryError> {
        Ok(self.lookup(name, registry).await?.is_some())
    }

    async fn info(
        &self,
        name: &str,
        registry: Registry,
    ) -> Result<Option<PackageInfo>, RegistryError> {
        self.lookup(name, registry).await
    }
}

/// Minimal record for a package that exists but whose metadata could not be
/// mapped; the creation timestamp falls back to the present instant.
fn fallback_info(name: &str) -> PackageInfo {
    PackageInfo {
        name: name.to_string(),
        latest_version: String::new(),
        description: None,
        created_at: Utc::now(),
        downloads: None,
        maintainers: Vec::new(),
        repository_url: None,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ── npm ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct NpmPackument {
    #[serde(rename = "dist-tags")]
    dist_tags: Option<HashMap<String, String>>,
    description: Option<String>,
    time: Option<HashMap<String, String>>,
    maintainers: Option<Vec<NpmMaintainer>>,
    repository: Option<NpmRepository>,
}

#[derive(Deserialize)]
struct NpmMaintainer {
    name: Option<String>,
}

/// npm's `repository` may be a bare URL string or an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum NpmRepository {
    Url(String),
    Object { url: Option<String> },
    Other(serde_json::Value),
}

fn normalize_repo_url(raw: &str) -> String {
    raw.trim_start_matches("git+")
        .trim_end_matches(".git")
        .to_string()
}

fn map_npm(name: &str, body: &str) -> Option<PackageInfo> {
    let doc: NpmPackument = serde_json::from_str(body).ok()?;
    let latest_version = doc
        .dist_tags
        .as_ref()
        .and_then(|tags| tags.get("latest").cloned())
        .unwrap_or_default();
    let created_at = doc
        .time
        .as_ref()
        .and_then(|time| time.get("created"))
        .and_then(|raw| parse_timestamp(raw))
        .unwrap_or_else(Utc::now);
    let repository_url = match doc.repository {
        Some(NpmRepository::Url(url)) => Some(normalize_repo_url(&url)),
        Some(NpmRepository::Object { url: Some(url) }) => Some(normalize_repo_url(&url)),
        _ => None,
    };
    let maintainers = doc
        .maintainers
        .unwrap_or_default()
        .into_iter()
        .filter_map(|m| m.name)
        .collect();

    Some(PackageInfo {
        name: name.to_string(),
        latest_version,
        description: doc.description,
        created_at,
        downloads: None,
        maintainers,
        repository_url,
    })
}

// ── PyPI ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PypiResponse {
    info: Option<PypiInfo>,
    urls: Option<Vec<PypiUrl>>,
}

#[derive(Deserialize)]
struct PypiInfo {
    version: Option<String>,
    summary: Option<String>,
    project_urls: Option<HashMap<String, Option<String>>>,
    home_page: Option<String>,
    maintainer: Option<String>,
    author: Option<String>,
}

#[derive(Deserialize)]
struct PypiUrl {
    upload_time_iso_8601: Option<String>,
}

/// project_urls keys tried in order for the source repository.
const PYPI_SOURCE_KEYS: &[&str] = &["Source", "Repository", "GitHub", "Source Code"];

fn map_pypi(name: &str, body: &str) -> Option<PackageInfo> {
    let doc: PypiResponse = serde_json::from_str(body).ok()?;
    let info = doc.info?;

    let repository_url = PYPI_SOURCE_KEYS
        .iter()
        .find_map(|key| {
            info.project_urls
                .as_ref()
                .and_then(|urls| urls.get(*key).cloned().flatten())
        })
        .or_else(|| {
            info.home_page.clone().filter(|home| {
                home.contains("github.com") || home.contains("gitlab.com")
            })
        });

    let created_at = doc
        .urls
        .unwrap_or_default()
        .iter()
        .filter_map(|u| u.upload_time_iso_8601.as_deref())
        .filter_map(parse_timestamp)
        .min()
        .unwrap_or_else(Utc::now);

    let maintainers = [info.maintainer, info.author]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();

    Some(PackageInfo {
        name: name.to_string(),
        latest_version: info.version.unwrap_or_default(),
        description: info.summary,
        created_at,
        downloads: None,
        maintainers,
        repository_url,
    })
}

// ── crates.io ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CratesResponse {
    #[serde(rename = "crate")]
    krate: Option<CrateData>,
}

#[derive(Deserialize)]
struct CrateData {
    max_version: Option<String>,
    newest_version: Option<String>,
    created_at: Option<String>,
    description: Option<String>,
    downloads: Option<u64>,
    repository: Option<String>,
}

fn map_crates(name: &str, body: &str) -> Option<PackageInfo> {
    let doc: CratesResponse = serde_json::from_str(body).ok()?;
    let krate = doc.krate?;
    Some(PackageInfo {
        name: name.to_string(),
        latest_version: krate
            .newest_version
            .or(krate.max_version)
            .unwrap_or_default(),
        description: krate.description,
        created_at: krate
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now),
        downloads: krate.downloads,
        maintainers: Vec::new(),
        repository_url: krate.repository.map(|url| normalize_repo_url(&url)),
    })
}

// ── Go module proxy ────────────────────────────────────────────────

fn map_go(name: &str, body: &str) -> Option<PackageInfo> {
    // `@v/list` is a plain-text version list; the proxy exposes no
    // timestamps or metadata here.
    let latest_version = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
        .unwrap_or_default()
        .to_string();
    let repository_url = (name.starts_with("github.com/") || name.starts_with("gitlab.com/"))
        .then(|| format!("https://{name}"));
    Some(PackageInfo {
        name: name.to_string(),
        latest_version,
        description: None,
        created_at: Utc::now(),
        downloads: None,
        maintainers: Vec::new(),
        repository_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const NPM_FIXTURE: &str = r#"{
        "dist-tags": { "latest": "4.21.2" },
        "description": "Fast, unopinionated, minimalist web framework",
        "time": { "created": "2010-12-29T19:38:25.450Z", "modified": "2024-01-01T00:00:00.000Z" },
        "maintainers": [{ "name": "dougwilson" }, { "name": "wesleytodd" }],
        "repository": { "type": "git", "url": "git+https://github.com/expressjs/express.git" }
    }"#;

    #[test]
    fn npm_mapping_strips_git_prefix_and_suffix() {
        let info = map_npm("express", NPM_FIXTURE).unwrap();
        assert_eq!(info.latest_version, "4.21.2");
        assert_eq!(
            info.repository_url.as_deref(),
            Some("https://github.com/expressjs/express")
        );
        assert_eq!(info.maintainers, vec!["dougwilson", "wesleytodd"]);
        assert_eq!(info.created_at.to_rfc3339(), "2010-12-29T19:38:25.450+00:00");
    }

    #[test]
    fn npm_repository_as_plain_string() {
        let info = map_npm(
            "left-pad",
            r#"{ "dist-tags": {"latest": "1.3.0"}, "repository": "git+https://github.com/stevemao/left-pad.git" }"#,
        )
        .unwrap();
        assert_eq!(
            info.repository_url.as_deref(),
            Some("https://github.com/stevemao/left-pad")
        );
    }

    #[test]
    fn pypi_project_urls_priority_order() {
        let info = map_pypi(
            "requests",
            r#"{
                "info": {
                    "version": "2.31.0",
                    "summary": "HTTP for Humans",
                    "project_urls": {
                        "Documentation": "https://docs.example.com",
                        "Source": "https://github.com/psf/requests"
                    },
                    "home_page": "https://requests.readthedocs.io"
                },
                "urls": [{ "upload_time_iso_8601": "2023-05-22T15:12:42.313790Z" }]
            }"#,
        )
        .unwrap();
        assert_eq!(
            info.repository_url.as_deref(),
            Some("https://github.com/psf/requests")
        );
    }

    #[test]
    fn pypi_home_page_fallback_requires_known_host() {
        let info = map_pypi(
            "thing",
            r#"{ "info": { "version": "1.0", "home_page": "https://thing.dev" } }"#,
        )
        .unwrap();
        assert!(info.repository_url.is_none());

        let info = map_pypi(
            "thing",
            r#"{ "info": { "version": "1.0", "home_page": "https://gitlab.com/g/thing" } }"#,
        )
        .unwrap();
        assert_eq!(info.repository_url.as_deref(), Some("https://gitlab.com/g/thing"));
    }

    #[test]
    fn crates_mapping_reads_downloads() {
        let info = map_crates(
            "serde",
            r#"{ "crate": { "newest_version": "1.0.200", "created_at": "2014-12-05T20:20:32.070000+00:00", "downloads": 400000000, "repository": "https://github.com/serde-rs/serde" } }"#,
        )
        .unwrap();
        assert_eq!(info.latest_version, "1.0.200");
        assert_eq!(info.downloads, Some(400_000_000));
    }

    #[test]
    fn go_list_maps_versions_and_repo() {
        let info = map_go("github.com/gin-gonic/gin", "v1.9.0\nv1.9.1\n").unwrap();
        assert_eq!(info.latest_version, "v1.9.1");
        assert_eq!(
            info.repository_url.as_deref(),
            Some("https://github.com/gin-gonic/gin")
        );
    }

    #[tokio::test]
    async fn exists_false_on_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/definitely-not-real-xyz"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = RegistryClient::with_endpoints(RegistryEndpoints {
            npm: server.uri(),
            ..RegistryEndpoints::default()
        });
        let exists = client
            .exists("definitely-not-real-xyz", Registry::Npm)
            .await
            .unwrap();
        assert!(!exists);
    }

    #[tokio::test]
    async fn negative_result_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ghost-pkg"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = RegistryClient::with_endpoints(RegistryEndpoints {
            npm: server.uri(),
            ..RegistryEndpoints::default()
        });
        assert!(!client.exists("ghost-pkg", Registry::Npm).await.unwrap());
        // Second call must be served from the cache; wiremock verifies the
        // expected request count on drop.
        assert!(!client.exists("ghost-pkg", Registry::Npm).await.unwrap());
        assert!(client.info("ghost-pkg", Registry::Npm).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn positive_result_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/express"))
            .respond_with(ResponseTemplate::new(200).set_body_string(NPM_FIXTURE))
            .expect(1)
            .mount(&server)
            .await;

        let client = RegistryClient::with_endpoints(RegistryEndpoints {
            npm: server.uri(),
            ..RegistryEndpoints::default()
        });
        assert!(client.exists("express", Registry::Npm).await.unwrap());
        let info = client.info("express", Registry::Npm).await.unwrap().unwrap();
        assert_eq!(info.latest_version, "4.21.2");
    }

    #[tokio::test]
    async fn non_404_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = RegistryClient::with_endpoints(RegistryEndpoints {
            npm: server.uri(),
            ..RegistryEndpoints::default()
        });
        let err = client.exists("flaky", Registry::Npm).await.unwrap_err();
        assert!(matches!(err, RegistryError::Status { status: 500 }));
    }

    #[tokio::test]
    async fn unparseable_body_degrades_to_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weird"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = RegistryClient::with_endpoints(RegistryEndpoints {
            npm: server.uri(),
            ..RegistryEndpoints::default()
        });
        // Registry said 200, so the package exists even if the body is junk.
        assert!(client.exists("weird", Registry::Npm).await.unwrap());
        let info = client.info("weird", Registry::Npm).await.unwrap().unwrap();
        assert!(info.latest_version.is_empty());
    }
}
