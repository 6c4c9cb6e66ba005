//! GitHub API interaction module
//!
//! Provides the HTTP seam used by the cache and the directory source, the
//! reqwest-backed client, and helpers for constructing API URLs.

use crate::error::FetchError;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Raw HTTP result: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A GET-only transport. Errors are transport failures; HTTP error statuses
/// come back as a normal response.
pub trait Fetch: Send + Sync {
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, FetchError>> + Send;
}

/// GET `url` and decode it as JSON, mapping 401 and 403 to their own errors.
pub async fn get_json<F: Fetch>(fetcher: &F, url: &str) -> Result<serde_json::Value, FetchError> {
    let response = fetcher.get(url).await?;

    match response.status {
        401 => {
            return Err(FetchError::AuthInvalid {
                url: url.to_string(),
            })
        }
        403 => {
            return Err(FetchError::RateLimited {
                url: url.to_string(),
            })
        }
        _ if !response.is_success() => {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status,
            })
        }
        _ => {}
    }

    serde_json::from_str(&response.body).map_err(|source| FetchError::Malformed {
        url: url.to_string(),
        source,
    })
}

/// Build the repository info URL (`GET /repos/{owner}/{repo}`)
pub fn build_gh_repo_url(api_base: &str, owner: &str, repo: &str) -> String {
    format!("{}/repos/{}/{}", api_base.trim_end_matches('/'), owner, repo)
}

/// Build the release list URL (`GET /repos/{owner}/{repo}/releases`)
pub fn build_gh_releases_url(api_base: &str, owner: &str, repo: &str) -> String {
    format!("{}/releases", build_gh_repo_url(api_base, owner, repo))
}

/// reqwest-backed client. The token is only attached to requests under
/// `api_base`; anything else (the directory document) goes out anonymously.
#[derive(Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    token: Arc<RwLock<Option<String>>>,
}

impl GitHubClient {
    pub fn new(api_base: impl Into<String>, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("ghstore/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        if token.is_some() {
            tracing::debug!("Using GitHub token for API requests");
        }

        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(token)),
        }
    }

    pub fn anonymous(api_base: impl Into<String>) -> Self {
        Self::new(api_base, None)
    }

    /// Stop authenticating. Clones share the token, so this affects them too.
    pub fn clear_token(&self) {
        if self.token.write().unwrap_or_else(|e| e.into_inner()).take().is_some() {
            tracing::info!("Dropped the rejected GitHub token; continuing unauthenticated");
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// `Authorization` header value for `url`, if it should carry one.
    fn authorization(&self, url: &str) -> Option<String> {
        if !is_under(url, &self.api_base) {
            return None;
        }
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|token| format!("token {}", token))
    }
}

fn is_under(url: &str, base: &str) -> bool {
    url.strip_prefix(base)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
}

impl Fetch for GitHubClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        tracing::debug!("GET {}", url);

        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github.v3+json");

        if let Some(auth) = self.authorization(url) {
            request = request.header("Authorization", auth);
        }

        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport)?;

        Ok(HttpResponse { status, body })
    }
}
