use super::github::{get_json, Fetch};
use crate::types::{Directory, RepoEntry};
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Where the list of catalogued repositories comes from: a remote JSON
/// document, with a local copy used when the remote is unreachable.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    pub url: String,
    pub fallback: Option<PathBuf>,
}

impl DirectorySource {
    pub fn new(url: impl Into<String>, fallback: Option<PathBuf>) -> Self {
        Self {
            url: url.into(),
            fallback,
        }
    }

    /// Fetch the directory. The remote document is never cached.
    pub async fn load<F: Fetch>(&self, fetcher: &F) -> Result<Vec<RepoEntry>> {
        match get_json(fetcher, &self.url).await {
            Ok(value) => match serde_json::from_value::<Directory>(value) {
                Ok(directory) => {
                    let entries = directory.entries();
                    tracing::info!("Loaded {} directory entries from {}", entries.len(), self.url);
                    return Ok(entries);
                }
                Err(e) => tracing::warn!("Directory at {} has unexpected shape: {}", self.url, e),
            },
            Err(e) => tracing::warn!("Could not fetch directory: {}", e),
        }

        self.load_fallback()
    }

    fn load_fallback(&self) -> Result<Vec<RepoEntry>> {
        let path = self.fallback.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "Directory {} is unreachable and no local fallback is configured",
                self.url
            )
        })?;

        tracing::info!("Using local directory copy at {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read directory file at {}", path.display()))?;
        let directory: Directory = serde_json::from_str(&content)
            .with_context(|| format!("Could not parse directory file {}", path.display()))?;
        Ok(directory.entries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::source::github::HttpResponse;

    struct Offline;

    impl Fetch for Offline {
        async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
            Err(FetchError::Transport {
                url: url.to_string(),
                message: "connection refused".to_string(),
            })
        }
    }

    struct Online(&'static str);

    impl Fetch for Online {
        async fn get(&self, _url: &str) -> Result<HttpResponse, FetchError> {
            Ok(HttpResponse::ok(self.0))
        }
    }

    #[tokio::test]
    async fn test_remote_directory_wins() {
        let source = DirectorySource::new("https://example.invalid/repos.json", None);
        let repos = source
            .load(&Online(r#"{"repos":[{"owner":"a","repo":"b"}]}"#))
            .await
            .unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].repo.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_bad_entry_does_not_reject_the_document() {
        let source = DirectorySource::new("https://example.invalid/repos.json", None);
        let repos = source
            .load(&Online(
                r#"{"repos":[
                    {"owner":"a","repo":"b"},
                    {"owner":42,"repo":"e"},
                    {"owner":"c","repo":"d","os_overrides":{"deck":["linux"]}}
                ]}"#,
            ))
            .await
            .unwrap();

        let names: Vec<&str> = repos.iter().filter_map(|r| r.repo.as_deref()).collect();
        assert_eq!(names, vec!["b", "d"]);
        assert!(repos[1].os_overrides.is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_to_local_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repos.json");
        fs::write(&path, r#"{"repos":[{"owner":"x","repo":"y","display_name":"Y"}]}"#).unwrap();

        let source = DirectorySource::new("https://example.invalid/repos.json", Some(path));
        let repos = source.load(&Offline).await.unwrap();
        assert_eq!(repos[0].display_name.as_deref(), Some("Y"));
    }

    #[tokio::test]
    async fn test_no_fallback_is_an_error() {
        let source = DirectorySource::new("https://example.invalid/repos.json", None);
        assert!(source.load(&Offline).await.is_err());
    }
}
