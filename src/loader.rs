//! Builds `App` records from directory entries.

use crate::cache::TtlCache;
use crate::source::github::{build_gh_releases_url, build_gh_repo_url, Fetch};
use crate::types::*;
use futures_util::future::join_all;
use serde_json::Value;
use std::cmp::Ordering;

pub const DEFAULT_DESCRIPTION: &str = "No description available";
pub const DEFAULT_ICON: &str = "logo1x1.png";

pub struct MetadataLoader<'a, F> {
    cache: &'a TtlCache<F>,
    api_base: String,
}

impl<'a, F: Fetch> MetadataLoader<'a, F> {
    pub fn new(cache: &'a TtlCache<F>, api_base: impl Into<String>) -> Self {
        Self {
            cache,
            api_base: api_base.into(),
        }
    }

    /// Load one directory entry. Lookup failures fall back to defaults; only
    /// an entry without owner or repo yields `None`.
    pub async fn load(&self, entry: &RepoEntry) -> Option<App> {
        let (owner, repo) = match (non_empty(&entry.owner), non_empty(&entry.repo)) {
            (Some(owner), Some(repo)) => (owner, repo),
            _ => {
                tracing::error!("Invalid repo entry (missing owner or repo): {:?}", entry);
                return None;
            }
        };

        let releases_url = build_gh_releases_url(&self.api_base, owner, repo);
        let repo_url = build_gh_repo_url(&self.api_base, owner, repo);

        let (releases, repo_info) = tokio::join!(
            self.cache.get_or_fetch(&releases_url),
            self.cache.get_or_fetch(&repo_url)
        );

        let releases = releases.map(parse_releases).unwrap_or_default();
        let repo_info: GitHubRepoInfo = repo_info
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        tracing::debug!("Loaded {}/{}: {} release(s)", owner, repo, releases.len());

        Some(App {
            id: format!("{}/{}", owner, repo),
            title: non_empty(&entry.display_name).unwrap_or(repo).to_string(),
            repo: repo.to_string(),
            author: owner.to_string(),
            description: repo_info
                .description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            stars: repo_info.stargazers_count.unwrap_or(0),
            releases,
            icon: non_empty(&entry.icon).unwrap_or(DEFAULT_ICON).to_string(),
            os_overrides: entry.os_overrides.clone(),
        })
    }

    /// Load every entry concurrently, drop the failures and sort the rest.
    pub async fn load_all(&self, entries: &[RepoEntry]) -> Vec<App> {
        let loaded = join_all(entries.iter().map(|entry| self.load(entry))).await;
        let mut apps: Vec<App> = loaded.into_iter().flatten().collect();
        sort_apps(&mut apps);

        tracing::info!("Loaded {} of {} directory entries", apps.len(), entries.len());
        apps
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Decode a release list, skipping individual releases that don't parse.
fn parse_releases(value: Value) -> Vec<GitHubRelease> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(release) => Some(release),
                Err(e) => {
                    tracing::warn!("Skipping unreadable release: {}", e);
                    None
                }
            })
            .collect(),
        other => {
            tracing::warn!("Expected a release list, got: {}", other);
            Vec::new()
        }
    }
}

/// Stars descending, then title (case-insensitive first), then author.
pub fn compare_apps(a: &App, b: &App) -> Ordering {
    b.stars
        .cmp(&a.stars)
        .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.author.cmp(&b.author))
}

pub fn sort_apps(apps: &mut [App]) {
    apps.sort_by(compare_apps);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheOptions;
    use crate::error::FetchError;
    use crate::source::github::HttpResponse;
    use std::collections::HashMap;

    struct Routes(HashMap<String, HttpResponse>);

    impl Routes {
        fn new(routes: &[(&str, u16, &str)]) -> Self {
            Self(
                routes
                    .iter()
                    .map(|(url, status, body)| {
                        (
                            url.to_string(),
                            HttpResponse {
                                status: *status,
                                body: body.to_string(),
                            },
                        )
                    })
                    .collect(),
            )
        }
    }

    impl Fetch for Routes {
        async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
            Ok(self.0.get(url).cloned().unwrap_or(HttpResponse {
                status: 404,
                body: String::new(),
            }))
        }
    }

    fn entry(owner: &str, repo: &str) -> RepoEntry {
        RepoEntry {
            owner: Some(owner.to_string()),
            repo: Some(repo.to_string()),
            ..Default::default()
        }
    }

    fn app(title: &str, author: &str, stars: u64) -> App {
        App {
            id: format!("{}/{}", author, title),
            title: title.to_string(),
            repo: title.to_string(),
            author: author.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            stars,
            releases: Vec::new(),
            icon: DEFAULT_ICON.to_string(),
            os_overrides: OsOverrides::default(),
        }
    }

    #[tokio::test]
    async fn test_load_builds_app() {
        let cache = TtlCache::new(
            Routes::new(&[
                (
                    "https://api.test/repos/a/b",
                    200,
                    r#"{"description":"A tool","stargazers_count":42}"#,
                ),
                (
                    "https://api.test/repos/a/b/releases",
                    200,
                    r#"[{"tag_name":"v2","assets":[]},{"tag_name":"v1","assets":[]}]"#,
                ),
            ]),
            CacheOptions::default(),
        );
        let loader = MetadataLoader::new(&cache, "https://api.test");

        let mut e = entry("a", "b");
        e.display_name = Some("Bee".to_string());
        let app = loader.load(&e).await.unwrap();

        assert_eq!(app.id, "a/b");
        assert_eq!(app.title, "Bee");
        assert_eq!(app.repo, "b");
        assert_eq!(app.author, "a");
        assert_eq!(app.description, "A tool");
        assert_eq!(app.stars, 42);
        assert_eq!(app.icon, DEFAULT_ICON);
        let tags: Vec<&str> = app.releases.iter().map(|r| r.tag_name.as_str()).collect();
        assert_eq!(tags, vec!["v2", "v1"]);
    }

    #[tokio::test]
    async fn test_failed_lookups_degrade_to_defaults() {
        let cache = TtlCache::new(Routes::new(&[]), CacheOptions::default());
        let loader = MetadataLoader::new(&cache, "https://api.test");

        let app = loader.load(&entry("a", "b")).await.unwrap();
        assert_eq!(app.title, "b");
        assert_eq!(app.description, DEFAULT_DESCRIPTION);
        assert_eq!(app.stars, 0);
        assert!(app.releases.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_entries_are_rejected() {
        let cache = TtlCache::new(Routes::new(&[]), CacheOptions::default());
        let loader = MetadataLoader::new(&cache, "https://api.test");

        let missing_owner = RepoEntry {
            repo: Some("b".to_string()),
            ..Default::default()
        };
        assert!(loader.load(&missing_owner).await.is_none());
        assert!(loader.load(&entry("a", "  ")).await.is_none());

        let apps = loader
            .load_all(&[missing_owner, entry("a", "b")])
            .await;
        assert_eq!(apps.len(), 1);
        assert_eq!(cache.request_count(), 2);
    }

    #[test]
    fn test_sort_is_total() {
        let mut apps = vec![
            app("zed", "x", 10),
            app("alpha", "y", 10),
            app("alpha", "b", 10),
            app("mid", "m", 99),
            app("Beta", "q", 10),
        ];
        sort_apps(&mut apps);
        let order: Vec<(&str, &str)> = apps
            .iter()
            .map(|a| (a.title.as_str(), a.author.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("mid", "m"),
                ("alpha", "b"),
                ("alpha", "y"),
                ("Beta", "q"),
                ("zed", "x")
            ]
        );
    }

    #[test]
    fn test_parse_releases_skips_bad_items() {
        let value = serde_json::json!([{"tag_name": "v1"}, {"name": "no tag"}]);
        let releases = parse_releases(value);
        assert_eq!(releases.len(), 1);
        assert!(parse_releases(serde_json::json!({"message": "Not Found"})).is_empty());
    }
}
