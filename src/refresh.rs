use crate::cache::TtlCache;
use crate::catalog::{Catalog, CatalogSnapshot};
use crate::loader::MetadataLoader;
use crate::source::{DirectorySource, Fetch};
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Reloads the directory and every app, then publishes the batch as one
/// snapshot.
pub struct Refresher<F> {
    cache: Arc<TtlCache<F>>,
    directory: DirectorySource,
    catalog: Arc<Catalog>,
    api_base: String,
}

impl<F: Fetch> Refresher<F> {
    pub fn new(
        cache: Arc<TtlCache<F>>,
        directory: DirectorySource,
        catalog: Arc<Catalog>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            directory,
            catalog,
            api_base: api_base.into(),
        }
    }

    pub fn cache(&self) -> &Arc<TtlCache<F>> {
        &self.cache
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// One full cycle. Returns the published snapshot, or `None` when a
    /// newer refresh got there first.
    pub async fn refresh_once(&self) -> Result<Option<Arc<CatalogSnapshot>>> {
        let generation = self.catalog.begin_refresh();
        tracing::debug!("Starting refresh {}", generation);

        let entries = self.directory.load(self.cache.fetcher()).await?;
        let apps = MetadataLoader::new(&self.cache, self.api_base.clone())
            .load_all(&entries)
            .await;

        if self.catalog.publish(generation, apps) {
            let snapshot = self.catalog.snapshot();
            tracing::info!("Published catalog with {} app(s)", snapshot.apps.len());
            Ok(Some(snapshot))
        } else {
            Ok(None)
        }
    }

    /// Refresh immediately and then every `every` until `shutdown` resolves.
    /// A failed cycle keeps the previous snapshot.
    pub async fn run<S, P>(&self, every: Duration, shutdown: S, mut on_publish: P)
    where
        S: Future<Output = ()>,
        P: FnMut(&CatalogSnapshot),
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Stopping periodic refresh");
                    break;
                }
                _ = ticker.tick() => {
                    match self.refresh_once().await {
                        Ok(Some(snapshot)) => on_publish(&snapshot),
                        Ok(None) => {}
                        Err(e) => tracing::warn!("Repo update failed: {:#}", e),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheOptions;
    use crate::error::FetchError;
    use crate::source::HttpResponse;

    struct Upstream;

    impl Fetch for Upstream {
        async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
            let body = match url {
                "https://dir.test/repos.json" => {
                    r#"{"repos":[{"owner":"a","repo":"b"},{"owner":"c","repo":"d"},{"repo":"broken"}]}"#
                }
                "https://api.test/repos/a/b" => r#"{"stargazers_count":1}"#,
                "https://api.test/repos/c/d" => r#"{"stargazers_count":9}"#,
                _ => "[]",
            };
            Ok(HttpResponse::ok(body))
        }
    }

    fn refresher() -> Refresher<Upstream> {
        Refresher::new(
            Arc::new(TtlCache::new(Upstream, CacheOptions::default())),
            DirectorySource::new("https://dir.test/repos.json", None),
            Arc::new(Catalog::new()),
            "https://api.test",
        )
    }

    #[tokio::test]
    async fn test_refresh_publishes_sorted_batch() {
        let refresher = refresher();
        let snapshot = refresher.refresh_once().await.unwrap().unwrap();

        let ids: Vec<&str> = snapshot.apps.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["c/d", "a/b"]);
        assert_eq!(refresher.catalog().snapshot().generation, snapshot.generation);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let refresher = refresher();
        let mut published = 0;

        refresher
            .run(
                Duration::from_millis(10),
                tokio::time::sleep(Duration::from_millis(35)),
                |_| published += 1,
            )
            .await;

        assert!(published >= 1);
        assert_eq!(refresher.catalog().snapshot().apps.len(), 2);
    }
}
