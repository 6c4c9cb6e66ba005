use ghstore::error::FetchError;
use ghstore::{
    compatible_install, Arch, CacheOptions, Catalog, DedupPolicy, DirectorySource, Fetch,
    HttpResponse, Os, PlatformInfo, Refresher, TtlCache,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const DIRECTORY_URL: &str = "https://dir.test/repos.json";
const API_BASE: &str = "https://api.test";

/// Serves canned responses and counts requests per URL.
struct Fixture {
    routes: HashMap<String, String>,
    hits: Mutex<HashMap<String, usize>>,
}

impl Fixture {
    fn new() -> Self {
        let mut routes = HashMap::new();
        routes.insert(
            DIRECTORY_URL.to_string(),
            r#"{"repos":[{"owner":"a","repo":"b"}]}"#.to_string(),
        );
        routes.insert(
            format!("{}/repos/a/b", API_BASE),
            r#"{"description":"Demo","stargazers_count":7}"#.to_string(),
        );
        routes.insert(
            format!("{}/repos/a/b/releases", API_BASE),
            r#"[{
                "tag_name": "v1.0.0",
                "assets": [
                    {"name": "app-win-x64.exe", "browser_download_url": "https://dl.test/app-win-x64.exe", "size": 1048576},
                    {"name": "app-win-x64.exe.blockmap", "browser_download_url": "https://dl.test/app-win-x64.exe.blockmap", "size": 512},
                    {"name": "app-linux-arm64.AppImage", "browser_download_url": "https://dl.test/app-linux-arm64.AppImage", "size": 2048}
                ]
            }]"#
            .to_string(),
        );
        Self {
            routes,
            hits: Mutex::new(HashMap::new()),
        }
    }

    fn hits(&self, url: &str) -> usize {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

impl Fetch for Fixture {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        *self.hits.lock().unwrap().entry(url.to_string()).or_default() += 1;
        Ok(match self.routes.get(url) {
            Some(body) => HttpResponse {
                status: 200,
                body: body.clone(),
            },
            None => HttpResponse {
                status: 404,
                body: String::new(),
            },
        })
    }
}

fn refresher() -> Refresher<Fixture> {
    Refresher::new(
        Arc::new(TtlCache::new(Fixture::new(), CacheOptions::default())),
        DirectorySource::new(DIRECTORY_URL, None),
        Arc::new(Catalog::new()),
        API_BASE,
    )
}

#[tokio::test]
async fn test_windows_x64_resolves_to_the_exe() {
    let refresher = refresher();
    let snapshot = refresher.refresh_once().await.unwrap().unwrap();
    assert_eq!(snapshot.apps.len(), 1);

    let app = &snapshot.apps[0];
    assert_eq!(app.id, "a/b");
    assert_eq!(app.stars, 7);

    let platform = PlatformInfo {
        os: Os::Windows,
        arch: Arch::X64,
    };
    let candidate = compatible_install(app, None, &platform, DedupPolicy::OsArch).unwrap();
    assert_eq!(candidate.os, Os::Windows);
    assert_eq!(candidate.arch, Arch::X64);
    assert_eq!(candidate.ext, "EXE");
    assert_eq!(candidate.url, "https://dl.test/app-win-x64.exe");
    assert_eq!(candidate.size, 1048576);
}

#[tokio::test]
async fn test_other_platforms() {
    let refresher = refresher();
    let snapshot = refresher.refresh_once().await.unwrap().unwrap();
    let app = &snapshot.apps[0];

    let mac = PlatformInfo {
        os: Os::MacOs,
        arch: Arch::X64,
    };
    assert!(compatible_install(app, None, &mac, DedupPolicy::OsArch).is_none());

    let linux = PlatformInfo {
        os: Os::Linux,
        arch: Arch::Arm64,
    };
    let candidate = compatible_install(app, Some("v1.0.0"), &linux, DedupPolicy::OsArch).unwrap();
    assert_eq!(candidate.ext, "APPIMAGE");
    assert_eq!(candidate.size, 2048);
}

#[tokio::test]
async fn test_second_refresh_reuses_cached_metadata() {
    let cache = Arc::new(TtlCache::new(Fixture::new(), CacheOptions::default()));
    let refresher = Refresher::new(
        cache.clone(),
        DirectorySource::new(DIRECTORY_URL, None),
        Arc::new(Catalog::new()),
        API_BASE,
    );

    let first = refresher.refresh_once().await.unwrap().unwrap();
    let second = refresher.refresh_once().await.unwrap().unwrap();
    assert!(second.generation > first.generation);
    assert_eq!(second.apps, first.apps);

    let fixture = cache.fetcher();
    assert_eq!(fixture.hits(DIRECTORY_URL), 2);
    assert_eq!(fixture.hits(&format!("{}/repos/a/b", API_BASE)), 1);
    assert_eq!(fixture.hits(&format!("{}/repos/a/b/releases", API_BASE)), 1);
}
