use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Os {
    Windows,
    MacOs,
    Linux,
}

impl Os {
    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Windows => "WINDOWS",
            Os::MacOs => "MACOS",
            Os::Linux => "LINUX",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Os {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "windows" | "win" | "win32" => Ok(Os::Windows),
            "macos" | "mac" | "osx" | "darwin" => Ok(Os::MacOs),
            "linux" | "lin" => Ok(Os::Linux),
            other => Err(format!("unknown operating system '{}'", other)),
        }
    }
}

impl Serialize for Os {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Os {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arch {
    X64,
    Arm64,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x64" | "x86_64" | "amd64" => Ok(Arch::X64),
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            other => Err(format!("unknown architecture '{}'", other)),
        }
    }
}

impl Serialize for Arch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Arch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformInfo {
    pub os: Os,
    pub arch: Arch,
}

/// Per-repository OS overrides, kept in document order.
///
/// The first key that occurs in an asset name decides the OS, so the order
/// of the source document matters and a plain hash map would lose it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsOverrides(Vec<(String, Os)>);

impl OsOverrides {
    pub fn new(rules: Vec<(String, Os)>) -> Self {
        Self(rules)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Os)> {
        self.0.iter()
    }

    /// Returns the OS of the first rule whose key is a case-insensitive
    /// substring of `name_lower`.
    pub fn lookup(&self, name_lower: &str) -> Option<Os> {
        self.0
            .iter()
            .find(|(key, _)| name_lower.contains(&key.to_lowercase()))
            .map(|(_, os)| *os)
    }
}

impl Serialize for OsOverrides {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, os) in &self.0 {
            map.serialize_entry(key, os)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OsOverrides {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OverridesVisitor;

        impl<'de> Visitor<'de> for OverridesVisitor {
            type Value = OsOverrides;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of asset-name substrings to operating systems")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut rules = Vec::new();
                while let Some((key, value)) = access.next_entry::<String, serde_json::Value>()? {
                    let os = match &value {
                        serde_json::Value::String(name) => name.parse::<Os>(),
                        other => Err(format!("expected an OS name, got {}", other)),
                    };
                    match os {
                        Ok(os) => rules.push((key, os)),
                        Err(e) => tracing::warn!("Ignoring OS override '{}': {}", key, e),
                    }
                }
                Ok(OsOverrides(rules))
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(OsOverrides::default())
            }
        }

        deserializer.deserialize_any(OverridesVisitor)
    }
}

/// One entry of the repository directory document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RepoEntry {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub os_overrides: OsOverrides,
}

/// The repository directory document. Entries stay raw until [`Directory::entries`]
/// so one malformed entry can't reject the whole document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Directory {
    #[serde(default)]
    pub repos: Vec<serde_json::Value>,
}

impl Directory {
    /// Decode every entry, skipping the ones that don't fit `RepoEntry`.
    pub fn entries(self) -> Vec<RepoEntry> {
        self.repos
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<RepoEntry>(raw.clone()) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping malformed directory entry {}: {}", raw, e);
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitHubAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitHubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
}

/// The subset of `GET /repos/{owner}/{repo}` the catalog cares about.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GitHubRepoInfo {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stargazers_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub id: String,
    pub title: String,
    pub repo: String,
    pub author: String,
    pub description: String,
    pub stars: u64,
    pub releases: Vec<GitHubRelease>,
    pub icon: String,
    pub os_overrides: OsOverrides,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedCandidate {
    pub os: Os,
    pub arch: Arch,
    pub ext: String,
    pub url: String,
    pub size: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstalledApp {
    pub id: String,
    pub title: String,
    pub path: String,
    #[serde(default)]
    pub url: Option<String>,
    pub installed_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    #[serde(rename = "os-arch")]
    #[default]
    OsArch,
    #[serde(rename = "os-ext")]
    OsExt,
}

impl FromStr for DedupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "os-arch" => Ok(DedupPolicy::OsArch),
            "os-ext" => Ok(DedupPolicy::OsExt),
            other => Err(format!("unknown dedup policy '{}'", other)),
        }
    }
}

impl fmt::Display for DedupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupPolicy::OsArch => f.write_str("os-arch"),
            DedupPolicy::OsExt => f.write_str("os-ext"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreSettings {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_directory_url")]
    pub directory_url: String,
    #[serde(default)]
    pub directory_fallback: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub dedup: DedupPolicy,
}

fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_cache_max_entries() -> usize {
    256
}
fn default_refresh_interval_secs() -> u64 {
    3600
}
fn default_page_size() -> usize {
    50
}
fn default_directory_url() -> String {
    "https://github.com/Forbirdden/beery/repos.json".to_string()
}
fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_max_entries: default_cache_max_entries(),
            refresh_interval_secs: default_refresh_interval_secs(),
            page_size: default_page_size(),
            directory_url: default_directory_url(),
            directory_fallback: None,
            api_base: default_api_base(),
            dedup: DedupPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub settings: StoreSettings,
}
