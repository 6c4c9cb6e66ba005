//! ghstore - a catalog and installer for GitHub Releases
//!
//! The crate turns a directory of GitHub repositories into a searchable
//! catalog of installable apps:
//!
//! - [`source`]: the directory document and the GitHub REST API
//! - [`cache`]: TTL cache in front of every API lookup
//! - [`loader`]: builds [`types::App`] records from directory entries
//! - [`resolver`]: classifies release assets by OS and architecture
//! - [`catalog`]: published snapshot plus search and pagination
//! - [`registry`]: persisted record of installed apps
//! - [`refresh`]: periodic reload of the whole catalog

pub mod app_id;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod loader;
pub mod platform;
pub mod refresh;
pub mod registry;
pub mod resolver;
pub mod source;
pub mod token;
pub mod types;

pub use app_id::AppIdentifier;
pub use cache::{CacheOptions, Clock, ManualClock, SystemClock, TtlCache};
pub use catalog::{view, Catalog, CatalogPage, CatalogSnapshot, Tab, ViewState};
pub use error::{ApiSignal, FetchError};
pub use loader::MetadataLoader;
pub use refresh::Refresher;
pub use registry::{InstallRegistry, InstallStore, JsonFileStore, MemoryStore};
pub use resolver::{best_match, compatible_install, resolve};
pub use source::{DirectorySource, Fetch, GitHubClient, HttpResponse};
pub use types::{
    App, Arch, DedupPolicy, GitHubAsset, GitHubRelease, InstalledApp, Os, OsOverrides,
    PlatformInfo, RepoEntry, ResolvedCandidate,
};
