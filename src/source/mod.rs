//! Upstream data sources
//!
//! - GitHub REST API (repository info and release lists)
//! - The repository directory document

pub mod directory;
pub mod github;

pub use directory::DirectorySource;
pub use github::{build_gh_releases_url, build_gh_repo_url, get_json, Fetch, GitHubClient, HttpResponse};
