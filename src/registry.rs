//! Persistent record of installed apps.
//!
//! The registry is stored as a whole: every mutation writes the complete
//! list back through an [`InstallStore`].

use crate::types::{App, InstalledApp};
use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Get-all / replace-all storage for installed apps.
pub trait InstallStore: Send + Sync {
    fn load_all(&self) -> Result<Vec<InstalledApp>>;
    fn replace_all(&self, apps: &[InstalledApp]) -> Result<()>;
}

/// JSON file, replaced atomically through a temp file in the same directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl InstallStore for JsonFileStore {
    fn load_all(&self) -> Result<Vec<InstalledApp>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Could not read install registry at {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).with_context(|| {
            format!(
                "Could not parse install registry at {}",
                self.path.display()
            )
        })
    }

    fn replace_all(&self, apps: &[InstalledApp]) -> Result<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Invalid registry path"))?;
        fs::create_dir_all(dir)?;

        let content = serde_json::to_string_pretty(apps)?;
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(content.as_bytes())?;
        staged.flush()?;
        staged
            .persist(&self.path)
            .with_context(|| format!("Could not write install registry to {}", self.path.display()))?;

        tracing::debug!("Saved {} installed app(s) to {}", apps.len(), self.path.display());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    apps: Mutex<Vec<InstalledApp>>,
}

impl InstallStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<InstalledApp>> {
        Ok(self.apps.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn replace_all(&self, apps: &[InstalledApp]) -> Result<()> {
        *self.apps.lock().unwrap_or_else(|e| e.into_inner()) = apps.to_vec();
        Ok(())
    }
}

pub struct InstallRegistry<S> {
    store: S,
    apps: Vec<InstalledApp>,
}

impl<S: InstallStore> InstallRegistry<S> {
    pub fn open(store: S) -> Result<Self> {
        let apps = store.load_all()?;
        tracing::debug!("Install registry holds {} app(s)", apps.len());
        Ok(Self { store, apps })
    }

    pub fn apps(&self) -> &[InstalledApp] {
        &self.apps
    }

    pub fn installed_ids(&self) -> HashSet<String> {
        self.apps.iter().map(|a| a.id.clone()).collect()
    }

    pub fn is_installed(&self, id: &str) -> bool {
        self.apps.iter().any(|a| a.id == id)
    }

    /// Record that `app` is being installed to `path`. This records intent:
    /// the download itself is not verified. A record already at `path` is
    /// replaced, so each path holds at most one app.
    pub fn install(&mut self, app: &App, artifact_url: &str, path: &str) -> Result<InstalledApp> {
        let record = InstalledApp {
            id: app.id.clone(),
            title: app.title.clone(),
            path: path.to_string(),
            url: Some(artifact_url.to_string()),
            installed_at: Utc::now().to_rfc3339(),
        };

        let mut next: Vec<InstalledApp> =
            self.apps.iter().filter(|a| a.path != path).cloned().collect();
        if next.len() != self.apps.len() {
            tracing::info!("Replacing previous install at {}", path);
        }
        next.push(record.clone());

        self.commit(next)?;
        tracing::info!("Recorded install of {} at {}", app.id, path);
        Ok(record)
    }

    /// Remove every record whose id or path equals `id_or_path`. Returns
    /// whether anything was removed; nothing is written otherwise.
    pub fn uninstall(&mut self, id_or_path: &str) -> Result<bool> {
        let next: Vec<InstalledApp> = self
            .apps
            .iter()
            .filter(|a| a.id != id_or_path && a.path != id_or_path)
            .cloned()
            .collect();

        if next.len() == self.apps.len() {
            tracing::debug!("Nothing installed for '{}'", id_or_path);
            return Ok(false);
        }

        self.commit(next)?;
        tracing::info!("Removed '{}' from the install registry", id_or_path);
        Ok(true)
    }

    /// Persist first, then swap in memory, so a failed write changes nothing.
    fn commit(&mut self, next: Vec<InstalledApp>) -> Result<()> {
        self.store.replace_all(&next)?;
        self.apps = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OsOverrides;

    fn app(id: &str) -> App {
        App {
            id: id.to_string(),
            title: id.rsplit('/').next().unwrap_or(id).to_string(),
            repo: String::new(),
            author: String::new(),
            description: String::new(),
            stars: 0,
            releases: Vec::new(),
            icon: String::new(),
            os_overrides: OsOverrides::default(),
        }
    }

    #[test]
    fn test_install_and_uninstall_by_path_or_id() {
        let mut registry = InstallRegistry::open(MemoryStore::default()).unwrap();
        registry.install(&app("a/one"), "https://dl/1", "/opt/one").unwrap();
        registry.install(&app("a/two"), "https://dl/2", "/opt/two").unwrap();
        assert!(registry.is_installed("a/one"));

        assert!(registry.uninstall("/opt/one").unwrap());
        assert!(!registry.is_installed("a/one"));

        assert!(registry.uninstall("a/two").unwrap());
        assert!(registry.apps().is_empty());
    }

    #[test]
    fn test_uninstall_missing_is_noop() {
        let mut registry = InstallRegistry::open(MemoryStore::default()).unwrap();
        registry.install(&app("a/one"), "https://dl/1", "/opt/one").unwrap();
        let before = registry.apps().to_vec();

        assert!(!registry.uninstall("/nowhere").unwrap());
        assert!(!registry.uninstall("/nowhere").unwrap());
        assert_eq!(registry.apps(), before.as_slice());
    }

    #[test]
    fn test_same_path_keeps_one_record() {
        let mut registry = InstallRegistry::open(MemoryStore::default()).unwrap();
        registry.install(&app("a/one"), "https://dl/1", "/opt/x").unwrap();
        registry.install(&app("a/one"), "https://dl/1b", "/opt/x").unwrap();
        assert_eq!(registry.apps().len(), 1);
        assert_eq!(registry.apps()[0].url.as_deref(), Some("https://dl/1b"));

        // Same app at a second path is a second, later record
        registry.install(&app("a/one"), "https://dl/1", "/opt/y").unwrap();
        let paths: Vec<&str> = registry.apps().iter().map(|a| a.path.as_str()).collect();
        assert_eq!(paths, vec!["/opt/x", "/opt/y"]);
    }

    #[test]
    fn test_json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("installed.json");

        {
            let mut registry = InstallRegistry::open(JsonFileStore::new(&path)).unwrap();
            registry.install(&app("a/one"), "https://dl/1", "/opt/one").unwrap();
        }

        let registry = InstallRegistry::open(JsonFileStore::new(&path)).unwrap();
        assert_eq!(registry.apps().len(), 1);
        assert_eq!(registry.apps()[0].title, "one");
        assert!(registry.installed_ids().contains("a/one"));
    }

    #[test]
    fn test_json_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("installed.json"));
        assert!(store.load_all().unwrap().is_empty());
    }
}
