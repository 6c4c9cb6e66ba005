//! The published app list and the searchable, paginated view over it.

use crate::types::App;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

pub const DEFAULT_PAGE_SIZE: usize = 50;

/// One complete, immutable result of a refresh.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub generation: u64,
    pub apps: Vec<App>,
    pub loaded_at: Option<DateTime<Utc>>,
}

/// Holds the current snapshot. Readers get an `Arc` to a complete snapshot;
/// a refresh replaces it with a single pointer swap.
#[derive(Debug, Default)]
pub struct Catalog {
    current: RwLock<Arc<CatalogSnapshot>>,
    next_generation: AtomicU64,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Reserve a generation number for a refresh that is about to start.
    pub fn begin_refresh(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publish the result of refresh `generation`. Results of a refresh that
    /// started before the published one are dropped; returns whether the
    /// snapshot was replaced.
    pub fn publish(&self, generation: u64, apps: Vec<App>) -> bool {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        if generation <= current.generation {
            tracing::debug!(
                "Dropping stale refresh {} (published: {})",
                generation,
                current.generation
            );
            return false;
        }

        *current = Arc::new(CatalogSnapshot {
            generation,
            apps,
            loaded_at: Some(Utc::now()),
        });
        true
    }

    pub fn find(&self, id: &str) -> Option<App> {
        self.snapshot()
            .apps
            .iter()
            .find(|a| a.id.eq_ignore_ascii_case(id))
            .cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    All,
    Installed,
}

/// Search text, tab and page of the listing. Changing the search or the tab
/// goes back to the first page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    search: String,
    tab: Tab,
    page: usize,
    page_size: usize,
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            search: String::new(),
            tab: Tab::All,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_search(&mut self, search: &str) {
        self.search = search.trim().to_lowercase();
        self.page = 1;
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.page = 1;
    }

    pub fn next_page(&mut self) {
        self.page += 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn shown_limit(&self) -> usize {
        self.page.saturating_mul(self.page_size)
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug)]
pub struct CatalogPage<'a> {
    pub apps: Vec<&'a App>,
    pub total_matches: usize,
    pub has_more: bool,
}

pub fn matches_search(app: &App, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    [&app.title, &app.repo, &app.author, &app.description]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Filter, then reveal the first `page * page_size` matches.
pub fn view<'a>(apps: &'a [App], state: &ViewState, installed_ids: &HashSet<String>) -> CatalogPage<'a> {
    let needle = state.search.trim().to_lowercase();

    let filtered: Vec<&App> = apps
        .iter()
        .filter(|app| state.tab == Tab::All || installed_ids.contains(&app.id))
        .filter(|app| matches_search(app, &needle))
        .collect();

    let total_matches = filtered.len();
    let limit = state.shown_limit();
    let shown: Vec<&App> = filtered.into_iter().take(limit).collect();

    CatalogPage {
        has_more: total_matches > shown.len(),
        apps: shown,
        total_matches,
    }
}
