mod cli;

use anyhow::{anyhow, Result};
use clap::Parser;
use cli::{Cli, Commands, ConfigAction};
use ghstore::catalog::{view, Catalog, CatalogSnapshot, Tab, ViewState};
use ghstore::config::{
    effective_settings, get_directory_fallback, get_registry_file_path, get_setting,
    get_token_file_path, load_store_config, save_store_config, set_setting, unset_setting,
    SETTING_KEYS,
};
use ghstore::platform::resolve_platform;
use ghstore::registry::{InstallRegistry, JsonFileStore};
use ghstore::resolver::{best_match, compatible_install, format_bytes, resolve};
use ghstore::token::{current_token, FileTokenStore, TokenStore, TOKEN_ENV_VARS};
use ghstore::types::{App, PlatformInfo, StoreSettings};
use ghstore::{
    ApiSignal, AppIdentifier, CacheOptions, DirectorySource, GitHubClient, Refresher, TtlCache,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli)?;

    // Load configuration
    let mut config = load_store_config()?;
    let settings = effective_settings(&config);
    let token_store = FileTokenStore::new(get_token_file_path()?);

    match cli.command {
        Commands::Version => {
            println!("ghstore v{}", env!("CARGO_PKG_VERSION"));
        }

        Commands::Platform => {
            let platform = resolve_platform(cli.os.as_deref(), cli.arch.as_deref())?;
            println!("{} {}", platform.os, platform.arch);
        }

        Commands::List {
            search,
            installed,
            page,
        } => {
            let platform = resolve_platform(cli.os.as_deref(), cli.arch.as_deref())?;
            let (refresher, mut signals) = open_catalog(&settings, &token_store)?;
            let snapshot = refresh(&refresher).await?;
            handle_signals(&mut signals, &token_store, refresher.cache().fetcher());

            let registry = InstallRegistry::open(JsonFileStore::new(get_registry_file_path()?))?;
            let installed_ids = registry.installed_ids();

            let mut state = ViewState::new(settings.page_size);
            if let Some(search) = search {
                state.set_search(&search);
            }
            if installed {
                state.set_tab(Tab::Installed);
            }
            state.set_page(page);

            print_catalog_page(&snapshot, &state, &installed_ids, &platform, &settings);
        }

        Commands::Show { app_id } => {
            let platform = resolve_platform(cli.os.as_deref(), cli.arch.as_deref())?;
            let identifier = AppIdentifier::parse(&app_id)
                .map_err(|e| anyhow!("Invalid app identifier: {}", e))?;

            let (refresher, mut signals) = open_catalog(&settings, &token_store)?;
            refresh(&refresher).await?;
            handle_signals(&mut signals, &token_store, refresher.cache().fetcher());

            let app = find_app(refresher.catalog(), &identifier.id())?;
            print_app_details(&app, identifier.tag.as_deref(), &platform, &settings);
        }

        Commands::Install { app_id, path } => {
            let platform = resolve_platform(cli.os.as_deref(), cli.arch.as_deref())?;
            let identifier = AppIdentifier::parse(&app_id)
                .map_err(|e| anyhow!("Invalid app identifier: {}", e))?;

            let (refresher, mut signals) = open_catalog(&settings, &token_store)?;
            refresh(&refresher).await?;
            handle_signals(&mut signals, &token_store, refresher.cache().fetcher());

            let app = find_app(refresher.catalog(), &identifier.id())?;
            let candidate =
                compatible_install(&app, identifier.tag.as_deref(), &platform, settings.dedup)
                    .ok_or_else(|| {
                        anyhow!(
                            "No compatible asset for {} on {} {}",
                            identifier,
                            platform.os,
                            platform.arch
                        )
                    })?;

            let mut registry =
                InstallRegistry::open(JsonFileStore::new(get_registry_file_path()?))?;
            let record = registry.install(&app, &candidate.url, &path)?;

            println!(
                "Installing {} ({}) to {}",
                record.title, candidate.name, record.path
            );
            println!("  Download: {} ({})", candidate.url, format_bytes(candidate.size));
        }

        Commands::Uninstall { target } => {
            let mut registry =
                InstallRegistry::open(JsonFileStore::new(get_registry_file_path()?))?;
            if registry.uninstall(&target)? {
                println!("Removed {}", target);
            } else {
                println!("Nothing installed for {}", target);
            }
        }

        Commands::Installed => {
            let registry = InstallRegistry::open(JsonFileStore::new(get_registry_file_path()?))?;
            list_installed_apps(&registry);
        }

        Commands::Watch => {
            let platform = resolve_platform(cli.os.as_deref(), cli.arch.as_deref())?;
            let (refresher, mut signals) = open_catalog(&settings, &token_store)?;
            let every = Duration::from_secs(settings.refresh_interval_secs.max(1));

            tracing::info!("Refreshing the catalog every {:?}", every);
            let shutdown = async {
                let _ = tokio::signal::ctrl_c().await;
            };

            refresher
                .run(every, shutdown, |snapshot| {
                    let compatible = snapshot
                        .apps
                        .iter()
                        .filter(|app| {
                            compatible_install(app, None, &platform, settings.dedup).is_some()
                        })
                        .count();
                    println!(
                        "[{}] {} app(s) in catalog, {} installable on {} {}",
                        snapshot
                            .loaded_at
                            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                            .unwrap_or_default(),
                        snapshot.apps.len(),
                        compatible,
                        platform.os,
                        platform.arch
                    );
                    handle_signals(&mut signals, &token_store, refresher.cache().fetcher());
                })
                .await;
        }

        Commands::Login { token } => {
            token_store.set(&token)?;
            tracing::info!("Token stored");
            println!("Logged in. API requests now use your token.");
        }

        Commands::Logout => {
            token_store.delete()?;
            println!("Logged out.");
        }

        Commands::Config { action } => match action {
            ConfigAction::Get { key } => {
                if let Some(key) = key {
                    match get_setting(&config.settings, &key) {
                        Some(value) => println!("{}", value),
                        None => println!("Setting '{}' not found", key),
                    }
                } else {
                    println!("--- ghstore Settings ---");
                    for key in SETTING_KEYS {
                        if let Some(value) = get_setting(&config.settings, key) {
                            println!("  {}: {}", key, value);
                        }
                    }
                }
            }
            ConfigAction::Set { args } => {
                let (key, value) = match args.as_slice() {
                    [pair] => pair
                        .split_once('=')
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .ok_or_else(|| anyhow!("Invalid format. Use 'key=value'."))?,
                    [key, rest @ ..] => (key.clone(), rest.join(" ")),
                    [] => return Err(anyhow!("Invalid format. Use 'key=value'.")),
                };
                set_setting(&mut config.settings, &key, &value)?;
                save_store_config(&config)?;
                tracing::info!("Setting '{}' updated to '{}'", key, value);
            }
            ConfigAction::Unset { key } => {
                unset_setting(&mut config.settings, &key)?;
                save_store_config(&config)?;
                tracing::info!("Setting '{}' unset", key);
            }
            ConfigAction::Show { format } => match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&config)?),
                "yaml" => print!("{}", serde_yaml::to_string(&config)?),
                other => return Err(anyhow!("Unknown format '{}'. Use json or yaml.", other)),
            },
        },
    }

    Ok(())
}

fn setup_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.quiet {
        "error"
    } else if cli.verbose == 0 {
        "warn"
    } else if cli.verbose == 1 {
        "info"
    } else {
        "debug"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}

fn open_catalog(
    settings: &StoreSettings,
    token_store: &FileTokenStore,
) -> Result<(Refresher<GitHubClient>, UnboundedReceiver<ApiSignal>)> {
    let client = GitHubClient::new(settings.api_base.clone(), current_token(token_store)?);
    let (tx, rx) = unbounded_channel();

    let cache = TtlCache::new(
        client,
        CacheOptions {
            ttl: Duration::from_secs(settings.cache_ttl_secs),
            max_entries: settings.cache_max_entries,
        },
    )
    .with_signals(tx);

    let directory = DirectorySource::new(
        settings.directory_url.clone(),
        get_directory_fallback(settings)?,
    );

    let refresher = Refresher::new(
        Arc::new(cache),
        directory,
        Arc::new(Catalog::new()),
        settings.api_base.clone(),
    );
    Ok((refresher, rx))
}

async fn refresh(refresher: &Refresher<GitHubClient>) -> Result<Arc<CatalogSnapshot>> {
    refresher.refresh_once().await.map_err(|e| {
        tracing::error!("Failed to load application data: {:#}", e);
        e
    })?;
    Ok(refresher.catalog().snapshot())
}

fn handle_signals(
    signals: &mut UnboundedReceiver<ApiSignal>,
    token_store: &FileTokenStore,
    client: &GitHubClient,
) {
    let mut seen = HashSet::new();
    while let Ok(signal) = signals.try_recv() {
        if !seen.insert(signal) {
            continue;
        }
        match signal {
            ApiSignal::AuthInvalid => {
                // Later refreshes go out unauthenticated instead of failing again
                client.clear_token();
                let from_env = TOKEN_ENV_VARS.iter().any(|v| std::env::var(v).is_ok());
                if from_env {
                    eprintln!("GitHub rejected the token from the environment. Check GITHUB_TOKEN.");
                } else {
                    if let Err(e) = token_store.delete() {
                        tracing::warn!("Could not remove stored token: {}", e);
                    }
                    eprintln!("Your GitHub token is no longer valid. Run `ghstore login <token>` again.");
                }
            }
            ApiSignal::RateLimited => {
                eprintln!("GitHub API rate limit exceeded. Some apps may show incomplete data; `ghstore login` raises the limit.");
            }
        }
    }
}

fn find_app(catalog: &Catalog, id: &str) -> Result<App> {
    catalog
        .find(id)
        .ok_or_else(|| anyhow!("App '{}' is not in the catalog", id))
}

fn print_catalog_page(
    snapshot: &CatalogSnapshot,
    state: &ViewState,
    installed_ids: &HashSet<String>,
    platform: &PlatformInfo,
    settings: &StoreSettings,
) {
    let page = view(&snapshot.apps, state, installed_ids);

    println!("--- ghstore Catalog ---");
    if page.apps.is_empty() {
        println!("  No apps found.");
    }

    for app in &page.apps {
        let installed = if installed_ids.contains(&app.id) {
            " [installed]"
        } else {
            ""
        };
        let action = match compatible_install(app, None, platform, settings.dedup) {
            Some(_) if installed.is_empty() => "install",
            Some(_) => "reinstall",
            None => "no compatible download",
        };
        println!(
            "  - {} by {} ({} stars){}",
            app.title, app.author, app.stars, installed
        );
        println!("    {}", app.description);
        println!("    {} | {}\n", app.id, action);
    }

    println!(
        "Showing {} of {} app(s).",
        page.apps.len(),
        page.total_matches
    );
    if page.has_more {
        println!("More available: use --page {}", state.page() + 1);
    }
}

fn print_app_details(app: &App, tag: Option<&str>, platform: &PlatformInfo, settings: &StoreSettings) {
    println!("{} by {} ({} stars)", app.title, app.author, app.stars);
    println!("  {}", app.description);

    let releases: Vec<_> = match tag {
        Some(tag) => app.releases.iter().filter(|r| r.tag_name == tag).collect(),
        None => app.releases.iter().collect(),
    };

    if releases.is_empty() {
        println!("\n  No releases found.");
        return;
    }

    for release in releases {
        let candidates = resolve(&release.assets, &app.os_overrides, platform.arch, settings.dedup);
        let best = best_match(&candidates, platform);

        println!("\n  {}", release.tag_name);
        if candidates.is_empty() {
            println!("    No available downloads");
        }
        for candidate in &candidates {
            let marker = if Some(candidate) == best { "*" } else { " " };
            println!(
                "   {} {:<7} {:<5} .{} ({})  {}",
                marker,
                candidate.os,
                candidate.arch,
                candidate.ext,
                format_bytes(candidate.size),
                candidate.url
            );
        }
    }
}

fn list_installed_apps(registry: &InstallRegistry<JsonFileStore>) {
    println!("--- Installed Apps ---");
    if registry.apps().is_empty() {
        println!("  No apps installed yet.");
        return;
    }

    for app in registry.apps() {
        println!("  - {} ({})", app.title, app.id);
        println!("    Path:      {}", app.path);
        println!("    Installed: {}\n", app.installed_at);
    }
    println!("----------------------");
}
