use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ghstore")]
#[command(about = "A catalog and installer for applications published as GitHub Releases")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (use multiple times for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce output to errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Resolve assets for this OS instead of the host's (windows, macos, linux)
    #[arg(long, global = true)]
    pub os: Option<String>,

    /// Resolve assets for this architecture instead of the host's (x64, arm64)
    #[arg(long, global = true)]
    pub arch: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List catalogued apps
    List {
        /// Only show apps whose title, repo, author or description contains this text
        #[arg(short, long)]
        search: Option<String>,
        /// Only show installed apps
        #[arg(long)]
        installed: bool,
        /// Show the first N pages
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },

    /// Show releases and downloadable assets of an app
    Show {
        /// App to show (e.g., 'owner/repo' or 'owner/repo@v1.2.3')
        app_id: String,
    },

    /// Record an install of the asset compatible with this machine
    Install {
        /// App to install (e.g., 'owner/repo' or 'owner/repo@v1.2.3')
        app_id: String,
        /// Directory the app is installed to
        #[arg(long)]
        path: String,
    },

    /// Remove an installed app by id or install path
    Uninstall {
        /// 'owner/repo' or the install path
        target: String,
    },

    /// List installed apps
    Installed,

    /// Keep the catalog fresh, reloading it periodically
    Watch,

    /// Show the platform assets are resolved for
    Platform,

    /// Store a GitHub token used for API requests
    Login {
        /// Personal access token
        token: String,
    },

    /// Forget the stored GitHub token
    Logout,

    /// Manage ghstore's configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show the current version
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a configuration setting
    Get {
        /// Key to get (if omitted, shows all settings)
        key: Option<String>,
    },
    /// Set a configuration setting
    Set {
        /// Key and value (e.g., 'page-size=20' or 'page-size 20')
        #[arg(trailing_var_arg = true, required = true)]
        args: Vec<String>,
    },
    /// Reset a configuration setting to its default
    Unset {
        /// Key to unset (e.g., 'cache-ttl-secs')
        key: String,
    },
    /// Show full configuration
    Show {
        /// Output format (json, yaml)
        #[arg(long, default_value = "json")]
        format: String,
    },
}
