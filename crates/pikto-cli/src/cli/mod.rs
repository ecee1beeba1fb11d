//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use pikto_core::config::Config;
use pikto_core::logging;

mod commands;

#[derive(Parser)]
#[command(name = "pikto")]
#[command(version)]
#[command(about = "Terminal client for a photo feed service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in with an OAuth authorization code
    Login {
        /// Authorization code (or redirect URL); prompts on stdin if omitted
        #[arg(long, value_name = "CODE")]
        code: Option<String>,
    },
    /// Log out and clear the stored token
    Logout,
    /// Show the signed-in user's profile
    Profile {
        /// Print the profile as JSON
        #[arg(long)]
        json: bool,
    },
    /// Browse the editorial photo feed
    Feed {
        /// Number of pages to fetch
        #[arg(long, default_value_t = 1)]
        pages: u32,
        /// Print photos as JSON
        #[arg(long)]
        json: bool,
    },
    /// Browse your liked photos
    Likes {
        /// Number of pages to fetch
        #[arg(long, default_value_t = 1)]
        pages: u32,
        /// Print photos as JSON
        #[arg(long)]
        json: bool,
    },
    /// Like a photo
    Like {
        /// Photo ID
        #[arg(value_name = "PHOTO_ID")]
        id: String,
    },
    /// Remove a like from a photo
    Unlike {
        /// Photo ID
        #[arg(value_name = "PHOTO_ID")]
        id: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = logging::init().context("initialize logging")?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load().context("load config")?;

    match cli.command {
        Commands::Login { code } => commands::auth::login(&config, code).await,
        Commands::Logout => commands::auth::logout(&config),
        Commands::Profile { json } => commands::profile::run(&config, json).await,
        Commands::Feed { pages, json } => {
            commands::photos::browse(&config, pikto_core::catalog::Collection::Feed, pages, json)
                .await
        }
        Commands::Likes { pages, json } => {
            commands::photos::browse(&config, pikto_core::catalog::Collection::Likes, pages, json)
                .await
        }
        Commands::Like { id } => commands::photos::toggle(&config, &id, true).await,
        Commands::Unlike { id } => commands::photos::toggle(&config, &id, false).await,
        Commands::Config { command } => match command {
            ConfigCommands::Path => commands::config::path(),
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
