mod config;
mod database;
mod entities;
mod library;
mod logging;
mod ports;
mod query;
mod services;
mod sync;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{Context, OptionExt, eyre},
};

use crate::{
    config::Config,
    database::Database,
    library::Library,
    logging::setup_logging,
    ports::access_token::StaticAccessToken,
    query::QueryPlanner,
    services::{playlist_ids::SqlitePlaylistIdStore, spotify::SpotifyHttpAdapter},
    sync::{
        PlaylistAdapter, RateLimitedExecutor, Reconciler, SyncRunner, orchestrator::select_specs,
    },
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "LIBRARY_SYNC_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Console log level
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// File log level
    #[arg(long, default_value = "debug", global = true)]
    log_file_level: log::LevelFilter,

    /// Path to log file
    #[arg(long, env = "LIBRARY_SYNC_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile the configured playlists with the remote service
    Sync {
        /// Only sync the playlists with these names (repeatable)
        #[arg(long = "only")]
        only: Vec<String>,

        /// Bearer token for the remote API
        #[arg(long, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,
    },
    /// Print the track IDs a configured playlist resolves to, without touching the remote
    Plan {
        /// Name of the playlist in the config
        #[arg(short, long)]
        name: String,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(&path),
        None => Config::load(),
    }
    .with_context(|| "Failed to load library-sync config")
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    setup_logging(args.log_level, args.log_file.clone(), args.log_file_level)?;

    log::debug!("library-sync starting");

    match args.command {
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                log::debug!("Creating default config");
                let path = Config::create_default()?;
                println!("{}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        },
        Commands::Plan { name } => {
            let config = load_config(args.config)?;
            let spec = config
                .playlist(&name)
                .ok_or_eyre(format!("No playlist named '{}' in the configuration", name))?;

            let library = Library::load(&config.library_path())?;
            let planner =
                QueryPlanner::new(&library).with_default_sort(config.query.default_sort.clone());
            let track_ids = planner
                .resolve_target(spec)
                .wrap_err_with(|| format!("Invalid playlist '{}'", name))?;

            for track_id in &track_ids {
                println!("{}", track_id);
            }
            log::info!("'{}' resolves to {} tracks", name, track_ids.len());
        }
        Commands::Sync { only, access_token } => {
            let config = load_config(args.config)?;
            let specs = select_specs(&config.playlists, &only)?;

            let library = Library::load(&config.library_path())?;
            if library.is_empty() {
                log::warn!("Library is empty, every filter will fail validation");
            }
            let planner =
                QueryPlanner::new(&library).with_default_sort(config.query.default_sort.clone());

            log::debug!("Opening database at: {}", config.database_path().display());
            let database = Arc::new(Database::open(&config.database_path()).await?);
            let playlist_ids = SqlitePlaylistIdStore::new(database);

            let rate_limit = &config.rate_limit;
            let executor = Arc::new(RateLimitedExecutor::new(
                rate_limit.max_concurrent_calls,
                rate_limit.min_interval,
                rate_limit.call_timeout,
            )?);
            let api = SpotifyHttpAdapter::new(
                config.api_base()?,
                StaticAccessToken::new(access_token),
            );
            let adapter = PlaylistAdapter::new(api, executor);

            let reconciler = Reconciler::new(&planner, &adapter, &playlist_ids, &config.owner_id)
                .with_max_conflict_retries(config.sync.max_conflict_retries);
            let runner = SyncRunner::new(reconciler, config.sync.concurrency);

            let summary = runner.run(&specs).await;
            println!("{}", summary);

            if summary.has_failures() {
                return Err(eyre!(
                    "{} of {} playlists failed to sync",
                    summary.count(sync::SpecStatus::Failed),
                    summary.outcomes.len()
                ));
            }
        }
    }

    Ok(())
}
