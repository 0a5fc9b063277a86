use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

use cli::AppContext;

#[derive(Parser)]
#[command(name = "mathdrill")]
#[command(about = "Mental math practice - timed, accuracy and audio drills with progress tracking")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.mathdrill/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the progress database (overrides [storage] database_path)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a practice session in the terminal
    Practice(cli::practice::PracticeArgs),

    /// Show progress statistics
    Stats(cli::stats::StatsArgs),

    /// List achievements and how close each one is
    Achievements {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change accessibility and audio settings
    Settings {
        #[command(subcommand)]
        action: Option<cli::settings::SettingsAction>,
    },

    /// Write all progress to a JSON file (stdout if no path)
    Export {
        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace all progress with an exported JSON file
    Import {
        /// File produced by `mathdrill export`
        file: PathBuf,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete all progress, achievements and settings
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Serve the progress store over a local REST API
    Serve(cli::serve::ServeArgs),

    /// Create ~/.mathdrill/config.toml with commented defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Loaded per command so `init` never auto-creates the file it is about to write
    let (config_path, db_path) = (cli.config, cli.db);
    let load = || AppContext::load(config_path.clone(), db_path.clone());

    match cli.command {
        Some(Commands::Practice(args)) => {
            cli::practice::practice_command(&load()?, args).await?;
        }
        None => {
            cli::practice::practice_command(&load()?, cli::practice::PracticeArgs::default()).await?;
        }
        Some(Commands::Stats(args)) => {
            cli::stats::stats_command(&load()?, args)?;
        }
        Some(Commands::Achievements { json }) => {
            cli::achievements::achievements_command(&load()?, json)?;
        }
        Some(Commands::Settings { action }) => {
            cli::settings::settings_command(&load()?, action)?;
        }
        Some(Commands::Export { output }) => {
            cli::data::export_command(&load()?, output.as_deref())?;
        }
        Some(Commands::Import { file, yes }) => {
            cli::data::import_command(&load()?, &file, yes)?;
        }
        Some(Commands::Clear { yes }) => {
            cli::data::clear_command(&load()?, yes)?;
        }
        Some(Commands::Serve(args)) => {
            cli::serve::serve_command(&load()?, args).await?;
        }
        Some(Commands::Init { force }) => {
            cli::init::init_command(config_path.as_deref(), force)?;
        }
    }

    Ok(())
}
