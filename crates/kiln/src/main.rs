//! kiln CLI - task-graph build pipeline for static sites.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use kiln_pipeline::{SiteConfig, TaskId};

mod commands;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Build, lint and serve static sites through a task graph")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to kiln.toml config file
    #[arg(short, long, default_value = "kiln.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean, assemble, lint, compile, bundle and optimize into dist
    Build,

    /// Serve sources with live reload and rebuild on change
    #[command(name = "run:dev", alias = "dev")]
    RunDev {
        /// Port to listen on (defaults to config or 9000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Build, then serve dist with live reload
    #[command(name = "run:prod", alias = "prod")]
    RunProd {
        /// Port to listen on (defaults to config or 9090)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run tasks by name as one sequence
    Task {
        /// Task names, e.g. `clean sass`
        #[arg(required = true)]
        names: Vec<TaskId>,
    },

    /// List tasks with their prerequisites
    Tasks,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    if let Commands::Tasks = cli.command {
        return commands::tasks::run();
    }

    let config = SiteConfig::load(&cli.config)?;

    match cli.command {
        Commands::Build => {
            commands::build::run(config).await?;
        }
        Commands::RunDev { port } => {
            commands::dev::run(config, port).await?;
        }
        Commands::RunProd { port } => {
            commands::prod::run(config, port).await?;
        }
        Commands::Task { names } => {
            commands::task::run(config, names).await?;
        }
        Commands::Tasks => {}
    }

    Ok(())
}
