//! Chartwright CLI - compile deployment parameters into Helm charts and publish them

use chartwright::{ChartService, ConfigOverrides, ServiceConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod display;
mod error;
mod exit_codes;

use error::Result;

#[derive(Parser)]
#[command(name = "chartwright")]
#[command(author = "Chartwright Contributors")]
#[command(version)]
#[command(about = "Compile deployment parameters into Helm charts and publish them", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: <config dir>/chartwright/config.yaml)
    #[arg(long, global = true, env = "CHARTWRIGHT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory backing the repository store
    #[arg(long, global = true, env = "CHARTWRIGHT_STORE_ROOT")]
    store_root: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a chart and publish it into a repository
    Publish {
        /// Chart parameters (YAML, or JSON with a .json extension)
        params: PathBuf,

        /// Repository directory inside the store
        #[arg(short, long, env = "CHARTWRIGHT_REPOSITORY")]
        repo: Option<String>,
    },

    /// Validate chart values against the service schema
    Validate {
        /// Chart parameters
        params: PathBuf,

        /// Output validation results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compile a chart into a .tgz archive without publishing it
    Generate {
        /// Chart parameters
        params: PathBuf,

        /// Output file (default: ./<name>-<version>.tgz)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the charts published in a repository
    Index {
        /// Repository directory inside the store
        repo: String,

        /// Print the raw index.yaml
        #[arg(long)]
        yaml: bool,
    },
}

fn init_tracing() {
    let env = std::env::var("CHARTWRIGHT_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::try_new(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = ServiceConfig::load(cli.config.as_deref())?.with_overrides(ConfigOverrides {
        store_root: cli.store_root,
    });
    let service = ChartService::from_config(&config)?;

    match cli.command {
        Commands::Publish { params, repo } => {
            commands::publish::run(&service, &config, &params, repo.as_deref()).await
        }
        Commands::Validate { params, json } => commands::validate::run(&service, &params, json).await,
        Commands::Generate { params, output } => {
            commands::generate::run(&service, &params, output.as_deref()).await
        }
        Commands::Index { repo, yaml } => commands::index::run(&service, &repo, yaml).await,
    }
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();
    init_tracing();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
