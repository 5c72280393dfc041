use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::{DashboardArgs, SignalArgs};

#[derive(Parser)]
#[command(name = "gamma")]
#[command(about = "Gamma-exposure dashboard and read-only 0DTE signals", long_about = None)]
struct Cli {
    /// Config file path (TOML or JSON)
    #[arg(short, long, global = true, env = "GAMMA_CONFIG")]
    config: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard API with background refresh
    Dashboard(DashboardArgs),
    /// Print the current trade signal for one index
    Signal(SignalArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = gamma_core::ConfigLoader::load(cli.config.as_deref())?;

    let default_level = config.logging.level.clone();
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&default_level))
    };

    if let Some(log_path) = cli.log_file.as_ref().or(config.logging.file.as_ref()) {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter()).init();
    }

    let mut config = config;
    if cli.log_file.is_some() {
        config.logging.file = cli.log_file;
    }

    match cli.command {
        Commands::Dashboard(args) => commands::run_dashboard(args, config).await,
        Commands::Signal(args) => commands::run_signal(args, config).await,
    }
}
