use clap::Parser;
use gatherer::cli::{self, Cli, Commands};
use gatherer::config::Config;
use gatherer::error::Result;
use gatherer::supervisor::Supervisor;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => run(args.config).await,
        other => cli::execute_operator_command(other).await,
    };

    if let Err(e) = result {
        error!(error = %e, "fatal error");
        std::process::exit(1);
    }
}

async fn run(config_path: std::path::PathBuf) -> Result<()> {
    let config = Config::load(&config_path)?;
    config.logging.init();

    info!("gatherer starting");
    let supervisor = Supervisor::build(config).await?;
    supervisor.run(shutdown_signal()).await?;
    info!("gatherer stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
