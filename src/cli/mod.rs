//! The `gatherer` binary's command-line surface: the long-lived `run`
//! subcommand plus thin read-only operator commands that hit the health/
//! debug HTTP server instead of talking to any component directly.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::error::Result;

#[derive(Parser, Debug)]
#[command(name = "gatherer", version, about = "Real-time market-data ingestion core")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the ingestion process in the foreground.
    Run(RunArgs),
    /// Print the `/health` body.
    Status(HttpArgs),
    /// Print the `/debug/markets` body.
    Markets(HttpArgs),
    /// Print the `/debug/connections` body.
    Connections(HttpArgs),
    /// Force-disconnect one connection by id.
    Disconnect(DisconnectArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the TOML config file.
    #[arg(short, long, default_value = "gatherer.toml")]
    pub config: PathBuf,
}

/// Shared argument for the operator commands: the base URL of a running
/// gatherer's health/debug server.
#[derive(Parser, Debug)]
pub struct HttpArgs {
    #[arg(long, default_value = "http://127.0.0.1:9090")]
    pub url: String,
}

#[derive(Parser, Debug)]
pub struct DisconnectArgs {
    #[command(flatten)]
    pub http: HttpArgs,
    /// Connection id, 1-150.
    pub conn: u32,
}

/// Dispatches everything except `run`, which `main` handles directly since
/// it owns the long-lived process rather than a single HTTP round trip.
pub async fn execute_operator_command(command: Commands) -> Result<()> {
    match command {
        Commands::Run(_) => unreachable!("run is handled by main"),
        Commands::Status(args) => print_get(&args.url, "/health").await,
        Commands::Markets(args) => print_get(&args.url, "/debug/markets").await,
        Commands::Connections(args) => print_get(&args.url, "/debug/connections").await,
        Commands::Disconnect(args) => {
            let url = format!("{}/debug/disconnect?conn={}", args.http.url, args.conn);
            let response = reqwest::Client::new().post(&url).send().await?;
            if response.status().is_success() {
                println!("disconnected connection {}", args.conn);
                Ok(())
            } else {
                println!("disconnect failed: {}", response.status());
                Ok(())
            }
        }
    }
}

async fn print_get(base_url: &str, path: &str) -> Result<()> {
    let url = format!("{base_url}{path}");
    let body: Value = reqwest::get(&url).await?.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
