//! Argument-parsing coverage for the `gatherer` binary's CLI surface.
//! Uses `Cli::try_parse_from` directly rather than spawning the built
//! binary, since the operator subcommands are pure HTTP glue with no
//! process-level behavior worth exercising out-of-process.

use clap::Parser;
use gatherer::cli::{Cli, Commands};

#[test]
fn run_defaults_to_gatherer_toml() {
    let cli = Cli::try_parse_from(["gatherer", "run"]).expect("parses");
    match cli.command {
        Commands::Run(args) => assert_eq!(args.config.to_str(), Some("gatherer.toml")),
        other => panic!("expected Run, got {other:?}"),
    }
}

#[test]
fn run_accepts_explicit_config_path() {
    let cli = Cli::try_parse_from(["gatherer", "run", "--config", "/etc/gatherer.toml"]).expect("parses");
    match cli.command {
        Commands::Run(args) => assert_eq!(args.config.to_str(), Some("/etc/gatherer.toml")),
        other => panic!("expected Run, got {other:?}"),
    }
}

#[test]
fn status_defaults_to_localhost() {
    let cli = Cli::try_parse_from(["gatherer", "status"]).expect("parses");
    match cli.command {
        Commands::Status(args) => assert_eq!(args.url, "http://127.0.0.1:9090"),
        other => panic!("expected Status, got {other:?}"),
    }
}

#[test]
fn disconnect_requires_a_connection_id() {
    let result = Cli::try_parse_from(["gatherer", "disconnect"]);
    assert!(result.is_err());
}

#[test]
fn disconnect_parses_id_and_url_override() {
    let cli = Cli::try_parse_from(["gatherer", "disconnect", "42", "--url", "http://10.0.0.1:9090"]).expect("parses");
    match cli.command {
        Commands::Disconnect(args) => {
            assert_eq!(args.conn, 42);
            assert_eq!(args.http.url, "http://10.0.0.1:9090");
        }
        other => panic!("expected Disconnect, got {other:?}"),
    }
}

#[test]
fn markets_and_connections_parse_with_defaults() {
    assert!(matches!(
        Cli::try_parse_from(["gatherer", "markets"]).unwrap().command,
        Commands::Markets(_)
    ));
    assert!(matches!(
        Cli::try_parse_from(["gatherer", "connections"]).unwrap().command,
        Commands::Connections(_)
    ));
}
