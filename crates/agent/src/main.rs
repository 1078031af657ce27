// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use beacon_agent::config::AgentConfig;
use beacon_agent::run;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "beacon-agent", version, about = "Endpoint telemetry agent.")]
struct Cli {
    #[command(flatten)]
    config: AgentConfig,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Normal operation (default if no subcommand is given).
    Run,
    /// Probe the ingest endpoint and exit.
    TestConnection,
    /// Report pending and dead-letter queue counts.
    ShowQueue,
    /// Flush the durable queue and exit.
    Drain {
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() {
    let _ = rustls::crypto::ring::default_provider().install_default();
    run::init_tracing();

    let cli = Cli::parse();
    let config = match cli.config.load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(beacon_agent::ExitCode::ConfigurationError.code());
        }
    };

    let exit_code = match cli.command.unwrap_or(Command::Run) {
        Command::Run => run::run(config).await,
        Command::TestConnection => run::test_connection(config).await,
        Command::ShowQueue => run::show_queue(config),
        Command::Drain { timeout } => run::drain(config, timeout).await,
    };
    std::process::exit(exit_code.code());
}
