use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;

use caddy_label_agent::config::Cli;
use caddy_label_agent::observability::{init_logging, metrics, LogFormat};
use caddy_label_agent::run_agent;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging is not up yet; config errors go straight to stderr.
    let config = match cli.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("caddy-label-agent: {e}");
            return ExitCode::from(2);
        }
    };

    let format = config
        .observability
        .log_format
        .parse()
        .unwrap_or(LogFormat::Text);
    init_logging(format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        agent_id = %config.agent.id,
        mode = %config.agent.mode,
        api_url = %config.caddy.api_url,
        label_prefix = %config.docker.label_prefix,
        "caddy-label-agent starting"
    );

    if let Some(address) = config.observability.metrics_address.as_deref() {
        match address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(metrics_address = %address, error = %e, "Failed to parse metrics address"),
        }
    }

    match run_agent(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Agent failed");
            ExitCode::FAILURE
        }
    }
}
