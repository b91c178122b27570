use clap::Parser;
use harness_health_gate::cli::HealthGateCli;
use harness_health_gate::gate::wait_until_reachable;
use harness_infra_utils::tracing_utils::{configure_tracing, DEFAULT_LEVEL};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    configure_tracing(DEFAULT_LEVEL);
    let cli = HealthGateCli::parse();

    wait_until_reachable(&cli.probe(), &cli.target(), cli.interval(), cli.attempts()).await?;
    Ok(())
}
