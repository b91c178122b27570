use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use harness_config::{ConfigArgs, HarnessConfig, NodeName};
use harness_deployments::deployment::write_compose_file;
use harness_infra_utils::dumping::serialize_to_file;
use harness_infra_utils::tracing_utils::{configure_tracing, DEFAULT_LEVEL};

/// Writes the compose file of every configured node, or of `--node` only.
#[derive(Parser, Debug)]
#[command(name = "deployment_generator")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[arg(long, value_enum)]
    node: Option<NodeName>,

    /// Write the default configuration to this path instead.
    #[arg(long, value_name = "FILE")]
    dump_default_config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    configure_tracing(DEFAULT_LEVEL);
    let cli = Cli::parse();

    if let Some(path) = cli.dump_default_config {
        serialize_to_file(&HarnessConfig::default(), &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        return Ok(());
    }

    let config = HarnessConfig::from_args(&cli.config)?;
    for node in config.selected_nodes(cli.node)? {
        write_compose_file(&config, node)?;
    }
    Ok(())
}
