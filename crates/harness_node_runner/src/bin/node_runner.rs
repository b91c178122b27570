use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use harness_config::NodeName;
use harness_infra_utils::tracing_utils::{configure_tracing, DEFAULT_LEVEL};
use harness_node_runner::runner::{default_secret_specs, secret_specs_from_names, Launch};
use harness_node_runner::secrets::unicode_env;

/// Loads file-based secrets into the environment and execs a Starknet node.
#[derive(Parser, Debug)]
#[command(name = "node_runner")]
struct Cli {
    /// Node to launch.
    #[arg(long, value_enum)]
    node: NodeName,

    /// Node binary. Defaults to `/usr/local/bin/<node>`.
    #[arg(long, value_name = "PATH")]
    binary: Option<PathBuf>,

    /// Required secret variable, read from the file named by `<VAR>_FILE`. Repeatable.
    #[arg(long = "secret", value_name = "VAR")]
    secrets: Vec<String>,

    /// Optional secret variable, skipped when `<VAR>_FILE` is unset. Repeatable.
    #[arg(long = "optional-secret", value_name = "VAR")]
    optional_secrets: Vec<String>,

    /// Print the redacted command line instead of running it.
    #[arg(long)]
    dry_run: bool,

    /// Argument templates replacing the node defaults.
    #[arg(last = true, value_name = "ARGS")]
    args: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    configure_tracing(DEFAULT_LEVEL);
    let cli = Cli::parse();

    let specs = if cli.secrets.is_empty() && cli.optional_secrets.is_empty() {
        default_secret_specs()
    } else {
        secret_specs_from_names(&cli.secrets, &cli.optional_secrets)
    };
    let templates = (!cli.args.is_empty()).then_some(cli.args);
    let binary = cli.binary.unwrap_or_else(|| cli.node.default_binary_path());
    let env = unicode_env(std::env::vars_os());

    let launch = Launch::prepare(cli.node, binary, templates, &specs, &env)
        .with_context(|| format!("Failed to prepare {} launch", cli.node))?;

    if cli.dry_run {
        println!("{}", launch.redacted_command_line());
        return Ok(());
    }
    Err(launch.exec().into())
}
