use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use harness_config::config::DEFAULT_CONFIG_FILE;
use harness_config::HarnessConfig;
use harness_control::cli::{execute, HarnessCli};
use harness_control::control::Controller;
use harness_control::docker::DockerCli;
use harness_control::prompt::{AssumeYes, Confirmer, StdinConfirmer};
use harness_infra_utils::path::find_project_root;
use harness_infra_utils::tracing_utils::{change_tracing_level, configure_tracing, DEFAULT_LEVEL};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    configure_tracing(DEFAULT_LEVEL);
    let mut cli = HarnessCli::parse();
    if let Some(level) = cli.log_level {
        change_tracing_level(level);
    }

    // Paths in the config are relative to the directory holding `harness.json`. Paths given on
    // the command line stay relative to the caller.
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let from_cwd = |path: Option<PathBuf>| path.map(|path| cwd.join(path));
    cli.config.config_file = from_cwd(cli.config.config_file.take());
    cli.config.secrets_dir = from_cwd(cli.config.secrets_dir.take());
    cli.config.artifacts_dir = from_cwd(cli.config.artifacts_dir.take());
    cli.config.deployments_dir = from_cwd(cli.config.deployments_dir.take());
    let root = find_project_root(&cwd, DEFAULT_CONFIG_FILE).unwrap_or(cwd);
    std::env::set_current_dir(&root)
        .with_context(|| format!("Failed to enter {}", root.display()))?;

    let config = HarnessConfig::from_args(&cli.config)?;
    let runtime = DockerCli::new(PathBuf::from("."));
    let confirmer: &dyn Confirmer = if cli.yes { &AssumeYes } else { &StdinConfirmer };
    let controller = Controller::new(&runtime, confirmer, config);

    execute(&controller, cli.command).await?;
    Ok(())
}
