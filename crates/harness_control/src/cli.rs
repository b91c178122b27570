use clap::{Args, Parser, Subcommand};
use harness_config::{ConfigArgs, NodeName};
use tracing::info;
use tracing::level_filters::LevelFilter;

use crate::control::{Confirmation, ControlError, Controller};
use crate::images::BuildOutcome;

#[cfg(test)]
#[path = "cli_test.rs"]
mod cli_test;

/// Builds, starts and tears down the Madara, Juno and Pathfinder nodes.
#[derive(Parser, Debug)]
#[command(name = "harness", version)]
pub struct HarnessCli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Answer yes to confirmation prompts.
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Overrides `RUST_LOG`, e.g. `debug`.
    #[arg(long, global = true)]
    pub log_level: Option<LevelFilter>,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct NodeSelection {
    /// Node to operate on. All configured nodes when omitted.
    #[arg(value_enum)]
    pub node: Option<NodeName>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the images whose Dockerfile or sources changed.
    Images {
        #[command(flatten)]
        selection: NodeSelection,
        /// Rebuild even if the cached tarball is up to date.
        #[arg(long)]
        force: bool,
    },
    /// Build stale images and start the nodes.
    Start(NodeSelection),
    /// Stop the nodes, keeping containers and volumes.
    Stop(NodeSelection),
    /// Stop, then start.
    Restart(NodeSelection),
    /// Remove containers and image tarballs, keeping volumes.
    Clean(NodeSelection),
    /// Like `clean`, and also delete the data volumes.
    Fclean(NodeSelection),
    /// `fclean`, then `start`.
    Frestart(NodeSelection),
    /// Show the logs of a node.
    Logs {
        #[arg(value_enum)]
        node: NodeName,
        #[arg(long, short = 'f')]
        follow: bool,
        /// Number of lines to show from the end of the logs.
        #[arg(long)]
        tail: Option<usize>,
    },
    /// List the running node containers.
    Ps,
    /// Show the published ports of a node.
    Ports {
        #[arg(value_enum)]
        node: NodeName,
    },
}

/// Runs `command`, printing listings to stdout.
pub async fn execute(controller: &Controller<'_>, command: Command) -> Result<(), ControlError> {
    match command {
        Command::Images { selection, force } => {
            let nodes = controller.select(selection.node)?;
            for report in controller.images(&nodes, force).await? {
                match report.outcome {
                    BuildOutcome::Built => info!("Built image {}.", report.image),
                    BuildOutcome::Loaded => info!("Loaded image {}.", report.image),
                    BuildOutcome::UpToDate => info!("Image {} is up to date.", report.image),
                }
            }
        }
        Command::Start(selection) => controller.start(&controller.select(selection.node)?).await?,
        Command::Stop(selection) => controller.stop(&controller.select(selection.node)?).await?,
        Command::Restart(selection) => {
            controller.restart(&controller.select(selection.node)?).await?
        }
        Command::Clean(selection) => {
            controller.clean(&controller.select(selection.node)?).await?;
        }
        Command::Fclean(selection) => {
            let confirmation = controller.fclean(&controller.select(selection.node)?).await?;
            log_declined(confirmation);
        }
        Command::Frestart(selection) => {
            let confirmation = controller.frestart(&controller.select(selection.node)?).await?;
            log_declined(confirmation);
        }
        Command::Logs { node, follow, tail } => controller.logs(node, follow, tail).await?,
        Command::Ps => {
            for container in controller.ps().await? {
                println!("{container}");
            }
        }
        Command::Ports { node } => {
            for port in controller.ports(node).await? {
                println!("{port}");
            }
        }
    }
    Ok(())
}

fn log_declined(confirmation: Confirmation) {
    if confirmation == Confirmation::Declined {
        info!("Nothing to do.");
    }
}
