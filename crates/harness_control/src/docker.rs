use std::path::{Path, PathBuf};

use async_trait::async_trait;
use harness_infra_utils::command::{
    create_shell_command,
    run_command,
    run_command_lines,
    CommandError,
    OutputMode,
};
use tokio::process::Command;

use crate::runtime::{ComposeAction, ContainerRuntime};

#[cfg(test)]
#[path = "docker_test.rs"]
mod docker_test;

const DOCKER: &str = "docker";
const DOCKER_HINT: &str = "Make sure Docker is installed and the daemon is running.";
const LOAD_HINT: &str = "Rebuild the image with `harness images --force`.";
const COMPOSE_HINT: &str =
    "Make sure the Docker Compose plugin is installed (`docker compose version`).";

/// [`ContainerRuntime`] backed by the `docker` command line.
pub struct DockerCli {
    working_dir: PathBuf,
}

impl DockerCli {
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }

    fn docker(&self, args: &[&str]) -> Command {
        let mut command = create_shell_command(DOCKER, &self.working_dir);
        command.args(args);
        command
    }

    fn compose_command(
        &self,
        project: &str,
        compose_file: &Path,
        action: &ComposeAction,
    ) -> Command {
        let mut command = self.docker(&["compose", "--project-name", project, "--file"]);
        command.arg(compose_file);
        command.args(compose_args(action));
        command
    }
}

/// Subcommand and flags of `docker compose` for `action`.
pub fn compose_args(action: &ComposeAction) -> Vec<String> {
    match action {
        ComposeAction::Up => vec!["up".into(), "--detach".into()],
        ComposeAction::Stop => vec!["stop".into()],
        ComposeAction::Down { remove_volumes } => {
            let mut args = vec!["down".into(), "--remove-orphans".into()];
            if *remove_volumes {
                args.push("--volumes".into());
            }
            args
        }
        ComposeAction::Logs { follow, tail } => {
            let mut args = vec!["logs".into()];
            if *follow {
                args.push("--follow".into());
            }
            if let Some(tail) = tail {
                args.push(format!("--tail={tail}"));
            }
            args
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn network_exists(&self, network: &str) -> Result<bool, CommandError> {
        let names = run_command_lines(
            &mut self.docker(&["network", "ls", "--format", "{{.Name}}"]),
            DOCKER_HINT,
        )
        .await?;
        Ok(names.iter().any(|name| name == network))
    }

    async fn create_network(&self, network: &str) -> Result<(), CommandError> {
        let mut command = self.docker(&["network", "create", network]);
        run_command(&mut command, OutputMode::Capture, DOCKER_HINT).await?;
        Ok(())
    }

    async fn build_image(
        &self,
        tag: &str,
        dockerfile: &Path,
        context: &Path,
    ) -> Result<(), CommandError> {
        let mut command = self.docker(&["build", "--tag", tag, "--file"]);
        command.arg(dockerfile).arg(context);
        run_command(&mut command, OutputMode::Inherit, "Check the Dockerfile and the build context.")
            .await?;
        Ok(())
    }

    async fn save_image(&self, tag: &str, tarball: &Path) -> Result<(), CommandError> {
        let mut command = self.docker(&["save", "--output"]);
        command.arg(tarball).arg(tag);
        run_command(&mut command, OutputMode::Inherit, DOCKER_HINT).await?;
        Ok(())
    }

    async fn image_exists(&self, tag: &str) -> Result<bool, CommandError> {
        let ids =
            run_command_lines(&mut self.docker(&["images", "--quiet", tag]), DOCKER_HINT).await?;
        Ok(!ids.is_empty())
    }

    async fn load_image(&self, tarball: &Path) -> Result<(), CommandError> {
        let mut command = self.docker(&["load", "--input"]);
        command.arg(tarball);
        run_command(&mut command, OutputMode::Inherit, LOAD_HINT).await?;
        Ok(())
    }

    async fn compose(
        &self,
        project: &str,
        compose_file: &Path,
        action: ComposeAction,
    ) -> Result<(), CommandError> {
        let mut command = self.compose_command(project, compose_file, &action);
        run_command(&mut command, OutputMode::Inherit, COMPOSE_HINT).await?;
        Ok(())
    }

    async fn running_containers(&self) -> Result<Vec<String>, CommandError> {
        run_command_lines(&mut self.docker(&["ps", "--format", "{{.Names}}"]), DOCKER_HINT).await
    }

    async fn container_ports(&self, container: &str) -> Result<Vec<String>, CommandError> {
        run_command_lines(
            &mut self.docker(&["port", container]),
            "Is the container running? See `harness ps`.",
        )
        .await
    }
}
