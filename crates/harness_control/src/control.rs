//! The operations behind `harness <command>`.

use std::path::PathBuf;

use harness_config::{ConfigError, HarnessConfig, NodeName};
use harness_deployments::deployment::{write_compose_file, DeploymentError};
use harness_infra_utils::command::CommandError;
use thiserror::Error;
use tracing::info;

use crate::images::{
    build_images,
    remove_tarballs,
    BuildReport,
    ImageArtifact,
    ImageError,
};
use crate::prompt::Confirmer;
use crate::runtime::{ComposeAction, ContainerRuntime};

#[cfg(test)]
#[path = "control_test.rs"]
mod control_test;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("Failed to read the confirmation: {0}")]
    Prompt(#[source] std::io::Error),
}

/// Whether a destructive operation ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

pub struct Controller<'a> {
    runtime: &'a dyn ContainerRuntime,
    confirmer: &'a dyn Confirmer,
    config: HarnessConfig,
}

impl<'a> Controller<'a> {
    pub fn new(
        runtime: &'a dyn ContainerRuntime,
        confirmer: &'a dyn Confirmer,
        config: HarnessConfig,
    ) -> Self {
        Self { runtime, confirmer, config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// `node` alone, or every configured node.
    pub fn select(&self, node: Option<NodeName>) -> Result<Vec<NodeName>, ControlError> {
        Ok(self.config.selected_nodes(node)?)
    }

    pub async fn images(
        &self,
        nodes: &[NodeName],
        force: bool,
    ) -> Result<Vec<BuildReport>, ControlError> {
        Ok(build_images(self.runtime, &self.config, nodes, force).await?)
    }

    /// Creates the shared network if needed, builds stale images and brings the nodes up.
    pub async fn start(&self, nodes: &[NodeName]) -> Result<(), ControlError> {
        self.ensure_network().await?;
        self.images(nodes, false).await?;
        for node in nodes {
            let compose_file = write_compose_file(&self.config, *node)?;
            info!("Starting {node}.");
            self.runtime.compose(node.project_name(), &compose_file, ComposeAction::Up).await?;
        }
        Ok(())
    }

    /// Stops the containers. Containers and volumes are kept.
    pub async fn stop(&self, nodes: &[NodeName]) -> Result<(), ControlError> {
        for node in nodes {
            info!("Stopping {node}.");
            self.compose(*node, ComposeAction::Stop).await?;
        }
        Ok(())
    }

    pub async fn restart(&self, nodes: &[NodeName]) -> Result<(), ControlError> {
        self.stop(nodes).await?;
        self.start(nodes).await
    }

    /// Removes the containers and the cached image tarballs. Volumes are kept.
    pub async fn clean(&self, nodes: &[NodeName]) -> Result<Vec<PathBuf>, ControlError> {
        self.tear_down(nodes, false).await
    }

    /// Like [`Controller::clean`], and also removes the data volumes, once confirmed.
    pub async fn fclean(&self, nodes: &[NodeName]) -> Result<Confirmation, ControlError> {
        let confirmation = self.confirm_volume_removal(nodes)?;
        if confirmation == Confirmation::Confirmed {
            self.tear_down(nodes, true).await?;
        }
        Ok(confirmation)
    }

    /// [`Controller::fclean`] followed by [`Controller::start`].
    pub async fn frestart(&self, nodes: &[NodeName]) -> Result<Confirmation, ControlError> {
        let confirmation = self.confirm_volume_removal(nodes)?;
        if confirmation == Confirmation::Confirmed {
            self.tear_down(nodes, true).await?;
            self.start(nodes).await?;
        }
        Ok(confirmation)
    }

    pub async fn logs(
        &self,
        node: NodeName,
        follow: bool,
        tail: Option<usize>,
    ) -> Result<(), ControlError> {
        self.compose(node, ComposeAction::Logs { follow, tail }).await
    }

    /// Running harness containers.
    pub async fn ps(&self) -> Result<Vec<String>, ControlError> {
        let harness_containers: Vec<String> =
            self.config.nodes.keys().map(|node| node.container_name()).collect();
        let running = self.runtime.running_containers().await?;
        Ok(running.into_iter().filter(|name| harness_containers.contains(name)).collect())
    }

    /// Published ports of the container of `node`.
    pub async fn ports(&self, node: NodeName) -> Result<Vec<String>, ControlError> {
        self.config.node(node)?;
        Ok(self.runtime.container_ports(&node.container_name()).await?)
    }

    async fn ensure_network(&self) -> Result<(), ControlError> {
        let network = &self.config.network_name;
        if !self.runtime.network_exists(network).await? {
            info!("Creating network {network}.");
            self.runtime.create_network(network).await?;
        }
        Ok(())
    }

    /// Runs `action` against the compose file of `node`, regenerating it from the config first.
    async fn compose(&self, node: NodeName, action: ComposeAction) -> Result<(), ControlError> {
        let compose_file = write_compose_file(&self.config, node)?;
        self.runtime.compose(node.project_name(), &compose_file, action).await?;
        Ok(())
    }

    async fn tear_down(
        &self,
        nodes: &[NodeName],
        remove_volumes: bool,
    ) -> Result<Vec<PathBuf>, ControlError> {
        for node in nodes {
            info!("Removing {node} containers (volumes removed: {remove_volumes}).");
            self.compose(*node, ComposeAction::Down { remove_volumes }).await?;
        }

        let mut artifacts = nodes
            .iter()
            .map(|node| ImageArtifact::for_node(&self.config, *node))
            .collect::<Result<Vec<_>, _>>()?;
        // The health gate image is shared, drop it only along with every gated node.
        let mut gated_nodes = self
            .config
            .nodes
            .iter()
            .filter(|(_, node_config)| node_config.health_gated)
            .map(|(node, _)| node)
            .peekable();
        if gated_nodes.peek().is_some() && gated_nodes.all(|node| nodes.contains(node)) {
            artifacts.push(ImageArtifact::health_gate(&self.config));
        }

        let removed = remove_tarballs(&artifacts)?;
        for tarball in &removed {
            info!("Removed {}.", tarball.display());
        }
        Ok(removed)
    }

    fn confirm_volume_removal(&self, nodes: &[NodeName]) -> Result<Confirmation, ControlError> {
        let volumes: Vec<String> = nodes.iter().map(|node| node.volume_name()).collect();
        let question =
            format!("This permanently deletes the volumes {}. Continue?", volumes.join(", "));
        let confirmed = self.confirmer.confirm(&question).map_err(ControlError::Prompt)?;
        if !confirmed {
            info!("Aborted, nothing was removed.");
            return Ok(Confirmation::Declined);
        }
        Ok(Confirmation::Confirmed)
    }
}
