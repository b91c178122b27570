use std::path::Path;

use async_trait::async_trait;
use harness_infra_utils::command::CommandError;
#[cfg(any(feature = "testing", test))]
use mockall::automock;

/// What to do with a compose project.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComposeAction {
    /// Create and start the services, detached.
    Up,
    /// Stop the containers, keeping them and their volumes.
    Stop,
    /// Remove the containers, and the named volumes when `remove_volumes` is set.
    Down { remove_volumes: bool },
    Logs { follow: bool, tail: Option<usize> },
}

/// The container engine the harness drives.
#[cfg_attr(any(feature = "testing", test), automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn network_exists(&self, network: &str) -> Result<bool, CommandError>;

    async fn create_network(&self, network: &str) -> Result<(), CommandError>;

    async fn build_image(
        &self,
        tag: &str,
        dockerfile: &Path,
        context: &Path,
    ) -> Result<(), CommandError>;

    /// Exports the image `tag` into `tarball`.
    async fn save_image(&self, tag: &str, tarball: &Path) -> Result<(), CommandError>;

    /// Whether the engine holds an image tagged `tag`.
    async fn image_exists(&self, tag: &str) -> Result<bool, CommandError>;

    /// Imports the images exported into `tarball`, tags included.
    async fn load_image(&self, tarball: &Path) -> Result<(), CommandError>;

    async fn compose(
        &self,
        project: &str,
        compose_file: &Path,
        action: ComposeAction,
    ) -> Result<(), CommandError>;

    /// Names of the running containers.
    async fn running_containers(&self) -> Result<Vec<String>, CommandError>;

    /// Published port mappings of `container`, one per line.
    async fn container_ports(&self, container: &str) -> Result<Vec<String>, CommandError>;
}
