//! Image build cache: one tarball per image, rebuilt only when an input is newer.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use harness_config::config::HEALTH_GATE_IMAGE_NAME;
use harness_config::{ConfigError, HarnessConfig, NodeName};
use harness_infra_utils::command::CommandError;
use thiserror::Error;
use tracing::info;

use crate::runtime::ContainerRuntime;

#[cfg(test)]
#[path = "images_test.rs"]
mod images_test;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("Prerequisite {path} of image {image} does not exist.")]
    MissingPrerequisite { image: String, path: PathBuf },
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Freshness {
    /// No tarball yet.
    Missing,
    /// These prerequisites changed after the tarball was written.
    Stale { newer: Vec<PathBuf> },
    Fresh,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildOutcome {
    Built,
    /// The tarball was fresh but the engine lacked the image, so it was loaded from the tarball.
    Loaded,
    UpToDate,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildReport {
    pub image: String,
    pub outcome: BuildOutcome,
}

/// An image together with the inputs it is built from and the tarball caching it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageArtifact {
    pub name: String,
    pub tag: String,
    pub dockerfile: PathBuf,
    pub prerequisites: Vec<PathBuf>,
    pub tarball: PathBuf,
}

impl ImageArtifact {
    pub fn for_node(config: &HarnessConfig, node: NodeName) -> Result<Self, ConfigError> {
        let node_config = config.node(node)?;
        Ok(Self::new(
            config,
            node.as_str(),
            node_config.dockerfile.clone(),
            node_config.prerequisites.clone(),
        ))
    }

    pub fn health_gate(config: &HarnessConfig) -> Self {
        Self::new(
            config,
            HEALTH_GATE_IMAGE_NAME,
            config.health_gate_dockerfile.clone(),
            config.health_gate_prerequisites.clone(),
        )
    }

    fn new(
        config: &HarnessConfig,
        name: &str,
        dockerfile: PathBuf,
        prerequisites: Vec<PathBuf>,
    ) -> Self {
        Self {
            name: name.to_string(),
            tag: config.image_tag(name),
            dockerfile,
            prerequisites,
            tarball: config.tarball_path(name),
        }
    }

    /// The Dockerfile followed by the extra prerequisites.
    pub fn inputs(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.dockerfile).chain(&self.prerequisites)
    }

    pub fn freshness(&self) -> Result<Freshness, ImageError> {
        for input in self.inputs() {
            if !input.exists() {
                return Err(ImageError::MissingPrerequisite {
                    image: self.name.clone(),
                    path: input.clone(),
                });
            }
        }

        if !self.tarball.exists() {
            return Ok(Freshness::Missing);
        }
        let built_at = modified(&self.tarball)?;

        let mut newer = Vec::new();
        for input in self.inputs() {
            if newest_modification(input)? > built_at {
                newer.push(input.clone());
            }
        }
        Ok(if newer.is_empty() { Freshness::Fresh } else { Freshness::Stale { newer } })
    }
}

fn modified(path: &Path) -> Result<SystemTime, ImageError> {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|source| ImageError::Io { path: path.to_path_buf(), source })
}

/// Modification time of `path`, or of the newest entry beneath it for directories.
fn newest_modification(path: &Path) -> Result<SystemTime, ImageError> {
    let io_error = |source: std::io::Error| ImageError::Io { path: path.to_path_buf(), source };
    let mut newest = modified(path)?;
    if fs::metadata(path).map_err(io_error)?.is_dir() {
        for entry in fs::read_dir(path).map_err(io_error)? {
            let entry = entry.map_err(io_error)?;
            newest = newest.max(newest_modification(&entry.path())?);
        }
    }
    Ok(newest)
}

/// The images needed to run `nodes`: one per node, plus the health gate when a node is gated.
pub fn artifacts_for(
    config: &HarnessConfig,
    nodes: &[NodeName],
) -> Result<Vec<ImageArtifact>, ConfigError> {
    let mut artifacts = Vec::with_capacity(nodes.len() + 1);
    let mut gated = false;
    for node in nodes {
        gated |= config.node(*node)?.health_gated;
        artifacts.push(ImageArtifact::for_node(config, *node)?);
    }
    if gated {
        artifacts.push(ImageArtifact::health_gate(config));
    }
    Ok(artifacts)
}

/// Builds and exports every image of `nodes` that is missing or stale, or all of them if `force`.
/// Fresh tarballs whose image is absent from the engine are loaded instead.
pub async fn build_images(
    runtime: &dyn ContainerRuntime,
    config: &HarnessConfig,
    nodes: &[NodeName],
    force: bool,
) -> Result<Vec<BuildReport>, ImageError> {
    let mut reports = Vec::new();
    for artifact in artifacts_for(config, nodes)? {
        let freshness = artifact.freshness()?;
        let outcome = match freshness {
            Freshness::Fresh if !force => {
                if runtime.image_exists(&artifact.tag).await? {
                    info!("Image {} is up to date.", artifact.tag);
                    BuildOutcome::UpToDate
                } else {
                    info!(
                        "Image {} is missing, loading it from {}.",
                        artifact.tag,
                        artifact.tarball.display()
                    );
                    runtime.load_image(&artifact.tarball).await?;
                    BuildOutcome::Loaded
                }
            }
            freshness => {
                info!("Building image {} ({freshness:?}, forced: {force}).", artifact.tag);
                build_artifact(runtime, config, &artifact).await?;
                BuildOutcome::Built
            }
        };
        reports.push(BuildReport { image: artifact.name, outcome });
    }
    Ok(reports)
}

async fn build_artifact(
    runtime: &dyn ContainerRuntime,
    config: &HarnessConfig,
    artifact: &ImageArtifact,
) -> Result<(), ImageError> {
    if let Some(parent) = artifact.tarball.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| ImageError::Io { path: parent.to_path_buf(), source })?;
    }
    runtime.build_image(&artifact.tag, &artifact.dockerfile, &config.docker_context).await?;
    runtime.save_image(&artifact.tag, &artifact.tarball).await?;
    info!("Saved {} to {}.", artifact.tag, artifact.tarball.display());
    Ok(())
}

/// Deletes the cached tarballs of `artifacts`. Returns the removed paths.
pub fn remove_tarballs(artifacts: &[ImageArtifact]) -> Result<Vec<PathBuf>, ImageError> {
    let mut removed = Vec::new();
    for artifact in artifacts {
        match fs::remove_file(&artifact.tarball) {
            Ok(()) => removed.push(artifact.tarball.clone()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(ImageError::Io { path: artifact.tarball.clone(), source });
            }
        }
    }
    Ok(removed)
}
