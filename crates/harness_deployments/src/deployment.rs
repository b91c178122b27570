use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use harness_config::config::HEALTH_GATE_IMAGE_NAME;
use harness_config::node::DATA_DIR;
use harness_config::{ConfigError, HarnessConfig, NodeConfig, NodeName, SecretSpec};
use harness_infra_utils::path::relative_from;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::info;

use crate::compose::{
    escape_interpolation,
    ComposeFile,
    ComposeNetwork,
    ComposeSecret,
    ComposeService,
    ComposeVolume,
    DependencyCondition,
    RestartPolicy,
    ServiceDependency,
};

#[cfg(test)]
#[path = "deployment_test.rs"]
mod deployment_test;

pub const COMPOSE_FILE_NAME: &str = "compose.yaml";
pub const HEALTH_GATE_SERVICE: &str = "health_gate";

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to render compose file for {node}: {source}")]
    Yaml {
        node: NodeName,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Path of the generated compose file of `node`.
pub fn compose_file_path(config: &HarnessConfig, node: NodeName) -> PathBuf {
    config.compose_dir(node).join(COMPOSE_FILE_NAME)
}

/// Builds the compose definition of `node`: the node service, and the health gate it waits for
/// when gated.
pub fn node_compose(config: &HarnessConfig, node: NodeName) -> Result<ComposeFile, DeploymentError> {
    let node_config = config.node(node)?;
    let compose_dir = config.compose_dir(node);
    let secrets = deployed_secrets(config, node_config);

    let mut compose = ComposeFile::default();
    if node_config.health_gated {
        compose.services.insert(HEALTH_GATE_SERVICE.to_string(), health_gate_service(config));
    }
    compose.services.insert(node.to_string(), node_service(config, node, node_config, &secrets));

    for spec in &secrets {
        let file = secret_file_reference(&compose_dir, &config.secrets_dir.join(&spec.name))
            .map_err(|source| DeploymentError::Io { path: config.secrets_dir.clone(), source })?;
        compose.secrets.insert(spec.name.clone(), ComposeSecret { file });
    }
    compose
        .volumes
        .insert(node.volume_name(), ComposeVolume { name: Some(node.volume_name()) });
    compose.networks.insert(config.network_name.clone(), ComposeNetwork { external: true });
    Ok(compose)
}

/// The secrets mounted into the node: every required one, and the optional ones whose file exists
/// under the secrets directory.
fn deployed_secrets(config: &HarnessConfig, node_config: &NodeConfig) -> Vec<SecretSpec> {
    node_config
        .secrets
        .iter()
        .filter(|spec| {
            let provisioned = config.secrets_dir.join(&spec.name).is_file();
            if !spec.required && !provisioned {
                info!("Optional secret {} is not provisioned, leaving it out.", spec.name);
            }
            spec.required || provisioned
        })
        .cloned()
        .collect()
}

fn node_service(
    config: &HarnessConfig,
    node: NodeName,
    node_config: &NodeConfig,
    secrets: &[SecretSpec],
) -> ComposeService {
    let mut environment = IndexMap::new();
    for spec in secrets {
        environment.insert(spec.file_env_var(), spec.container_path().display().to_string());
    }
    environment.insert("RPC_PORT".to_string(), node_config.rpc_container_port.to_string());
    environment.insert("DATA_DIR".to_string(), DATA_DIR.to_string());
    environment.insert("NETWORK".to_string(), config.network.clone());
    environment.insert("CHAIN_ID".to_string(), config.chain_id.clone());
    environment.insert("ETHEREUM_NETWORK".to_string(), config.ethereum_network.clone());

    let mut depends_on = IndexMap::new();
    if node_config.health_gated {
        environment
            .insert("FEEDER_GATEWAY_URL".to_string(), config.feeder_gateway.feeder_gateway_url());
        environment.insert("GATEWAY_URL".to_string(), config.feeder_gateway.gateway_url());
        depends_on.insert(
            HEALTH_GATE_SERVICE.to_string(),
            ServiceDependency { condition: DependencyCondition::ServiceCompletedSuccessfully },
        );
    }

    ComposeService {
        image: config.image_tag(node.as_str()),
        container_name: Some(node.container_name()),
        command: runner_command(node, secrets, node_config.args.as_deref()),
        restart: RestartPolicy::UnlessStopped,
        cpus: Some(node_config.cpus),
        mem_limit: Some(node_config.memory.clone()),
        ports: vec![format!("{}:{}", node_config.rpc_host_port, node_config.rpc_container_port)],
        environment: environment
            .into_iter()
            .map(|(key, value)| (key, escape_interpolation(&value)))
            .collect(),
        volumes: vec![format!("{}:{DATA_DIR}", node.volume_name())],
        secrets: secrets.iter().map(|spec| spec.name.clone()).collect(),
        networks: vec![config.network_name.clone()],
        depends_on,
    }
}

/// Arguments of the image's `node_runner` entrypoint.
fn runner_command(node: NodeName, secrets: &[SecretSpec], args: Option<&[String]>) -> Vec<String> {
    let mut command = vec!["--node".to_string(), node.to_string()];
    for spec in secrets {
        let flag = if spec.required { "--secret" } else { "--optional-secret" };
        command.push(format!("{flag}={}", spec.env_var));
    }
    if let Some(args) = args {
        command.push("--".to_string());
        command.extend(args.iter().map(|arg| escape_interpolation(arg)));
    }
    command
}

fn health_gate_service(config: &HarnessConfig) -> ComposeService {
    let feeder_gateway = &config.feeder_gateway;
    ComposeService {
        image: config.image_tag(HEALTH_GATE_IMAGE_NAME),
        container_name: None,
        command: vec![
            format!("--host={}", feeder_gateway.host),
            format!("--port={}", feeder_gateway.port),
            format!("--interval-millis={}", feeder_gateway.interval_millis),
            format!("--connect-timeout-millis={}", feeder_gateway.connect_timeout_millis),
        ],
        restart: RestartPolicy::No,
        cpus: None,
        mem_limit: None,
        ports: vec![],
        environment: IndexMap::new(),
        volumes: vec![],
        secrets: vec![],
        networks: vec![config.network_name.clone()],
        depends_on: IndexMap::new(),
    }
}

// Compose resolves secret files relative to the compose file. Falls back to an absolute path
// when the relative one would depend on the working directory.
fn secret_file_reference(compose_dir: &Path, secret_file: &Path) -> std::io::Result<String> {
    let reference = match relative_from(compose_dir, secret_file) {
        Some(reference) => reference,
        None => std::env::current_dir()?.join(secret_file),
    };
    Ok(reference.display().to_string())
}

pub fn render_compose(compose: &ComposeFile, node: NodeName) -> Result<String, DeploymentError> {
    serde_yaml::to_string(compose).map_err(|source| DeploymentError::Yaml { node, source })
}

/// Renders the compose file of `node` and writes it to [`compose_file_path`].
pub fn write_compose_file(
    config: &HarnessConfig,
    node: NodeName,
) -> Result<PathBuf, DeploymentError> {
    let rendered = render_compose(&node_compose(config, node)?, node)?;
    let path = compose_file_path(config, node);
    let io_error = |source: std::io::Error| DeploymentError::Io { path: path.clone(), source };

    create_dir_all(config.compose_dir(node)).map_err(io_error)?;
    let mut writer = BufWriter::new(File::create(&path).map_err(io_error)?);
    writer.write_all(rendered.as_bytes()).map_err(io_error)?;
    writer.flush().map_err(io_error)?;
    info!("Wrote {}", path.display());
    Ok(path)
}
