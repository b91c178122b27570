//! Harness configuration: where things live, how the feeder gateway is reached and how each node
//! is built, limited and launched.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use harness_infra_utils::template::Template;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::node::NodeName;
use crate::secrets::SecretSpec;

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

pub const DEFAULT_CONFIG_FILE: &str = "harness.json";
const IMAGE_TAG_TEMPLATE: &str = "{}/{}:latest";
const FEEDER_GATEWAY_URL_TEMPLATE: &str = "http://{}:{}/feeder_gateway";
const GATEWAY_URL_TEMPLATE: &str = "http://{}:{}/gateway";
pub const HEALTH_GATE_IMAGE_NAME: &str = "health_gate";

/// Top-level configuration of the harness.
///
/// Every field has a default, so an absent or partial config file is valid. A `nodes` entry in the
/// file replaces the whole default node set.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_unique_host_ports"))]
pub struct HarnessConfig {
    /// External Docker network shared by all nodes and the feeder gateway.
    #[validate(length(min = 1))]
    pub network_name: String,
    /// Starknet network the nodes sync.
    pub network: String,
    pub chain_id: String,
    /// Ethereum network of the L1 RPC provider.
    pub ethereum_network: String,
    #[validate(length(min = 1))]
    pub image_prefix: String,
    pub secrets_dir: PathBuf,
    /// Image tarballs are cached here.
    pub artifacts_dir: PathBuf,
    /// Generated compose files are written here, one directory per node.
    pub deployments_dir: PathBuf,
    pub docker_context: PathBuf,
    pub health_gate_dockerfile: PathBuf,
    pub health_gate_prerequisites: Vec<PathBuf>,
    #[validate(nested)]
    pub feeder_gateway: FeederGatewayConfig,
    pub nodes: BTreeMap<NodeName, NodeConfig>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            network_name: "starknet_harness".to_string(),
            network: "mainnet".to_string(),
            chain_id: "SN_MAIN".to_string(),
            ethereum_network: "mainnet".to_string(),
            image_prefix: "starknet-harness".to_string(),
            secrets_dir: PathBuf::from("secrets"),
            artifacts_dir: PathBuf::from("images"),
            deployments_dir: PathBuf::from("deployments"),
            docker_context: PathBuf::from("."),
            health_gate_dockerfile: PathBuf::from("docker/health_gate.Dockerfile"),
            health_gate_prerequisites: vec![
                PathBuf::from("crates/harness_health_gate/src"),
                PathBuf::from("crates/harness_infra_utils/src"),
            ],
            feeder_gateway: FeederGatewayConfig::default(),
            nodes: NodeName::iter().map(|node| (node, NodeConfig::default_for(node))).collect(),
        }
    }
}

impl HarnessConfig {
    /// Loads the config file named by `args` (if any), applies the command line overrides and
    /// validates the result.
    pub fn from_args(args: &ConfigArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config_file {
            Some(config_file) => Self::load_from_file(config_file)?,
            None => {
                let default_file = Path::new(DEFAULT_CONFIG_FILE);
                if default_file.is_file() {
                    Self::load_from_file(default_file)?
                } else {
                    Self::default()
                }
            }
        };

        // Override with CLI arguments if provided.
        if let Some(network_name) = &args.network_name {
            config.network_name = network_name.clone();
        }
        if let Some(secrets_dir) = &args.secrets_dir {
            config.secrets_dir = secrets_dir.clone();
        }
        if let Some(artifacts_dir) = &args.artifacts_dir {
            config.artifacts_dir = artifacts_dir.clone();
        }
        if let Some(deployments_dir) = &args.deployments_dir {
            config.deployments_dir = deployments_dir.clone();
        }
        if let Some(image_prefix) = &args.image_prefix {
            config.image_prefix = image_prefix.clone();
        }
        if let Some(ethereum_network) = &args.ethereum_network {
            config.ethereum_network = ethereum_network.clone();
        }

        config.validate_all()?;
        Ok(config)
    }

    pub fn load_from_file(config_file: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(config_file).map_err(|e| {
            ConfigError::ConfigFileError(format!(
                "Failed to read config file {}: {}",
                config_file.display(),
                e
            ))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            ConfigError::ConfigFileError(format!(
                "Failed to parse config file {}: {}",
                config_file.display(),
                e
            ))
        })
    }

    /// Validates the config and every node in it.
    pub fn validate_all(&self) -> Result<(), ConfigError> {
        self.validate()?;
        for (node, node_config) in &self.nodes {
            node_config
                .validate()
                .map_err(|source| ConfigError::InvalidNode { node: *node, source })?;
        }
        Ok(())
    }

    pub fn node(&self, node: NodeName) -> Result<&NodeConfig, ConfigError> {
        self.nodes.get(&node).ok_or(ConfigError::UnknownNode(node))
    }

    /// The nodes to operate on: `node` alone, or every configured node.
    pub fn selected_nodes(&self, node: Option<NodeName>) -> Result<Vec<NodeName>, ConfigError> {
        match node {
            Some(node) => {
                self.node(node)?;
                Ok(vec![node])
            }
            None => Ok(self.nodes.keys().copied().collect()),
        }
    }

    pub fn image_tag(&self, image_name: &str) -> String {
        Template::new(IMAGE_TAG_TEMPLATE).format(&[&self.image_prefix, &image_name])
    }

    pub fn tarball_path(&self, image_name: &str) -> PathBuf {
        self.artifacts_dir.join(format!("{image_name}.tar"))
    }

    pub fn compose_dir(&self, node: NodeName) -> PathBuf {
        self.deployments_dir.join(node.as_str())
    }
}

fn validate_unique_host_ports(config: &HarnessConfig) -> Result<(), ValidationError> {
    let mut seen: HashMap<u16, NodeName> = HashMap::new();
    for (node, node_config) in &config.nodes {
        if let Some(other) = seen.insert(node_config.rpc_host_port, *node) {
            return Err(ValidationError::new("duplicate_host_port").with_message(Cow::Owned(
                format!(
                    "Nodes {other} and {node} both publish host port {}.",
                    node_config.rpc_host_port
                ),
            )));
        }
    }
    Ok(())
}

/// The shared feeder gateway gating node startup.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(default)]
pub struct FeederGatewayConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    /// Delay between reachability probes.
    #[validate(range(min = 1))]
    pub interval_millis: u64,
    /// Upper bound on a single connect attempt.
    #[validate(range(min = 1))]
    pub connect_timeout_millis: u64,
}

impl Default for FeederGatewayConfig {
    fn default() -> Self {
        Self {
            host: "madara_fgw".to_string(),
            port: 8080,
            interval_millis: 1000,
            connect_timeout_millis: 5000,
        }
    }
}

impl FeederGatewayConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_millis)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_millis)
    }

    pub fn feeder_gateway_url(&self) -> String {
        Template::new(FEEDER_GATEWAY_URL_TEMPLATE).format(&[&self.host, &self.port])
    }

    pub fn gateway_url(&self) -> String {
        Template::new(GATEWAY_URL_TEMPLATE).format(&[&self.host, &self.port])
    }
}

/// How a single node is built, limited and launched.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[validate(schema(function = "validate_resource_limits"))]
pub struct NodeConfig {
    pub dockerfile: PathBuf,
    /// Files or directories whose changes invalidate the image, besides the Dockerfile.
    #[serde(default)]
    pub prerequisites: Vec<PathBuf>,
    #[validate(range(min = 1))]
    pub rpc_host_port: u16,
    #[validate(range(min = 1))]
    pub rpc_container_port: u16,
    pub cpus: f64,
    /// Memory ceiling in Compose notation, e.g. `8g`.
    pub memory: String,
    /// Whether startup waits for the feeder gateway.
    #[serde(default)]
    pub health_gated: bool,
    #[serde(default)]
    pub secrets: Vec<SecretSpec>,
    /// Replaces the runner's default argument templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}

impl NodeConfig {
    pub fn default_for(node: NodeName) -> Self {
        let (cpus, memory, health_gated) = match node {
            NodeName::Madara => (4.0, "16g", false),
            NodeName::Juno => (4.0, "8g", true),
            NodeName::Pathfinder => (4.0, "8g", true),
        };
        Self {
            dockerfile: PathBuf::from(format!("docker/{node}.Dockerfile")),
            prerequisites: vec![
                PathBuf::from("crates/harness_node_runner/src"),
                PathBuf::from("crates/harness_config/src"),
                PathBuf::from("crates/harness_infra_utils/src"),
            ],
            rpc_host_port: node.default_rpc_port(),
            rpc_container_port: node.default_rpc_port(),
            cpus,
            memory: memory.to_string(),
            health_gated,
            secrets: vec![SecretSpec::rpc_api_key(), SecretSpec::gateway_key()],
            args: None,
        }
    }
}

fn validate_resource_limits(config: &NodeConfig) -> Result<(), ValidationError> {
    if !(config.cpus.is_finite() && config.cpus > 0.0) {
        return Err(ValidationError::new("cpus").with_message(Cow::Owned(format!(
            "cpus must be a positive number, got {}.",
            config.cpus
        ))));
    }
    if !is_memory_limit(&config.memory) {
        return Err(ValidationError::new("memory").with_message(Cow::Owned(format!(
            "memory must look like `8g`, `512m` or `1024`, got {:?}.",
            config.memory
        ))));
    }
    Ok(())
}

/// `<digits>` optionally followed by one of `k`, `m`, `g`.
fn is_memory_limit(memory: &str) -> bool {
    let digits = memory.strip_suffix(['k', 'm', 'g']).unwrap_or(memory);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Command line flags overriding the config file.
#[derive(Args, Clone, Debug, Default)]
pub struct ConfigArgs {
    /// Path to JSON configuration file. Defaults to `harness.json` when present.
    #[arg(long, value_name = "FILE", env = "HARNESS_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Docker network shared by the nodes.
    #[arg(long, value_name = "NAME")]
    pub network_name: Option<String>,

    /// Directory holding the secret files.
    #[arg(long, value_name = "DIR")]
    pub secrets_dir: Option<PathBuf>,

    /// Directory where image tarballs are cached.
    #[arg(long, value_name = "DIR")]
    pub artifacts_dir: Option<PathBuf>,

    /// Directory where compose files are generated.
    #[arg(long, value_name = "DIR")]
    pub deployments_dir: Option<PathBuf>,

    /// Repository prefix of the image tags.
    #[arg(long, value_name = "PREFIX")]
    pub image_prefix: Option<String>,

    /// Ethereum network of the L1 RPC provider.
    #[arg(long, value_name = "NETWORK")]
    pub ethereum_network: Option<String>,
}

/// Errors that can occur during configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file error: {0}")]
    ConfigFileError(String),
    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("Invalid configuration of node {node}: {source}")]
    InvalidNode {
        node: NodeName,
        #[source]
        source: ValidationErrors,
    },
    #[error("Node {0} is not configured.")]
    UnknownNode(NodeName),
}
