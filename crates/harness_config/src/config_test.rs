use std::io::Write;
use std::path::PathBuf;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::NamedTempFile;

use crate::config::{ConfigArgs, ConfigError, HarnessConfig, NodeConfig};
use crate::node::NodeName;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn args_with_file(file: &NamedTempFile) -> ConfigArgs {
    ConfigArgs { config_file: Some(file.path().to_path_buf()), ..Default::default() }
}

#[test]
fn default_config_is_valid() {
    let config = HarnessConfig::default();
    config.validate_all().unwrap();
    assert_eq!(
        config.nodes.keys().copied().collect::<Vec<_>>(),
        vec![NodeName::Madara, NodeName::Juno, NodeName::Pathfinder]
    );
    assert_eq!(config.image_tag("juno"), "starknet-harness/juno:latest");
    assert_eq!(config.tarball_path("juno"), PathBuf::from("images/juno.tar"));
    assert_eq!(config.compose_dir(NodeName::Madara), PathBuf::from("deployments/madara"));
    assert_eq!(
        config.feeder_gateway.feeder_gateway_url(),
        "http://madara_fgw:8080/feeder_gateway"
    );
    assert_eq!(config.feeder_gateway.gateway_url(), "http://madara_fgw:8080/gateway");
}

#[test]
fn partial_file_keeps_defaults_and_cli_overrides_win() {
    let file = config_file(r#"{"network_name": "from_file", "image_prefix": "acme"}"#);
    let args = ConfigArgs {
        network_name: Some("from_cli".to_string()),
        secrets_dir: Some(PathBuf::from("/etc/harness/secrets")),
        ..args_with_file(&file)
    };

    let config = HarnessConfig::from_args(&args).unwrap();

    assert_eq!(config.network_name, "from_cli");
    assert_eq!(config.image_prefix, "acme");
    assert_eq!(config.secrets_dir, PathBuf::from("/etc/harness/secrets"));
    assert_eq!(config.feeder_gateway, HarnessConfig::default().feeder_gateway);
    assert_eq!(config.nodes.len(), 3);
}

#[test]
fn nodes_in_file_replace_default_set() {
    let file = config_file(
        r#"{"nodes": {"juno": {"dockerfile": "juno.Dockerfile", "rpc_host_port": 16060,
            "rpc_container_port": 6060, "cpus": 1.5, "memory": "512m"}}}"#,
    );

    let config = HarnessConfig::from_args(&args_with_file(&file)).unwrap();

    assert_eq!(config.selected_nodes(None).unwrap(), vec![NodeName::Juno]);
    let juno = config.node(NodeName::Juno).unwrap();
    assert_eq!(juno.rpc_host_port, 16060);
    assert!(!juno.health_gated);
    assert!(juno.secrets.is_empty());
    assert_matches!(config.node(NodeName::Madara), Err(ConfigError::UnknownNode(NodeName::Madara)));
    assert_matches!(
        config.selected_nodes(Some(NodeName::Pathfinder)),
        Err(ConfigError::UnknownNode(NodeName::Pathfinder))
    );
}

#[test]
fn missing_file_is_a_config_file_error() {
    let args =
        ConfigArgs { config_file: Some(PathBuf::from("/no/such/harness.json")), ..Default::default() };
    assert_matches!(HarnessConfig::from_args(&args), Err(ConfigError::ConfigFileError(_)));
}

#[test]
fn malformed_file_is_a_config_file_error() {
    let file = config_file("{ not json");
    assert_matches!(
        HarnessConfig::from_args(&args_with_file(&file)),
        Err(ConfigError::ConfigFileError(message)) if message.contains("Failed to parse")
    );
}

#[test]
fn duplicate_host_ports_are_rejected() {
    let mut config = HarnessConfig::default();
    config.nodes.get_mut(&NodeName::Juno).unwrap().rpc_host_port = 9944;
    assert_matches!(config.validate_all(), Err(ConfigError::Validation(_)));
}

#[rstest]
#[case::zero_cpus(|node: &mut NodeConfig| node.cpus = 0.0)]
#[case::nan_cpus(|node: &mut NodeConfig| node.cpus = f64::NAN)]
#[case::zero_port(|node: &mut NodeConfig| node.rpc_container_port = 0)]
#[case::bad_memory_unit(|node: &mut NodeConfig| node.memory = "8gb".to_string())]
#[case::empty_memory(|node: &mut NodeConfig| node.memory = "g".to_string())]
fn invalid_node_is_rejected(#[case] corrupt: fn(&mut NodeConfig)) {
    let mut config = HarnessConfig::default();
    corrupt(config.nodes.get_mut(&NodeName::Pathfinder).unwrap());
    assert_matches!(
        config.validate_all(),
        Err(ConfigError::InvalidNode { node: NodeName::Pathfinder, .. })
    );
}

#[rstest]
#[case("8g")]
#[case("512m")]
#[case("1024")]
fn valid_memory_limits(#[case] memory: &str) {
    let mut config = HarnessConfig::default();
    config.nodes.get_mut(&NodeName::Madara).unwrap().memory = memory.to_string();
    config.validate_all().unwrap();
}

#[test]
fn zero_probe_interval_is_rejected() {
    let mut config = HarnessConfig::default();
    config.feeder_gateway.interval_millis = 0;
    assert_matches!(config.validate_all(), Err(ConfigError::Validation(_)));
}

#[test]
fn checked_in_config_matches_default() {
    let checked_in: HarnessConfig =
        serde_json::from_str(include_str!("../../../harness.json")).unwrap();
    assert_eq!(
        checked_in,
        HarnessConfig::default(),
        "harness.json is out of date, regenerate it with `deployment_generator \
         --dump-default-config harness.json`."
    );
}
