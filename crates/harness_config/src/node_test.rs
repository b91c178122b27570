use std::str::FromStr;

use pretty_assertions::assert_eq;
use rstest::rstest;
use strum::IntoEnumIterator;

use crate::node::NodeName;

#[rstest]
#[case::madara(NodeName::Madara, "madara_runner", "madara_data", 9944)]
#[case::juno(NodeName::Juno, "juno_runner", "juno_data", 6060)]
#[case::pathfinder(NodeName::Pathfinder, "pathfinder_runner", "pathfinder_data", 9545)]
fn node_identities(
    #[case] node: NodeName,
    #[case] container: &str,
    #[case] volume: &str,
    #[case] port: u16,
) {
    assert_eq!(node.container_name(), container);
    assert_eq!(node.volume_name(), volume);
    assert_eq!(node.default_rpc_port(), port);
}

#[test]
fn string_forms_round_trip() {
    for node in NodeName::iter() {
        assert_eq!(NodeName::from_str(node.as_str()).unwrap(), node);
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, format!("\"{node}\""));
    }
    assert!(NodeName::from_str("geth").is_err());
}

#[test]
fn binary_path() {
    assert_eq!(
        NodeName::Pathfinder.default_binary_path().to_str().unwrap(),
        "/usr/local/bin/pathfinder"
    );
}
