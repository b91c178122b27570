use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;

/// In-container directory holding the node's persistent state.
pub const DATA_DIR: &str = "/data";
const BINARY_DIR: &str = "/usr/local/bin";

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    IntoStaticStr,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeName {
    Madara,
    Juno,
    Pathfinder,
}

impl NodeName {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    pub fn container_name(&self) -> String {
        format!("{self}_runner")
    }

    /// Named volume mounted at [`DATA_DIR`].
    pub fn volume_name(&self) -> String {
        format!("{self}_data")
    }

    /// Compose project name.
    pub fn project_name(&self) -> &'static str {
        self.as_str()
    }

    pub fn default_rpc_port(&self) -> u16 {
        match self {
            NodeName::Madara => 9944,
            NodeName::Juno => 6060,
            NodeName::Pathfinder => 9545,
        }
    }

    /// Location of the node binary inside its image.
    pub fn default_binary_path(&self) -> PathBuf {
        PathBuf::from(BINARY_DIR).join(self.as_str())
    }
}
