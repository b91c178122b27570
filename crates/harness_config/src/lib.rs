//! Configuration shared by every harness binary.
//!
//! [`HarnessConfig`] is loaded from an optional JSON file, overridden by command line flags and
//! validated before use. [`NodeName`] identifies the three supported Starknet nodes.

pub mod config;
pub mod node;
pub mod secrets;

pub use config::{ConfigArgs, ConfigError, FeederGatewayConfig, HarnessConfig, NodeConfig};
pub use node::NodeName;
pub use secrets::{SecretSpec, Sensitive};
