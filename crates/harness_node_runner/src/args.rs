//! Argument templates passed to the node binaries.
//!
//! A template is a plain argument in which `${VAR}` is replaced by the value of `VAR`. `VAR` is
//! looked up among the loaded secrets, then among the plain variables; an unset variable is an
//! error. `${VAR?}` marks the variable as optional: when it is unset the whole argument is
//! dropped.

use std::collections::BTreeMap;

use harness_config::node::DATA_DIR;
use harness_config::NodeName;

use crate::errors::RunnerError;
use crate::secrets::SecretEnv;

#[cfg(test)]
#[path = "args_test.rs"]
mod args_test;

const PLACEHOLDER_START: &str = "${";
const PLACEHOLDER_END: char = '}';
const OPTIONAL_MARKER: char = '?';
const REDACTED: &str = "<<redacted>>";

const MADARA_ARGS: &[&str] = &[
    "--name=madara",
    "--full",
    "--network=${NETWORK}",
    "--base-path=${DATA_DIR}",
    "--rpc-port=${RPC_PORT}",
    "--rpc-external",
    "--rpc-cors=*",
    "--l1-endpoint=https://eth-${ETHEREUM_NETWORK}.g.alchemy.com/v2/${RPC_API_KEY}",
    "--gateway-key=${GATEWAY_KEY?}",
];

const JUNO_ARGS: &[&str] = &[
    "--db-path=${DATA_DIR}",
    "--http",
    "--http-host=0.0.0.0",
    "--http-port=${RPC_PORT}",
    "--network=${NETWORK}",
    "--cn-feeder-url=${FEEDER_GATEWAY_URL?}",
    "--cn-gateway-url=${GATEWAY_URL?}",
    "--eth-node=wss://eth-${ETHEREUM_NETWORK}.g.alchemy.com/v2/${RPC_API_KEY}",
    "--gw-api-key=${GATEWAY_KEY?}",
];

const PATHFINDER_ARGS: &[&str] = &[
    "--data-directory=${DATA_DIR}",
    "--http-rpc=0.0.0.0:${RPC_PORT}",
    "--network=${NETWORK}",
    "--chain-id=${CHAIN_ID?}",
    "--feeder-gateway-url=${FEEDER_GATEWAY_URL?}",
    "--gateway-url=${GATEWAY_URL?}",
    "--ethereum.url=wss://eth-${ETHEREUM_NETWORK}.g.alchemy.com/v2/${RPC_API_KEY}",
    "--gateway-api-key=${GATEWAY_KEY?}",
];

pub fn default_arg_templates(node: NodeName) -> Vec<String> {
    let templates = match node {
        NodeName::Madara => MADARA_ARGS,
        NodeName::Juno => JUNO_ARGS,
        NodeName::Pathfinder => PATHFINDER_ARGS,
    };
    templates.iter().map(|template| template.to_string()).collect()
}

/// Variables every node can rely on, unless overridden by the environment.
pub fn builtin_variables(node: NodeName) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("DATA_DIR".to_string(), DATA_DIR.to_string()),
        ("RPC_PORT".to_string(), node.default_rpc_port().to_string()),
        ("NETWORK".to_string(), "mainnet".to_string()),
        ("ETHEREUM_NETWORK".to_string(), "mainnet".to_string()),
    ])
}

/// Arguments after placeholder substitution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpandedArgs {
    pub args: Vec<String>,
    /// Same arguments with every secret value replaced, safe to log.
    pub redacted: Vec<String>,
}

/// Values placeholders resolve to.
pub struct Variables<'a> {
    pub secrets: &'a SecretEnv,
    pub plain: &'a BTreeMap<String, String>,
}

enum Lookup<'a> {
    Secret(&'a str),
    Plain(&'a str),
    Unset,
}

impl Variables<'_> {
    fn lookup(&self, name: &str) -> Lookup<'_> {
        if let Some(secret) = self.secrets.get(name) {
            return Lookup::Secret(secret.expose());
        }
        match self.plain.get(name) {
            Some(value) => Lookup::Plain(value),
            None => Lookup::Unset,
        }
    }
}

pub fn expand_args(
    templates: &[String],
    variables: &Variables<'_>,
) -> Result<ExpandedArgs, RunnerError> {
    let mut expanded = ExpandedArgs::default();
    for template in templates {
        if let Some((arg, redacted)) = expand_template(template, variables)? {
            expanded.args.push(arg);
            expanded.redacted.push(redacted);
        }
    }
    Ok(expanded)
}

/// Returns `None` when the argument references an unset optional variable.
fn expand_template(
    template: &str,
    variables: &Variables<'_>,
) -> Result<Option<(String, String)>, RunnerError> {
    let mut arg = String::with_capacity(template.len());
    let mut redacted = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(PLACEHOLDER_START) {
        arg.push_str(&rest[..start]);
        redacted.push_str(&rest[..start]);
        let after_start = &rest[start + PLACEHOLDER_START.len()..];
        let end = after_start.find(PLACEHOLDER_END).ok_or_else(|| {
            RunnerError::MalformedTemplate { template: template.to_string() }
        })?;
        let placeholder = &after_start[..end];
        let (name, optional) = match placeholder.strip_suffix(OPTIONAL_MARKER) {
            Some(name) => (name, true),
            None => (placeholder, false),
        };
        if name.is_empty() {
            return Err(RunnerError::MalformedTemplate { template: template.to_string() });
        }

        match variables.lookup(name) {
            Lookup::Secret(value) => {
                arg.push_str(value);
                redacted.push_str(REDACTED);
            }
            Lookup::Plain(value) => {
                arg.push_str(value);
                redacted.push_str(value);
            }
            Lookup::Unset if optional => return Ok(None),
            Lookup::Unset => {
                return Err(RunnerError::UnresolvedPlaceholder {
                    variable: name.to_string(),
                    template: template.to_string(),
                });
            }
        }
        rest = &after_start[end + 1..];
    }

    arg.push_str(rest);
    redacted.push_str(rest);
    Ok(Some((arg, redacted)))
}
