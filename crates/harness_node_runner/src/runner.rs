use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::process::Command;

use harness_config::{NodeName, SecretSpec};
use tracing::info;

use crate::args::{builtin_variables, default_arg_templates, expand_args, ExpandedArgs, Variables};
use crate::errors::RunnerError;
use crate::secrets::{resolve_secrets, SecretEnv};

#[cfg(test)]
#[path = "runner_test.rs"]
mod runner_test;

/// Secrets a node loads when none are named explicitly.
pub fn default_secret_specs() -> Vec<SecretSpec> {
    vec![SecretSpec::rpc_api_key(), SecretSpec::gateway_key()]
}

/// Builds secret specs from variable names, e.g. `RPC_API_KEY`.
pub fn secret_specs_from_names(required: &[String], optional: &[String]) -> Vec<SecretSpec> {
    let spec = |env_var: &String, required: bool| SecretSpec {
        name: env_var.to_lowercase(),
        env_var: env_var.clone(),
        required,
    };
    required
        .iter()
        .map(|env_var| spec(env_var, true))
        .chain(optional.iter().map(|env_var| spec(env_var, false)))
        .collect()
}

/// A fully resolved node invocation.
pub struct Launch {
    pub binary: PathBuf,
    pub args: ExpandedArgs,
    pub secrets: SecretEnv,
}

impl Launch {
    /// Loads the secrets named by `specs` and expands `templates`, or the node's defaults, against
    /// them and `env`.
    pub fn prepare(
        node: NodeName,
        binary: PathBuf,
        templates: Option<Vec<String>>,
        specs: &[SecretSpec],
        env: &HashMap<String, String>,
    ) -> Result<Self, RunnerError> {
        let secrets = resolve_secrets(specs, env)?;
        let mut plain: BTreeMap<String, String> = builtin_variables(node);
        plain.extend(env.iter().map(|(key, value)| (key.clone(), value.clone())));

        let templates = templates.unwrap_or_else(|| default_arg_templates(node));
        let args = expand_args(&templates, &Variables { secrets: &secrets, plain: &plain })?;
        Ok(Self { binary, args, secrets })
    }

    /// The command line with secret values masked.
    pub fn redacted_command_line(&self) -> String {
        std::iter::once(self.binary.display().to_string())
            .chain(self.args.redacted.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The node command, with every loaded secret exported in its environment.
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command.args(&self.args.args);
        for (env_var, value) in &self.secrets {
            command.env(env_var, value.expose());
        }
        command
    }

    /// Replaces the current process with the node. Only returns on failure.
    pub fn exec(self) -> RunnerError {
        info!("Executing {}", self.redacted_command_line());
        let source = exec_command(self.command());
        RunnerError::Exec { binary: self.binary, source }
    }
}

impl std::fmt::Debug for Launch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Launch")
            .field("binary", &self.binary)
            .field("args", &self.args.redacted)
            .field("secrets", &self.secrets)
            .finish()
    }
}

#[cfg(unix)]
fn exec_command(mut command: Command) -> std::io::Error {
    use std::os::unix::process::CommandExt;

    command.exec()
}

#[cfg(not(unix))]
fn exec_command(_command: Command) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Unsupported, "exec requires a unix platform")
}
