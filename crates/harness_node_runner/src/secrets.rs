use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use harness_config::{SecretSpec, Sensitive};
use tracing::{debug, info};

use crate::errors::SecretError;

#[cfg(test)]
#[path = "secrets_test.rs"]
mod secrets_test;

/// Secret contents keyed by the variable they are exported as.
pub type SecretEnv = BTreeMap<String, Sensitive<String>>;

/// Keeps the variables whose name and value are both valid unicode.
///
/// Other variables cannot name a secret file nor appear in an argument template.
pub fn unicode_env(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> HashMap<String, String> {
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

/// Reads the secret at `path`, trimming surrounding whitespace.
pub fn load_secret(path: &Path) -> Result<Sensitive<String>, SecretError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|source| SecretError::Unreadable { path: path.to_path_buf(), source })?;
    Ok(Sensitive::new(contents.trim().to_string()))
}

/// Loads every secret in `specs` from the file named by its `<VAR>_FILE` variable in `env`.
///
/// Optional secrets whose path variable is unset are skipped. A set path must be readable.
pub fn resolve_secrets(
    specs: &[SecretSpec],
    env: &HashMap<String, String>,
) -> Result<SecretEnv, SecretError> {
    let mut secrets = SecretEnv::new();
    for spec in specs {
        let file_env_var = spec.file_env_var();
        let Some(path) = env.get(&file_env_var) else {
            if spec.required {
                return Err(SecretError::MissingPathVariable { file_env_var });
            }
            debug!("Optional secret {} skipped: {file_env_var} is not set.", spec.env_var);
            continue;
        };
        let value = load_secret(&PathBuf::from(path))?;
        info!("Loaded secret {} from {path}.", spec.env_var);
        secrets.insert(spec.env_var.clone(), value);
    }
    Ok(secrets)
}
