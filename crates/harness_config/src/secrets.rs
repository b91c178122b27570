use core::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize, Serializer};

#[cfg(test)]
#[path = "secrets_test.rs"]
mod secrets_test;

const REDACTED: &str = "<<redacted>>";
/// Directory where Compose mounts file-based secrets.
pub const SECRETS_MOUNT_DIR: &str = "/run/secrets";
const FILE_ENV_VAR_SUFFIX: &str = "_FILE";

/// Wraps a value whose contents must never be logged or serialized.
#[derive(Clone, Deserialize)]
#[serde(transparent, bound(deserialize = "T: Deserialize<'de>"))]
pub struct Sensitive<T> {
    inner: T,
}

impl<T> Sensitive<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn expose(&self) -> &T {
        &self.inner
    }

    fn redacted(&self) -> &'static str {
        REDACTED
    }
}

// Comparisons only consider the inner value.
impl<T: PartialEq> PartialEq for Sensitive<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.eq(&other.inner)
    }
}
impl<T: Eq> Eq for Sensitive<T> {}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.redacted())
    }
}
impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.redacted())
    }
}

impl<T> Serialize for Sensitive<T> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.redacted())
    }
}

/// A credential provisioned as a file under the secrets directory and exposed to the node as an
/// environment variable.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SecretSpec {
    /// File name under the secrets directory, also the Compose secret name.
    pub name: String,
    /// Variable receiving the secret's contents, e.g. `RPC_API_KEY`.
    pub env_var: String,
    /// Optional secrets are skipped when their path variable is unset.
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl SecretSpec {
    pub fn required(name: &str, env_var: &str) -> Self {
        Self { name: name.to_string(), env_var: env_var.to_string(), required: true }
    }

    pub fn optional(name: &str, env_var: &str) -> Self {
        Self { name: name.to_string(), env_var: env_var.to_string(), required: false }
    }

    /// Variable holding the path of the secret file, e.g. `RPC_API_KEY_FILE`.
    pub fn file_env_var(&self) -> String {
        format!("{}{FILE_ENV_VAR_SUFFIX}", self.env_var)
    }

    /// Where the secret is mounted inside the container.
    pub fn container_path(&self) -> PathBuf {
        PathBuf::from(SECRETS_MOUNT_DIR).join(&self.name)
    }

    pub fn rpc_api_key() -> Self {
        Self::required("rpc_api_key", "RPC_API_KEY")
    }

    pub fn gateway_key() -> Self {
        Self::optional("gateway_key", "GATEWAY_KEY")
    }
}
