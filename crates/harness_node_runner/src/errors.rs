use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Secret path variable {file_env_var} is not set.")]
    MissingPathVariable { file_env_var: String },
    #[error("Failed to read secret file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Secret(#[from] SecretError),
    #[error("Argument {template:?} has an unterminated placeholder.")]
    MalformedTemplate { template: String },
    #[error("Argument {template:?} references {variable}, which is not set.")]
    UnresolvedPlaceholder { variable: String, template: String },
    #[error("Failed to exec {binary}: {source}")]
    Exec {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
