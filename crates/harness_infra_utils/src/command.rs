use std::env;
use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[cfg(test)]
#[path = "command_test.rs"]
mod command_test;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to execute `{command}`: {source}. Hint: {hint}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
        hint: String,
    },
    #[error("`{command}` exited with {status}. Hint: {hint}")]
    Failed { command: String, status: ExitStatus, stderr: String, hint: String },
}

/// Where the child's stdout and stderr go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    /// Stream to the parent's terminal.
    Inherit,
    /// Collect into the returned [`Output`].
    Capture,
}

/// Returns a command running in `working_dir`, with cargo environment variables filtered out.
///
/// # Arguments
/// * `command_name` - The program to run.
/// * `working_dir` - The directory the command runs in.
pub fn create_shell_command(command_name: &str, working_dir: &Path) -> Command {
    let mut command = Command::new(command_name);
    command.current_dir(working_dir);
    // Filter out all CARGO_ environment variables.
    env::vars().filter(|(key, _)| key.starts_with("CARGO_")).for_each(|(key, _)| {
        command.env_remove(key);
    });
    command
}

/// Renders the program and its arguments as a single line, for logs and error messages.
pub fn describe_command(command: &Command) -> String {
    let std_command = command.as_std();
    std::iter::once(std_command.get_program())
        .chain(std_command.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `command` to completion and fails unless it exits successfully.
pub async fn run_command(
    command: &mut Command,
    mode: OutputMode,
    hint: &str,
) -> Result<Output, CommandError> {
    let description = describe_command(command);
    debug!("Running `{description}`");

    match mode {
        OutputMode::Inherit => command.stdout(Stdio::inherit()).stderr(Stdio::inherit()),
        OutputMode::Capture => command.stdout(Stdio::piped()).stderr(Stdio::piped()),
    };

    let output = command.output().await.map_err(|source| CommandError::Spawn {
        command: description.clone(),
        source,
        hint: hint.to_string(),
    })?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            command: description,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            hint: hint.to_string(),
        });
    }
    Ok(output)
}

/// Runs `command`, capturing its output, and returns its stdout split into trimmed non-empty lines.
pub async fn run_command_lines(
    command: &mut Command,
    hint: &str,
) -> Result<Vec<String>, CommandError> {
    let output = run_command(command, OutputMode::Capture, hint).await?;
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
