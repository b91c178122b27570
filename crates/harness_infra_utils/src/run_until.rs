use std::future::Future;

use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, trace, warn};

#[cfg(test)]
#[path = "run_until_test.rs"]
mod run_until_test;

/// Struct to hold trace configuration
pub struct TraceConfig {
    pub level: LogLevel,
    pub message: String,
}

/// Enum for dynamically setting trace level
#[derive(Clone, Copy, Debug)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Bound on the number of attempts made by [`run_until`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempts {
    /// Keep trying until the condition holds.
    Unbounded,
    AtMost(usize),
}

impl Attempts {
    fn allows(&self, attempt: usize) -> bool {
        match self {
            Attempts::Unbounded => true,
            Attempts::AtMost(max) => attempt <= *max,
        }
    }
}

impl std::fmt::Display for Attempts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Attempts::Unbounded => write!(f, "∞"),
            Attempts::AtMost(max) => write!(f, "{max}"),
        }
    }
}

/// Runs an asynchronous function until a condition is met or the attempts run out.
///
/// # Arguments
/// - `interval`: Time between each attempt.
/// - `attempts`: Bound on the number of attempts.
/// - `executable`: An asynchronous function to execute, which returns a value of type `T`.
/// - `condition`: A closure that takes a value of type `T` and returns `true` if the condition is
///   met.
/// - `trace_config`: Optional trace configuration for logging.
///
/// # Returns
/// - `Option<T>`: Returns `Some(value)` if the condition is met within the attempts, otherwise
///   `None`. With [`Attempts::Unbounded`] this only returns once the condition holds.
pub async fn run_until<T, F, Fut, C>(
    interval: Duration,
    attempts: Attempts,
    mut executable: F,
    condition: C,
    trace_config: Option<TraceConfig>,
) -> Option<T>
where
    T: std::fmt::Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = T>,
    C: Fn(&T) -> bool,
{
    let mut attempt = 1;
    while attempts.allows(attempt) {
        let result = executable().await;

        if let Some(config) = &trace_config {
            let attempt_message = format!(
                "{}: Attempt {}/{}, Value {:?}",
                config.message, attempt, attempts, result
            );
            log_message(config.level, &attempt_message);
        }

        if condition(&result) {
            if let Some(config) = &trace_config {
                let success_message = format!(
                    "{}: Condition met on attempt {}/{}",
                    config.message, attempt, attempts
                );
                log_message(config.level, &success_message);
            }
            return Some(result);
        }

        attempt += 1;
        // No sleep after the final permitted attempt.
        if attempts.allows(attempt) {
            sleep(interval).await;
        }
    }

    if let Some(config) = &trace_config {
        let failure_message =
            format!("{}: Condition not met after {} attempts.", config.message, attempts);
        log_message(config.level, &failure_message);
    }

    None
}

/// Logs a message at the specified level
fn log_message(level: LogLevel, message: &str) {
    match level {
        LogLevel::Trace => trace!("{}", message),
        LogLevel::Debug => debug!("{}", message),
        LogLevel::Info => info!("{}", message),
        LogLevel::Warn => warn!("{}", message),
        LogLevel::Error => error!("{}", message),
    }
}
