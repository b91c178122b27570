use std::time::Duration;

use harness_infra_utils::run_until::{run_until, Attempts, LogLevel, TraceConfig};
use thiserror::Error;
use tracing::info;

use crate::probe::{ProbeTarget, ReachabilityProbe};

#[cfg(test)]
#[path = "gate_test.rs"]
mod gate_test;

#[derive(Debug, Error)]
pub enum HealthGateError {
    #[error("{target} is still unreachable after {attempts} attempts.")]
    Unreachable { target: ProbeTarget, attempts: usize },
}

/// Probes `target` every `interval` until it is reachable and returns the number of attempts.
///
/// With [`Attempts::Unbounded`] this only returns once the target is reachable.
pub async fn wait_until_reachable(
    probe: &dyn ReachabilityProbe,
    target: &ProbeTarget,
    interval: Duration,
    attempts: Attempts,
) -> Result<usize, HealthGateError> {
    info!("Waiting for {target} to become reachable, probing every {interval:?}.");
    let mut attempt = 0;
    let probe_once = || {
        attempt += 1;
        let current = attempt;
        async move { (current, probe.probe(target).await) }
    };

    let trace_config =
        TraceConfig { level: LogLevel::Debug, message: format!("Probing {target}") };
    let outcome =
        run_until(interval, attempts, probe_once, |(_, reachable)| *reachable, Some(trace_config))
            .await;
    match outcome {
        Some((attempts, _)) => {
            info!("{target} is reachable after {attempts} attempts.");
            Ok(attempts)
        }
        None => Err(HealthGateError::Unreachable { target: target.clone(), attempts: attempt }),
    }
}
