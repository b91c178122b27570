use std::time::Duration;

use clap::Parser;
use harness_config::FeederGatewayConfig;
use harness_infra_utils::run_until::Attempts;

use crate::probe::{ProbeTarget, TcpProbe};

#[cfg(test)]
#[path = "cli_test.rs"]
mod cli_test;

/// Exits successfully once `host:port` accepts a TCP connection.
#[derive(Parser, Debug)]
#[command(name = "health_gate")]
pub struct HealthGateCli {
    #[arg(long, default_value_t = FeederGatewayConfig::default().host)]
    pub host: String,

    #[arg(long, default_value_t = FeederGatewayConfig::default().port)]
    pub port: u16,

    /// Delay between probes.
    #[arg(
        long,
        default_value_t = FeederGatewayConfig::default().interval_millis,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_millis: u64,

    /// Upper bound on a single connect attempt.
    #[arg(
        long,
        default_value_t = FeederGatewayConfig::default().connect_timeout_millis,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub connect_timeout_millis: u64,

    /// Give up after this many probes. Probes forever when omitted.
    #[arg(long, value_parser = parse_max_attempts)]
    pub max_attempts: Option<usize>,
}

impl HealthGateCli {
    pub fn target(&self) -> ProbeTarget {
        ProbeTarget { host: self.host.clone(), port: self.port }
    }

    pub fn probe(&self) -> TcpProbe {
        TcpProbe { connect_timeout: Duration::from_millis(self.connect_timeout_millis) }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_millis)
    }

    pub fn attempts(&self) -> Attempts {
        self.max_attempts.map_or(Attempts::Unbounded, Attempts::AtMost)
    }
}

fn parse_max_attempts(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(attempts) => Ok(attempts),
        Err(err) => Err(err.to_string()),
    }
}
