use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(any(feature = "testing", test))]
use mockall::automock;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

/// A `host:port` pair resolved on every probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeTarget {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A single reachability check.
#[cfg_attr(any(feature = "testing", test), automock)]
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn probe(&self, target: &ProbeTarget) -> bool;
}

/// Reachable means a TCP connection is accepted within `connect_timeout`.
pub struct TcpProbe {
    pub connect_timeout: Duration,
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn probe(&self, target: &ProbeTarget) -> bool {
        let connect = TcpStream::connect((target.host.as_str(), target.port));
        match timeout(self.connect_timeout, connect).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(err)) => {
                trace!("Connecting to {target} failed: {err}");
                false
            }
            Err(_elapsed) => {
                trace!("Connecting to {target} timed out after {:?}", self.connect_timeout);
                false
            }
        }
    }
}
