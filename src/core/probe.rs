use std::time::Duration;

use async_trait::async_trait;

use crate::core::ent::{Report, Target};
use crate::error::Result;

/// One liveness check against one target.
///
/// A failed check is data, not an error: connection failures, timeouts and
/// bad statuses all come back as a result with a diagnostic message.
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    type Output: Report;

    async fn probe(&self, target: &Target) -> Self::Output;
}

/// A flavour of the engine: how its targets are probed and how often.
pub trait Worker: Send + Sync + 'static {
    type Probe: Probe;

    /// Short name used in logs, e.g. `snmp` or `url`.
    fn name(&self) -> &'static str;

    fn default_interval(&self) -> Duration;

    /// Builds the probe owned by the watcher of `target`. Errors here are
    /// boot-time configuration failures.
    fn probe_for(&self, target: &Target) -> Result<Self::Probe>;
}
