//! Per-engine configuration.

use std::time::Duration;

/// Default deadline for a single RPC call, downlink or uplink.
pub(crate) const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline for a worker's cooperative teardown.
const DEFAULT_TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// The two timing knobs of an engine.
///
/// Both apply per-engine to every call and every teardown; multiple engines
/// in one process can use different values without interference.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tapestry_runtime::EngineConfig;
///
/// let config = EngineConfig::default().with_teardown_timeout(Duration::from_secs(2));
/// assert_eq!(config.rpc_timeout(), Duration::from_secs(10));
/// assert_eq!(config.teardown_timeout(), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    rpc_timeout: Duration,
    teardown_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            teardown_timeout: DEFAULT_TEARDOWN_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Creates the default configuration (10 s RPC, 5 s teardown).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the per-call RPC deadline.
    #[must_use]
    pub const fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    /// Overrides the cooperative teardown deadline.
    #[must_use]
    pub const fn with_teardown_timeout(mut self, timeout: Duration) -> Self {
        self.teardown_timeout = timeout;
        self
    }

    /// Returns the per-call RPC deadline.
    #[must_use]
    pub const fn rpc_timeout(&self) -> Duration {
        self.rpc_timeout
    }

    /// Returns the cooperative teardown deadline.
    #[must_use]
    pub const fn teardown_timeout(&self) -> Duration {
        self.teardown_timeout
    }
}
