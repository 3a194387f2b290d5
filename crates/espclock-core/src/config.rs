// ── Device connection settings ──

use std::time::Duration;

use espclock_api::TransportConfig;

/// Default host: the address the clock uses in access-point mode.
pub const DEFAULT_HOST: &str = "192.168.4.1";

/// Everything needed to talk to one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// `host` or `host:port`, no scheme.
    pub host: String,
    /// Budget for a single request/response call.
    pub request_timeout: Duration,
    /// TCP connect budget.
    pub connect_timeout: Duration,
    /// Event stream: budget for the response head and between lines.
    pub read_timeout: Duration,
    /// Cooldown after an event stream failure.
    pub reconnect_delay: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(30),
        }
    }
}

impl DeviceConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Timeout budget for the HTTP layer.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            request_timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
        }
    }
}
