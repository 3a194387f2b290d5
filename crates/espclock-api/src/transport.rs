// Shared transport configuration for building the device's reqwest::Client.
//
// Request/response calls and the long-lived event stream share one client.
// The client itself carries only the connect timeout; per-call and
// per-read deadlines are applied by `DeviceClient` so the event stream can
// stay open indefinitely between pushes.

use std::time::Duration;

/// Timeout budget for talking to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Whole-request deadline for `/api/{method}` calls.
    pub request_timeout: Duration,
    /// TCP connect deadline, shared by calls and the event stream.
    pub connect_timeout: Duration,
    /// Deadline for the event stream's response head and for each line after it.
    pub read_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(concat!("espclock/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(crate::error::Error::Transport)
    }
}
