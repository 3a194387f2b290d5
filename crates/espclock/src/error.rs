//! CLI error types with miette diagnostics.
//!
//! Maps configuration problems and device unavailability into user-facing
//! errors with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use espclock_config::ConfigError;
use espclock_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const UNAVAILABLE: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Device ───────────────────────────────────────────────────────

    #[error("Could not connect to the clock at {host}")]
    #[diagnostic(
        code(espclock::connection_failed),
        help(
            "Check that the clock is powered and on the same network.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { host: String, reason: String },

    #[error("The clock at {host} did not answer within {seconds}s")]
    #[diagnostic(
        code(espclock::timeout),
        help("Raise request_timeout in the config file or check the clock's WiFi signal.")
    )]
    Timeout { host: String, seconds: u64 },

    #[error("The clock at {host} is unavailable")]
    #[diagnostic(code(espclock::unavailable), help("{reason}"))]
    Unavailable { host: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("No device configured")]
    #[diagnostic(
        code(espclock::no_device),
        help(
            "Pass --host, or save a device with: espclock config set-host <HOST>\n\
             Config file: {path}"
        )
    )]
    NoDevice { path: String },

    #[error("Device '{name}' not found in configuration")]
    #[diagnostic(
        code(espclock::device_not_found),
        help("Configured devices: {available}")
    )]
    DeviceNotFound { name: String, available: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(espclock::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(espclock::config))]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(espclock::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Unavailable { .. } => exit_code::UNAVAILABLE,
            Self::NoDevice { .. } | Self::DeviceNotFound { .. } | Self::Validation { .. } => {
                exit_code::USAGE
            }
            Self::Config(_) | Self::Io(_) | Self::Json(_) => exit_code::GENERAL,
        }
    }

    /// Explain why the device at `host` has no snapshot.
    pub fn unavailable(host: &str, reason: Option<CoreError>) -> Self {
        let host = host.to_owned();
        match reason {
            Some(CoreError::ConnectionFailed { reason, .. }) => Self::ConnectionFailed { host, reason },
            Some(CoreError::Timeout { timeout_secs }) => Self::Timeout {
                host,
                seconds: timeout_secs,
            },
            Some(other) => Self::Unavailable {
                host,
                reason: other.to_string(),
            },
            None => Self::Unavailable {
                host,
                reason: "The clock has not reported any state yet.".into(),
            },
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config { message } => Self::Validation {
                field: "host".into(),
                reason: message,
            },
            other => Self::unavailable("(unknown)", Some(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailability_maps_to_exit_codes() {
        let refused = CliError::unavailable(
            "clock.lan",
            Some(CoreError::ConnectionFailed {
                url: "http://clock.lan/api/status".into(),
                reason: "connection refused".into(),
            }),
        );
        assert_eq!(refused.exit_code(), exit_code::CONNECTION);

        let slow = CliError::unavailable("clock.lan", Some(CoreError::Timeout { timeout_secs: 5 }));
        assert_eq!(slow.exit_code(), exit_code::TIMEOUT);

        let rejected = CliError::unavailable(
            "clock.lan",
            Some(CoreError::Rejected {
                status: 500,
                url: "http://clock.lan/api/status".into(),
            }),
        );
        assert_eq!(rejected.exit_code(), exit_code::UNAVAILABLE);
        assert_eq!(CliError::unavailable("clock.lan", None).exit_code(), exit_code::UNAVAILABLE);
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err: CliError = ConfigError::Validation {
            field: "host".into(),
            reason: "empty".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
