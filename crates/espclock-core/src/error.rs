// ── Core error types ──
//
// `SchemaError` is what the state model raises for a payload of the wrong
// shape. `CoreError` is the consumer-facing summary of the last failure:
// the facade never returns errors from `fetch`/`update`, but it remembers
// why the device went unavailable so a CLI can say so.

use thiserror::Error;

/// A JSON payload that is well-formed but does not match the device schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("`{path}`: expected {expected}, found {found}")]
    WrongType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("`{path}`: expected 3 colour channels, found {len}")]
    ChannelCount { path: String, len: usize },

    #[error("`{path}`: unknown effect `{name}`")]
    UnknownEffect { path: String, name: String },
}

impl SchemaError {
    /// JSON path of the offending value (`"light.color"`, `"<root>"`, ...).
    pub fn path(&self) -> &str {
        match self {
            Self::WrongType { path, .. }
            | Self::ChannelCount { path, .. }
            | Self::UnknownEffect { path, .. } => path,
        }
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach device at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Device request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Device answered HTTP {status} for {url}")]
    Rejected { status: u16, url: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device sent malformed data: {message}")]
    Protocol { message: String },

    #[error("Device state does not match schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("Device reported an error on its event stream")]
    DeviceReported,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<espclock_api::Error> for CoreError {
    fn from(err: espclock_api::Error) -> Self {
        use espclock_api::Error as ApiError;

        match err {
            ApiError::Transport(ref e) => CoreError::ConnectionFailed {
                url: e
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string),
                reason: e.to_string(),
            },
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid device URL: {e}"),
            },
            ApiError::Timeout { timeout_secs, .. } | ApiError::IdleTimeout { timeout_secs } => {
                CoreError::Timeout { timeout_secs }
            }
            ApiError::Status { status, url } => CoreError::Rejected { status, url },
            ApiError::Stream(e) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("event stream read failed: {e}"),
            },
            ApiError::Deserialization { message, body: _ } => CoreError::Protocol {
                message: format!("invalid JSON: {message}"),
            },
            ApiError::EventFormat { message } => CoreError::Protocol {
                message: format!("malformed event: {message}"),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_reports_path() {
        let err = SchemaError::WrongType {
            path: "light.brightness".into(),
            expected: "an integer",
            found: "a string",
        };
        assert_eq!(err.path(), "light.brightness");
        assert_eq!(
            err.to_string(),
            "`light.brightness`: expected an integer, found a string"
        );
    }

    #[test]
    fn api_errors_map_to_core_errors() {
        let status: CoreError = espclock_api::Error::Status {
            status: 404,
            url: "http://clock/api/nope".into(),
        }
        .into();
        assert_eq!(
            status,
            CoreError::Rejected {
                status: 404,
                url: "http://clock/api/nope".into()
            }
        );

        let idle: CoreError = espclock_api::Error::IdleTimeout { timeout_secs: 30 }.into();
        assert_eq!(idle, CoreError::Timeout { timeout_secs: 30 });

        let framing: CoreError = espclock_api::Error::EventFormat {
            message: "unknown field `foo`".into(),
        }
        .into();
        assert!(matches!(framing, CoreError::Protocol { .. }));
    }
}
