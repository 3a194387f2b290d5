use thiserror::Error;

/// Top-level error type for the `espclock-api` crate.
///
/// Covers every failure mode of the device API: transport, HTTP status,
/// response decoding, and event stream framing. `espclock-core` never lets
/// these escape to consumers; they are logged and demote the device to
/// unavailable.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, reset, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL construction failed (bad host or method name).
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request (or stream handshake) timed out.
    #[error("Request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The event stream went quiet mid-stream. Not a failure: the device
    /// may simply have nothing to say.
    #[error("No event stream data for {timeout_secs}s")]
    IdleTimeout { timeout_secs: u64 },

    /// Non-2xx response from the device.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Reading lines from the event stream body failed.
    #[error("Event stream read failed: {0}")]
    Stream(#[from] tokio_util::codec::LinesCodecError),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON decoding failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Malformed SSE framing (unknown field, duplicate id/event, missing data).
    #[error("Malformed event: {message}")]
    EventFormat { message: String },
}

impl Error {
    /// Returns `true` for the benign "stream went quiet" timeout.
    pub fn is_idle_timeout(&self) -> bool {
        matches!(self, Self::IdleTimeout { .. })
    }

    /// Short, stable name of the error kind, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(e) if e.is_connect() => "connect",
            Self::Transport(_) => "transport",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Timeout { .. } => "timeout",
            Self::IdleTimeout { .. } => "idle_timeout",
            Self::Status { .. } => "status",
            Self::Stream(_) => "stream",
            Self::Deserialization { .. } => "deserialization",
            Self::EventFormat { .. } => "event_format",
        }
    }

    pub(crate) fn event_format(message: impl Into<String>) -> Self {
        Self::EventFormat {
            message: message.into(),
        }
    }
}
