// Device HTTP client
//
// Wraps `reqwest::Client` with the device's URL layout (`/api/{method}`),
// JSON request/response handling, and the long-lived `/api/events` stream.
// Every failure is classified into `crate::Error` before the caller sees it.

use std::io;
use std::pin::Pin;
use std::time::Duration;

use async_stream::try_stream;
use futures_util::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use serde_json::Value;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::io::StreamReader;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::sse::{self, Event};
use crate::transport::TransportConfig;

/// Method name of the event stream endpoint.
pub const EVENTS_METHOD: &str = "events";

/// Method name of the full-state endpoint.
pub const STATUS_METHOD: &str = "status";

/// Longest event stream line accepted. Longer lines fail the stream.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Raw body lines of the event stream, newline already stripped.
pub type LineStream = Pin<Box<dyn Stream<Item = Result<String, Error>> + Send>>;

/// Parsed events from the event stream.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Event, Error>> + Send>>;

/// HTTP client for a single ESPWSClock device.
///
/// Cheap to clone: the inner `reqwest::Client` is reference counted.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    base_url: Url,
    transport: TransportConfig,
}

impl DeviceClient {
    /// Create a client for `host` (`"192.168.1.50"` or `"clock.lan:8080"`).
    pub fn new(host: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let base_url = base_url_for(host)?;
        Ok(Self {
            http,
            base_url,
            transport: transport.clone(),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        host: &str,
        transport: TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = base_url_for(host)?;
        Ok(Self {
            http,
            base_url,
            transport,
        })
    }

    /// The device base URL (`http://{host}/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The timeout budget this client was built with.
    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `http://{host}/api/{method}`.
    pub(crate) fn api_url(&self, method: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("api/{method}"))?)
    }

    // ── Request/response ─────────────────────────────────────────────

    /// Call an API method: GET when `body` is `None`, POST with a JSON body
    /// otherwise. Returns the decoded JSON response on 2xx.
    pub async fn call(&self, method: &str, body: Option<&Value>) -> Result<Value, Error> {
        let url = self.api_url(method)?;
        let timeout = self.transport.request_timeout;

        let request = match body {
            None => {
                debug!("GET {}", url);
                self.http.get(url.clone())
            }
            Some(body) => {
                debug!("POST {}", url);
                self.http.post(url.clone()).json(body)
            }
        };

        let resp = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, &url, timeout))?;

        check_status(&resp, &url)?;

        let body = resp.text().await.map_err(|e| classify(e, &url, timeout))?;

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    /// Fetch the full device state (`GET /api/status`).
    pub async fn status(&self) -> Result<Value, Error> {
        self.call(STATUS_METHOD, None).await
    }

    // ── Event stream ─────────────────────────────────────────────────

    /// Open `GET /api/events` and return its body as a line stream.
    ///
    /// The response head must arrive within the read timeout and carry a
    /// 2xx status. After that, every line must arrive within the read
    /// timeout too; a stall surfaces as [`Error::IdleTimeout`].
    pub async fn open_event_stream(&self) -> Result<LineStream, Error> {
        let url = self.api_url(EVENTS_METHOD)?;
        let read_timeout = self.transport.read_timeout;

        debug!("GET {} (stream)", url);

        let send = self
            .http
            .get(url.clone())
            .header(ACCEPT, "text/event-stream")
            .send();

        let resp = match tokio::time::timeout(read_timeout, send).await {
            Ok(resp) => resp.map_err(|e| classify(e, &url, read_timeout))?,
            Err(_) => {
                return Err(Error::Timeout {
                    url: url.to_string(),
                    timeout_secs: read_timeout.as_secs(),
                });
            }
        };

        check_status(&resp, &url)?;

        Ok(Box::pin(body_lines(resp, read_timeout)))
    }

    /// Open the event stream and frame it into [`Event`]s.
    pub async fn events(&self) -> Result<EventStream, Error> {
        let lines = self.open_event_stream().await?;
        Ok(Box::pin(sse::events(lines)))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn base_url_for(host: &str) -> Result<Url, Error> {
    let host = host.trim().trim_end_matches('/');
    Ok(Url::parse(&format!("http://{host}/"))?)
}

fn check_status(resp: &reqwest::Response, url: &Url) -> Result<(), Error> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::Status {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}

/// Map reqwest timeouts onto [`Error::Timeout`]; everything else stays a
/// transport error.
fn classify(err: reqwest::Error, url: &Url, timeout: Duration) -> Error {
    if err.is_timeout() {
        Error::Timeout {
            url: url.to_string(),
            timeout_secs: timeout.as_secs(),
        }
    } else {
        Error::Transport(err)
    }
}

/// Split a streaming response body into lines. The stream is idle when no
/// body bytes arrive within `read_timeout`; a line may span many chunks.
fn body_lines(
    resp: reqwest::Response,
    read_timeout: Duration,
) -> impl Stream<Item = Result<String, Error>> + Send + 'static {
    let body = idle_guarded(resp.bytes_stream(), read_timeout);
    let codec = LinesCodec::new_with_max_length(MAX_LINE_LENGTH);
    let mut framed = Box::pin(FramedRead::new(StreamReader::new(body), codec));

    try_stream! {
        while let Some(line) = framed.next().await {
            yield line.map_err(|e| match e {
                LinesCodecError::Io(io) if io.kind() == io::ErrorKind::TimedOut => {
                    Error::IdleTimeout {
                        timeout_secs: read_timeout.as_secs(),
                    }
                }
                other => Error::Stream(other),
            })?;
        }
    }
}

/// Fail with [`io::ErrorKind::TimedOut`] when no chunk arrives within
/// `read_timeout`. Chunk errors become [`io::ErrorKind::Other`].
fn idle_guarded<S, B, E>(
    body: S,
    read_timeout: Duration,
) -> impl Stream<Item = io::Result<B>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: Send + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + Send + 'static,
{
    try_stream! {
        let mut body = Box::pin(body);
        loop {
            let next = tokio::time::timeout(read_timeout, body.next())
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "event stream idle"))?;
            match next {
                Some(chunk) => yield chunk.map_err(io::Error::other)?,
                None => break,
            }
        }
    }
}
