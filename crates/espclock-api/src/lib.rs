// espclock-api: Async Rust client for the ESPWSClock HTTP API and SSE event stream

pub mod client;
pub mod error;
pub mod sse;
pub mod transport;

pub use client::{DeviceClient, EventStream, LineStream};
pub use error::Error;
pub use sse::{Event, EventParser};
pub use transport::TransportConfig;
