// espclock-core: Device state, event supervision, and the client facade consumers talk to.

pub mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod model;
pub mod supervisor;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::LightRequest;
pub use config::DeviceConfig;
pub use device::{Device, Subscriber};
pub use error::{CoreError, SchemaError};
pub use supervisor::{EventSource, Supervisor, SupervisorHandle, SupervisorState};

// Re-export model types at the crate root for ergonomics.
pub use model::{DeviceSnapshot, Effect, Info, Light, Rgb, Section, System, WiFi};
