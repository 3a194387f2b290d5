// ── Device state model ──
//
// Every section decodes strictly and merges only the keys present in the
// payload. `DeviceSnapshot` ties the four sections together.

mod decode;
pub mod info;
pub mod light;
pub mod snapshot;
pub mod system;
pub mod wifi;

pub use info::Info;
pub use light::{Effect, Light, Rgb};
pub use snapshot::{DeviceSnapshot, Section};
pub use system::System;
pub use wifi::WiFi;
