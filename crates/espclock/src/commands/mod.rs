//! Command dispatch: bridges CLI args -> device facade -> output formatting.

pub mod config_cmd;
pub mod light;
pub mod status;
pub mod watch;

use espclock_core::{Device, DeviceSnapshot};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, device: &Device, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(device, global).await,
        Command::Light(args) => light::handle(device, args, global).await,
        Command::Watch => watch::handle(device, global).await,
        // Config is handled before dispatch
        Command::Config(_) => unreachable!(),
    }
}

/// The current snapshot, or an error explaining why there is none.
fn require_snapshot(device: &Device) -> Result<DeviceSnapshot, CliError> {
    device
        .snapshot()
        .ok_or_else(|| CliError::unavailable(&device.config().host, device.last_error()))
}
