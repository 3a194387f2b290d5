//! `espclock status`

use espclock_core::Device;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(device: &Device, global: &GlobalOpts) -> Result<(), CliError> {
    device.fetch().await;
    let snapshot = super::require_snapshot(device)?;

    let color = output::should_color();
    let out = output::render_single(global.format(), &snapshot, |s| {
        output::snapshot_detail(s, color)
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
