//! `espclock light on|off`

use tracing::debug;

use espclock_core::{Device, LightRequest};

use crate::cli::{GlobalOpts, LightArgs, LightCommand, LightOnArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(device: &Device, args: LightArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let request = match args.command {
        LightCommand::On(on) => turn_on(&on),
        LightCommand::Off => LightRequest::turn_off(),
    };

    debug!(payload = %request.to_payload(), "sending light command");
    device.set_light(&request).await;

    let snapshot = super::require_snapshot(device)?;
    let color = output::should_color();
    let out = output::render_single(global.format(), &snapshot.light, |light| {
        output::light_detail(light, color)
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn turn_on(args: &LightOnArgs) -> LightRequest {
    let mut request = LightRequest::turn_on();
    if let Some(brightness) = args.brightness {
        request = request.brightness(brightness);
    }
    if let Some(color) = args.color {
        request = request.color(color);
    }
    if let Some(effect) = args.effect {
        request = request.effect(effect);
    }
    request.effect_colors(args.effect_color_1, args.effect_color_2)
}
