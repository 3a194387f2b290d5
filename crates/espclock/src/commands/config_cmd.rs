//! Config subcommand handlers.

use espclock_config::{self as config, ConfigError, DeviceProfile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let toml_str = toml::to_string_pretty(&cfg).map_err(ConfigError::from)?;
            let out = output::render_single(global.format(), &cfg, |_| {
                toml_str.trim_end().to_owned()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetHost {
            host,
            name,
            default,
        } => {
            let mut cfg = config::load_config()?;
            let name = name
                .or_else(|| global.device.clone())
                .unwrap_or_else(|| "default".into());

            // Reject hosts the device layer would refuse later.
            config::profile_to_device_config(&DeviceProfile::new(host.as_str()), &cfg.defaults)?;

            cfg.set_device_host(&name, host.trim());
            if default {
                cfg.default_device = Some(name.clone());
            }

            let path = config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Saved device '{name}' ({}) to {}", host.trim(), path.display());
            }
            Ok(())
        }
    }
}
