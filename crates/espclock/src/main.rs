mod cli;
mod commands;
mod error;
mod output;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use espclock_config::{Config, ConfigError, DeviceProfile};
use espclock_core::{Device, DeviceConfig};

use crate::cli::{Cli, Command, GlobalOpts, OutputFormat};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(mut cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands work without a reachable (or even configured) device
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        cmd => {
            let cfg = espclock_config::load_config()?;
            if cli.global.output.is_none() {
                cli.global.output = Some(configured_output(&cfg)?);
            }

            let device = Device::new(build_device_config(&cfg, &cli.global)?)?;

            tracing::debug!(command = ?cmd, host = %device.config().host, "dispatching command");
            commands::dispatch(cmd, &device, &cli.global).await
        }
    }
}

fn configured_output(cfg: &Config) -> Result<OutputFormat, CliError> {
    OutputFormat::from_str(&cfg.defaults.output, true).map_err(|reason| CliError::Validation {
        field: "defaults.output".into(),
        reason,
    })
}

/// Build a `DeviceConfig` from the config file, profile, and CLI overrides.
fn build_device_config(cfg: &Config, global: &GlobalOpts) -> Result<DeviceConfig, CliError> {
    let mut profile = match (global.host.as_deref(), cfg.device(global.device.as_deref())) {
        (_, Ok((_, profile))) => profile.clone(),

        // No profile at all -- a bare --host is enough
        (Some(host), Err(ConfigError::NoDevice)) => DeviceProfile::new(host),
        (None, Err(ConfigError::NoDevice)) => {
            return Err(CliError::NoDevice {
                path: espclock_config::config_path().display().to_string(),
            });
        }

        (_, Err(ConfigError::UnknownDevice { name })) => {
            let available = if cfg.devices.is_empty() {
                "(none)".to_owned()
            } else {
                cfg.devices.keys().cloned().collect::<Vec<_>>().join(", ")
            };
            return Err(CliError::DeviceNotFound { name, available });
        }
        (_, Err(other)) => return Err(other.into()),
    };

    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }

    Ok(espclock_config::profile_to_device_config(
        &profile,
        &cfg.defaults,
    )?)
}
