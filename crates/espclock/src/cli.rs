//! Clap derive structures for the `espclock` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

use espclock_core::{Effect, Rgb};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// espclock -- control an ESPWSClock from the command line
#[derive(Debug, Parser)]
#[command(
    name = "espclock",
    version,
    about = "Control ESPWSClock smart clocks from the command line",
    long_about = "Reads and changes the state of an ESPWSClock over its local HTTP API,\n\
        and follows its event stream for live updates.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Device profile to use
    #[arg(long, short = 'd', env = "ESPCLOCK_DEVICE", global = true)]
    pub device: Option<String>,

    /// Device host or host:port (overrides the profile)
    #[arg(long, short = 'H', env = "ESPCLOCK_HOST", global = true)]
    pub host: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "ESPCLOCK_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

impl GlobalOpts {
    /// Selected output format; `main` fills it from the config when unset.
    pub fn format(&self) -> OutputFormat {
        self.output.unwrap_or(OutputFormat::Table)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the full device state
    #[command(alias = "st")]
    Status,

    /// Control the light
    #[command(alias = "l")]
    Light(LightArgs),

    /// Follow the event stream and print every change (Ctrl-C to stop)
    Watch,

    /// Inspect or edit the configuration file
    Config(ConfigArgs),
}

// ── Light ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LightArgs {
    #[command(subcommand)]
    pub command: LightCommand,
}

#[derive(Debug, Subcommand)]
pub enum LightCommand {
    /// Turn the light on, optionally changing brightness, colour or effect
    On(LightOnArgs),
    /// Turn the light off
    Off,
}

#[derive(Debug, Args)]
pub struct LightOnArgs {
    /// Brightness (0-255)
    #[arg(long, short = 'b', value_parser = clap::value_parser!(i64).range(0..=255))]
    pub brightness: Option<i64>,

    /// Colour as R,G,B
    #[arg(long, short = 'c', value_name = "R,G,B")]
    pub color: Option<Rgb>,

    /// Effect name
    #[arg(long, short = 'e')]
    pub effect: Option<Effect>,

    /// First effect colour as R,G,B
    #[arg(long = "fx1", value_name = "R,G,B")]
    pub effect_color_1: Option<Rgb>,

    /// Second effect colour as R,G,B
    #[arg(long = "fx2", value_name = "R,G,B")]
    pub effect_color_2: Option<Rgb>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Print the effective configuration as TOML
    Show,

    /// Add a device profile or change its host
    SetHost {
        /// Host or host:port of the clock
        host: String,

        /// Profile name [default: --device, else "default"]
        #[arg(long)]
        name: Option<String>,

        /// Also make this the default device
        #[arg(long)]
        default: bool,
    },
}
