//! Output formatting: table or JSON.
//!
//! Renders data in the format selected by `--output`. Tables use `tabled`,
//! structured formats use serde.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use espclock_core::{DeviceSnapshot, Light, Rgb};

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Colour only on an interactive terminal, and never with `NO_COLOR` set.
pub fn should_color() -> bool {
    io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

fn on_off(on: bool, color: bool) -> String {
    match (on, color) {
        (true, true) => "on".green().bold().to_string(),
        (false, true) => "off".dimmed().to_string(),
        (true, false) => "on".into(),
        (false, false) => "off".into(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since detail views don't map to a
/// single `Tabled` row type.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Device views ─────────────────────────────────────────────────────

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Section")]
    section: &'static str,
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn row(section: &'static str, field: &'static str, value: impl ToString) -> FieldRow {
    FieldRow {
        section,
        field,
        value: value.to_string(),
    }
}

fn light_rows(light: &Light, color: bool) -> Vec<FieldRow> {
    vec![
        row("light", "state", on_off(light.on, color)),
        row("light", "brightness", light.brightness),
        row("light", "color", swatch(light.color, color)),
        row("light", "effect", light.effect),
        row("light", "effect_color_1", swatch(light.effect_color_1, color)),
        row("light", "effect_color_2", swatch(light.effect_color_2, color)),
    ]
}

/// `r,g,b`, with a block of that colour on a truecolor terminal.
fn swatch(rgb: Rgb, color: bool) -> String {
    if !color {
        return rgb.to_string();
    }
    let channel = |c: i64| u8::try_from(c.clamp(0, 255)).unwrap_or(u8::MAX);
    let block = "██".truecolor(channel(rgb.red), channel(rgb.green), channel(rgb.blue));
    format!("{block} {rgb}")
}

/// Key/value table of every section.
pub fn snapshot_detail(snapshot: &DeviceSnapshot, color: bool) -> String {
    let mut rows = light_rows(&snapshot.light, color);
    rows.extend([
        row("wifi", "ssid", &snapshot.wifi.ssid),
        row("system", "timezone", &snapshot.system.timezone),
        row("system", "sntp_server", &snapshot.system.sntp_server),
        row("info", "name", &snapshot.info.name),
        row("info", "version", &snapshot.info.version),
    ]);
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Key/value table of the light section only.
pub fn light_detail(light: &Light, color: bool) -> String {
    Table::new(light_rows(light, color))
        .with(Style::rounded())
        .to_string()
}

/// One-line summary used by `watch`.
pub fn summary_line(snapshot: Option<&DeviceSnapshot>, color: bool) -> String {
    match snapshot {
        None if color => "unavailable".red().to_string(),
        None => "unavailable".into(),
        Some(s) => format!(
            "{}  light={} brightness={} color={} effect={}",
            s.info.name,
            on_off(s.light.on, color),
            s.light.brightness,
            s.light.color,
            s.light.effect,
        ),
    }
}
