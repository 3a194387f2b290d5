// ── Light domain types ──

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::decode::{self, Object};
use crate::error::SchemaError;

// ── Rgb ──────────────────────────────────────────────────────────────

/// An RGB colour. On the wire it is a three-element integer array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i64; 3]", into = "[i64; 3]")]
pub struct Rgb {
    pub red: i64,
    pub green: i64,
    pub blue: i64,
}

impl Rgb {
    pub const fn new(red: i64, green: i64, blue: i64) -> Self {
        Self { red, green, blue }
    }

    /// Strictly decode `[r, g, b]`.
    pub fn decode(value: &Value, path: &str) -> Result<Self, SchemaError> {
        let items = value
            .as_array()
            .ok_or_else(|| decode::wrong_type(path, "an array of 3 integers", value))?;

        let [red, green, blue] = items.as_slice() else {
            return Err(SchemaError::ChannelCount {
                path: path.to_owned(),
                len: items.len(),
            });
        };

        Ok(Self {
            red: decode::integer(red, &format!("{path}[0]"))?,
            green: decode::integer(green, &format!("{path}[1]"))?,
            blue: decode::integer(blue, &format!("{path}[2]"))?,
        })
    }
}

impl From<[i64; 3]> for Rgb {
    fn from([red, green, blue]: [i64; 3]) -> Self {
        Self { red, green, blue }
    }
}

impl From<Rgb> for [i64; 3] {
    fn from(rgb: Rgb) -> Self {
        [rgb.red, rgb.green, rgb.blue]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.red, self.green, self.blue)
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Parse `"r,g,b"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let channels = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<i64>()
                    .map_err(|e| format!("invalid colour channel `{}`: {e}", part.trim()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        match channels.as_slice() {
            &[red, green, blue] => Ok(Self { red, green, blue }),
            other => Err(format!("expected 3 colour channels, got {}", other.len())),
        }
    }
}

// ── Effect ───────────────────────────────────────────────────────────

/// Light effect reported by the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    #[default]
    None,
}

/// Name table: upper-case wire name, display label, variant.
const EFFECTS: &[(&str, &str, Effect)] = &[("NONE", "None", Effect::None)];

impl Effect {
    /// Every effect the device can report, in table order.
    pub fn all() -> impl Iterator<Item = Self> {
        EFFECTS.iter().map(|&(_, _, effect)| effect)
    }

    /// Look up an effect by wire name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_uppercase();
        EFFECTS
            .iter()
            .find(|(wire, _, _)| *wire == upper)
            .map(|&(_, _, effect)| effect)
    }

    /// Upper-case canonical name (`"NONE"`).
    pub fn name(self) -> &'static str {
        self.entry().0
    }

    /// Display label (`"None"`).
    pub fn label(self) -> &'static str {
        self.entry().1
    }

    /// Value the device expects in a request body (`"none"`).
    pub fn wire_name(self) -> String {
        self.name().to_lowercase()
    }

    fn entry(self) -> (&'static str, &'static str) {
        EFFECTS
            .iter()
            .find(|&&(_, _, effect)| effect == self)
            .map_or(("NONE", "None"), |&(wire, label, _)| (wire, label))
    }

    fn decode(value: &Value, path: &str) -> Result<Self, SchemaError> {
        let name = value
            .as_str()
            .ok_or_else(|| decode::wrong_type(path, "a string", value))?;
        Self::from_name(name).ok_or_else(|| SchemaError::UnknownEffect {
            path: path.to_owned(),
            name: name.to_owned(),
        })
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Effect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| {
            let known: Vec<&str> = Self::all().map(Effect::label).collect();
            format!("unknown effect `{s}` (known: {})", known.join(", "))
        })
    }
}

// ── Light ────────────────────────────────────────────────────────────

/// The clock's RGB light.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Light {
    #[serde(rename = "state")]
    pub on: bool,
    pub brightness: i64,
    pub color: Rgb,
    pub effect: Effect,
    /// Primary colour used by effects.
    pub effect_color_1: Rgb,
    /// Secondary colour used by effects.
    pub effect_color_2: Rgb,
}

impl Light {
    /// Merge the keys present in `value` into `self`.
    pub fn apply(&mut self, value: &Value, path: &str) -> Result<(), SchemaError> {
        let obj = decode::object(value, path)?;
        self.apply_object(obj, path)
    }

    fn apply_object(&mut self, obj: &Object, path: &str) -> Result<(), SchemaError> {
        if let Some(on) = decode::bool_field(obj, "state", path)? {
            self.on = on;
        }
        if let Some(brightness) = decode::int_field(obj, "brightness", path)? {
            self.brightness = brightness;
        }
        for (key, slot) in [
            ("color", &mut self.color),
            ("effect_color_1", &mut self.effect_color_1),
            ("effect_color_2", &mut self.effect_color_2),
        ] {
            if let Some(value) = obj.get(key) {
                *slot = Rgb::decode(value, &decode::join(path, key))?;
            }
        }
        if let Some(value) = obj.get("effect") {
            self.effect = Effect::decode(value, &decode::join(path, "effect"))?;
        }
        Ok(())
    }
}
