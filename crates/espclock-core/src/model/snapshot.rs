// ── Aggregate device snapshot ──

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use super::decode::{self, ROOT};
use super::{Info, Light, System, WiFi};
use crate::error::SchemaError;

/// Top-level sections of the device state, named as on the wire.
///
/// Each name doubles as an API method: `POST /api/light` takes and returns
/// the `light` section.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, IntoStaticStr, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum Section {
    Light,
    Wifi,
    System,
    Info,
}

/// Last fully validated state of the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub light: Light,
    pub wifi: WiFi,
    pub system: System,
    pub info: Info,
}

impl DeviceSnapshot {
    /// Decode a full-state payload (`{"light": {...}, "info": {...}}`).
    ///
    /// All-or-nothing: on error `self` is left exactly as it was.
    pub fn apply(&mut self, value: &Value) -> Result<(), SchemaError> {
        let obj = decode::object(value, ROOT)?;
        let mut next = self.clone();
        for section in Section::iter() {
            if let Some(part) = obj.get(section.as_ref()) {
                next.apply_to(section, part)?;
            }
        }
        *self = next;
        Ok(())
    }

    /// Decode the response or event payload for API method `method`.
    ///
    /// Payloads are full-state shaped (`{"light": {...}}`) and decode at the
    /// top level. When `method` names a section and the payload carries none
    /// of the section keys, it is taken as that section's body instead
    /// (`{"state": true}` for `light`).
    pub fn apply_section(&mut self, method: &str, value: &Value) -> Result<(), SchemaError> {
        match method.parse::<Section>() {
            Ok(section) if is_bare_section(value) => {
                let mut next = self.clone();
                next.apply_to(section, value)?;
                *self = next;
                Ok(())
            }
            _ => self.apply(value),
        }
    }

    fn apply_to(&mut self, section: Section, value: &Value) -> Result<(), SchemaError> {
        let path = section.as_ref();
        match section {
            Section::Light => self.light.apply(value, path),
            Section::Wifi => self.wifi.apply(value, path),
            Section::System => self.system.apply(value, path),
            Section::Info => self.info.apply(value, path),
        }
    }
}

/// A non-empty object with no top-level section key.
fn is_bare_section(value: &Value) -> bool {
    value.as_object().is_some_and(|obj| {
        !obj.is_empty() && Section::iter().all(|section| !obj.contains_key(section.as_ref()))
    })
}
