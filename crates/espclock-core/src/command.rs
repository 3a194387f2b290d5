// ── Light command builder ──
//
// Builds the body for `POST /api/light`. Only the fields that were set are
// sent, so the device leaves everything else alone.

use serde::Serialize;
use serde_json::Value;

use crate::model::{Effect, Rgb, Section};

/// A partial light update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LightRequest {
    #[serde(rename = "state")]
    pub on: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<Effect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect_color_1: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect_color_2: Option<Rgb>,
}

impl LightRequest {
    pub fn turn_on() -> Self {
        Self {
            on: true,
            ..Self::default()
        }
    }

    pub fn turn_off() -> Self {
        Self::default()
    }

    pub fn brightness(mut self, brightness: i64) -> Self {
        self.brightness = Some(brightness);
        self
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    pub fn effect(mut self, effect: Effect) -> Self {
        self.effect = Some(effect);
        self
    }

    pub fn effect_colors(mut self, first: Option<Rgb>, second: Option<Rgb>) -> Self {
        self.effect_color_1 = first.or(self.effect_color_1);
        self.effect_color_2 = second.or(self.effect_color_2);
        self
    }

    /// API method this request is sent to.
    pub fn method(&self) -> &'static str {
        Section::Light.into()
    }

    /// JSON body for [`Self::method`].
    pub fn to_payload(&self) -> Value {
        // Only derived impls over plain fields; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
