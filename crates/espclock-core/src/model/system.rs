// ── Clock system settings ──

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::decode;
use crate::error::SchemaError;

/// Time keeping configuration. Wire keys are `tz` and `sntp`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct System {
    #[serde(rename = "tz")]
    pub timezone: String,
    #[serde(rename = "sntp")]
    pub sntp_server: String,
}

impl System {
    /// Merge the keys present in `value` into `self`.
    pub fn apply(&mut self, value: &Value, path: &str) -> Result<(), SchemaError> {
        let obj = decode::object(value, path)?;
        decode::merge_string(&mut self.timezone, obj, "tz", path)?;
        decode::merge_string(&mut self.sntp_server, obj, "sntp", path)?;
        Ok(())
    }
}
