// ── Device identity ──

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::decode;
use crate::error::SchemaError;

/// Name and firmware version reported by the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    pub name: String,
    pub version: String,
}

impl Info {
    /// Merge the keys present in `value` into `self`.
    pub fn apply(&mut self, value: &Value, path: &str) -> Result<(), SchemaError> {
        let obj = decode::object(value, path)?;
        decode::merge_string(&mut self.name, obj, "name", path)?;
        decode::merge_string(&mut self.version, obj, "version", path)?;
        Ok(())
    }
}
