// ── WiFi station settings ──

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::decode;
use crate::error::SchemaError;

/// Network the clock joins. The password is never serialized back out.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WiFi {
    pub ssid: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl WiFi {
    /// Merge the keys present in `value` into `self`.
    pub fn apply(&mut self, value: &Value, path: &str) -> Result<(), SchemaError> {
        let obj = decode::object(value, path)?;
        decode::merge_string(&mut self.ssid, obj, "ssid", path)?;
        decode::merge_string(&mut self.password, obj, "password", path)?;
        Ok(())
    }
}

impl fmt::Debug for WiFi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WiFi")
            .field("ssid", &self.ssid)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn password_is_redacted() {
        let wifi = WiFi {
            ssid: "home".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{wifi:?}").contains("hunter2"));
        assert_eq!(serde_json::to_value(&wifi).unwrap(), json!({ "ssid": "home" }));
    }

    #[test]
    fn merges_present_keys_only() {
        let mut wifi = WiFi {
            ssid: "home".into(),
            password: "old".into(),
        };
        wifi.apply(&json!({ "password": "new" }), "wifi").unwrap();
        assert_eq!(wifi.ssid, "home");
        assert_eq!(wifi.password, "new");
        assert!(wifi.apply(&json!({ "ssid": 42 }), "wifi").is_err());
    }
}
