//! Data models for JNAP responses and the router facts derived from them

use serde::Deserialize;
use serde_json::{Map, Value};

/// Result token the router sends for a successful action
pub const RESULT_OK: &str = "OK";

/// Decoded body of a JNAP action call
#[derive(Debug, Clone, Deserialize)]
pub struct JnapResponse {
    /// Status token, `"OK"` on success
    pub result: String,

    /// Action-specific payload, present on success for informational actions
    #[serde(default)]
    pub output: Option<Map<String, Value>>,
}

impl JnapResponse {
    pub fn is_ok(&self) -> bool {
        self.result == RESULT_OK
    }
}

/// Identity facts reported by `core/GetDeviceInfo`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub manufacturer: String,
    pub model_number: String,
    pub serial_number: String,
    pub firmware_version: String,
}

/// LAN facts reported by `router/GetLANSettings`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanSettings {
    /// Router host name, used as the accessory display name
    pub host_name: String,
}
