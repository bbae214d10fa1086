//! Helpers for URL normalization and accessory identifiers

use uuid::Uuid;

/// Normalize a router address into a base URL ending in exactly one `/`
///
/// A bare host such as `192.168.1.1` is given an `http://` scheme.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        format!("{}/", trimmed)
    } else {
        format!("http://{}/", trimmed)
    }
}

/// Derive the stable accessory identifier for a router serial number
///
/// The same serial always yields the same UUID, across runs and hosts.
pub fn accessory_uuid(serial_number: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, serial_number.as_bytes())
}
