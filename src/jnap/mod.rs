//! JNAP client
//!
//! JNAP is the JSON-over-HTTP management protocol spoken by Linksys routers.
//! Every call is a POST to `<base>/JNAP/`; the action to run travels in the
//! `X-JNAP-Action` header rather than in the URL.

pub mod client;
pub mod endpoint;

#[cfg(test)]
pub(crate) mod testing;

pub use client::JnapClient;
pub use endpoint::Endpoint;

/// Prefix every action identifier is qualified with on the wire
pub const ACTION_NAMESPACE: &str = "http://linksys.com/jnap/";

/// Actions used by the device session
pub mod action {
    pub const CHECK_ADMIN_PASSWORD: &str = "core/CheckAdminPassword";
    pub const GET_DEVICE_INFO: &str = "core/GetDeviceInfo";
    pub const GET_LAN_SETTINGS: &str = "router/GetLANSettings";
}
