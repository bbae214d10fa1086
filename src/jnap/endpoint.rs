//! Router endpoint: base URL plus administrative credentials

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;

use crate::utils::normalize_base_url;

/// Username JNAP expects for administrative calls
const ADMIN_USER: &str = "admin";

/// A manageable router: where it lives and how to authenticate
#[derive(Clone)]
pub struct Endpoint {
    base_url: String,
    password: String,
}

impl Endpoint {
    pub fn new(router_ip: &str, password: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(router_ip),
            password: password.into(),
        }
    }

    /// Base URL, always ending in a single `/`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL all JNAP actions are posted to
    pub fn jnap_url(&self) -> String {
        format!("{}JNAP/", self.base_url)
    }

    /// Value for the `X-JNAP-Authorization` header
    ///
    /// Derived from the password on each call; nothing is cached.
    pub fn authorization(&self) -> String {
        let credential = STANDARD.encode(format!("{}:{}", ADMIN_USER, self.password));
        format!("Basic {}", credential)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("base_url", &self.base_url)
            .field("password", &"<redacted>")
            .finish()
    }
}
