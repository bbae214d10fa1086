//! Error taxonomy for the JNAP client and the device session
//!
//! Transport failures (router unreachable, timeout) are kept apart from
//! protocol failures (bad status, malformed body) so the session can tell an
//! offline router from a misbehaving one. A non-"OK" JNAP result is not an
//! error at this level; see [`SessionError::AuthRejected`].

use reqwest::StatusCode;
use thiserror::Error;

use crate::accessory::RegistrationError;

/// Configuration problems detected before any network activity
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("router password is not configured")]
    MissingPassword,

    #[error("router address `{url}` is not a valid URL: {reason}")]
    InvalidRouterUrl { url: String, reason: String },

    #[error("failed to load configuration")]
    Load(#[from] ::config::ConfigError),
}

/// Failure of a single JNAP action call
#[derive(Debug, Error)]
pub enum JnapError {
    /// Connection, DNS or timeout failure while talking to the router
    #[error("router unreachable at {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request could not be built, e.g. the router URL is unusable
    #[error("cannot build request for {url}")]
    InvalidRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The router answered, but not with usable JNAP data
    #[error("invalid response to `{action}`")]
    Protocol {
        action: String,
        #[source]
        source: ProtocolError,
    },
}

impl JnapError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }
}

/// Details about why a router response could not be used
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("body is not a JNAP response")]
    Malformed(#[from] serde_json::Error),

    #[error("unexpected result `{0}`")]
    UnexpectedResult(String),

    #[error("response carries no output")]
    MissingOutput,

    #[error("output does not match the expected shape")]
    InvalidOutput(#[source] serde_json::Error),
}

/// Reasons a device session stopped before completing
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Jnap(#[from] JnapError),

    /// The password check came back with a non-"OK" result
    #[error("router rejected the admin password ({result})")]
    AuthRejected { result: String },

    #[error("failed to register accessory")]
    Registration(#[from] RegistrationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_rejected_message_names_result() {
        let err = SessionError::AuthRejected {
            result: "_ErrorInvalidAdminPassword".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "router rejected the admin password (_ErrorInvalidAdminPassword)"
        );
    }

    #[test]
    fn test_protocol_error_classification() {
        let err = JnapError::Protocol {
            action: "core/GetDeviceInfo".to_string(),
            source: ProtocolError::MissingOutput,
        };
        assert!(err.is_protocol());
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "invalid response to `core/GetDeviceInfo`");
    }
}
