//! Device session: validate credentials, learn the router's identity and
//! hand it to the accessory host
//!
//! The four JNAP calls run strictly in order. A rejected password halts the
//! session unless `continue_on_auth_failure` is set, which reproduces the
//! behaviour of older plugins that logged the failure and carried on.
//! Nothing is registered unless every fact was fetched.

use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

use crate::accessory::AccessoryHost;
use crate::config::Config;
use crate::error::{JnapError, ProtocolError, SessionError};
use crate::jnap::{action, JnapClient};
use crate::models::{DeviceInfo, JnapResponse, LanSettings};
use crate::parser;
use crate::utils::accessory_uuid;

/// Upper bound on the exponent of the transport retry backoff
const MAX_BACKOFF_SHIFT: u32 = 5;

/// How a completed session left the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A new accessory was registered
    Registered { identifier: Uuid, display_name: String },
    /// The host already knew this router
    AlreadyRegistered { identifier: Uuid },
}

impl SessionOutcome {
    pub fn identifier(&self) -> Uuid {
        match self {
            Self::Registered { identifier, .. } | Self::AlreadyRegistered { identifier } => *identifier,
        }
    }
}

/// One "learn about this router" sequence
pub struct DeviceSession<'a> {
    client: &'a JnapClient,
    max_retries: u32,
    continue_on_auth_failure: bool,
}

impl<'a> DeviceSession<'a> {
    pub fn new(client: &'a JnapClient) -> Self {
        Self {
            client,
            max_retries: 0,
            continue_on_auth_failure: false,
        }
    }

    pub fn from_config(client: &'a JnapClient, cfg: &Config) -> Self {
        Self::new(client)
            .max_retries(cfg.session.max_retries)
            .continue_on_auth_failure(cfg.router.continue_on_auth_failure)
    }

    /// Retry each action up to `max_retries` more times on transport failure
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn continue_on_auth_failure(mut self, enabled: bool) -> Self {
        self.continue_on_auth_failure = enabled;
        self
    }

    /// Run the session, logging any failure instead of returning it
    pub async fn run_logged<H: AccessoryHost + ?Sized>(&self, host: &mut H) -> Option<SessionOutcome> {
        match self.run(host).await {
            Ok(outcome) => Some(outcome),
            Err(SessionError::AuthRejected { result }) => {
                tracing::error!("Password to router is incorrect ({})", result);
                None
            }
            Err(e) => {
                tracing::error!("Router session failed: {:#}", anyhow::Error::from(e));
                None
            }
        }
    }

    pub async fn run<H: AccessoryHost + ?Sized>(&self, host: &mut H) -> Result<SessionOutcome, SessionError> {
        let base = self.client.endpoint().base_url();

        tracing::info!("[{}] Step 1: Checking admin password...", base);
        let check = self.invoke(action::CHECK_ADMIN_PASSWORD, true).await?;
        if !check.is_ok() {
            if !self.continue_on_auth_failure {
                return Err(SessionError::AuthRejected {
                    result: check.result,
                });
            }
            tracing::error!(
                "Password to router is incorrect ({}), continuing anyway",
                check.result
            );
        }

        tracing::info!("[{}] Step 2: Fetching device info...", base);
        let info: DeviceInfo = self.fetch(action::GET_DEVICE_INFO).await?;
        tracing::info!(
            "   -> {} {} (firmware {})",
            info.manufacturer,
            info.model_number,
            info.firmware_version
        );

        tracing::info!("[{}] Step 3: Fetching LAN settings...", base);
        let lan: LanSettings = self.fetch(action::GET_LAN_SETTINGS).await?;
        tracing::info!("   -> Host name: {}", lan.host_name);

        let identifier = accessory_uuid(&info.serial_number);
        if host.find_existing_accessory(identifier).await {
            tracing::info!("Accessory {} ({}) already registered", lan.host_name, identifier);
            return Ok(SessionOutcome::AlreadyRegistered { identifier });
        }

        host.register_accessory(identifier, &lan.host_name, &info).await?;
        Ok(SessionOutcome::Registered {
            identifier,
            display_name: lan.host_name,
        })
    }

    /// Invoke an informational action and extract its output
    async fn fetch<T: DeserializeOwned>(&self, action: &str) -> Result<T, JnapError> {
        let resp = self.invoke(action, true).await?;
        if !resp.is_ok() {
            return Err(JnapError::Protocol {
                action: action.to_string(),
                source: ProtocolError::UnexpectedResult(resp.result),
            });
        }
        parser::parse_output(resp).map_err(|source| JnapError::Protocol {
            action: action.to_string(),
            source,
        })
    }

    /// Retry transport failures with exponential backoff
    async fn invoke(&self, action: &str, requires_auth: bool) -> Result<JnapResponse, JnapError> {
        let mut attempt = 0;
        loop {
            match self.client.invoke(action, requires_auth).await {
                Err(e) if e.is_transport() && attempt < self.max_retries => {
                    let delay = Duration::from_secs(1 << attempt.min(MAX_BACKOFF_SHIFT));
                    tracing::warn!(
                        "{}: {}, retrying in {:?}... (attempt {}/{})",
                        action,
                        e,
                        delay,
                        attempt + 1,
                        self.max_retries
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::{AccessoryRegistry, Characteristic, CharacteristicValue};
    use crate::jnap::testing::{capture_logs, client_for, expect_action, mock_action, unresponsive_router};
    use crate::jnap::Endpoint;
    use mockito::{Mock, Server, ServerGuard};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const DEVICE_INFO: &str = r#"{"result":"OK","output":{"serialNumber":"S1","manufacturer":"M","modelNumber":"X1","firmwareVersion":"1.0"}}"#;
    const LAN_SETTINGS: &str = r#"{"result":"OK","output":{"hostName":"MyRouter"}}"#;
    const BAD_PASSWORD: &str = r#"{"result":"_ErrorInvalidAdminPassword"}"#;

    async fn router(server: &mut ServerGuard, check: &str, hits: usize) -> (Mock, Mock, Mock) {
        (
            expect_action(server, action::CHECK_ADMIN_PASSWORD, check, hits).await,
            expect_action(server, action::GET_DEVICE_INFO, DEVICE_INFO, hits).await,
            expect_action(server, action::GET_LAN_SETTINGS, LAN_SETTINGS, hits).await,
        )
    }

    #[tokio::test]
    async fn test_registers_router_accessory() {
        let mut server = Server::new_async().await;
        let (check, info, lan) = router(&mut server, r#"{"result":"OK"}"#, 1).await;
        let client = client_for(&server.url(), "pw");
        let mut registry = AccessoryRegistry::new();

        let outcome = DeviceSession::new(&client).run(&mut registry).await.unwrap();

        let identifier = accessory_uuid("S1");
        assert_eq!(
            outcome,
            SessionOutcome::Registered {
                identifier,
                display_name: "MyRouter".to_string()
            }
        );
        assert_eq!(registry.len(), 1);

        let accessory = registry.get(identifier).unwrap();
        assert_eq!(accessory.display_name(), "MyRouter");
        let text = |s: &str| Ok(CharacteristicValue::Text(s.to_string()));
        assert_eq!(accessory.get(Characteristic::Manufacturer), text("M"));
        assert_eq!(accessory.get(Characteristic::Model), text("X1"));
        assert_eq!(accessory.get(Characteristic::SerialNumber), text("S1"));
        assert_eq!(accessory.get(Characteristic::FirmwareRevision), text("1.0"));

        check.assert_async().await;
        info.assert_async().await;
        lan.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_password_halts_session() {
        let mut server = Server::new_async().await;
        let (check, info, lan) = (
            expect_action(&mut server, action::CHECK_ADMIN_PASSWORD, BAD_PASSWORD, 2).await,
            expect_action(&mut server, action::GET_DEVICE_INFO, DEVICE_INFO, 0).await,
            expect_action(&mut server, action::GET_LAN_SETTINGS, LAN_SETTINGS, 0).await,
        );
        let client = client_for(&server.url(), "wrong");
        let mut registry = AccessoryRegistry::new();

        let err = DeviceSession::new(&client).run(&mut registry).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::AuthRejected { ref result } if result == "_ErrorInvalidAdminPassword"
        ));
        assert!(registry.is_empty());

        let (guard, logs) = capture_logs();
        let session = DeviceSession::new(&client);
        assert!(session.run_logged(&mut registry).await.is_none());
        drop(guard);
        assert!(registry.is_empty());

        let logs = logs.contents();
        assert!(logs.contains("ERROR"), "no error logged: {logs}");
        assert!(
            logs.contains("Password to router is incorrect (_ErrorInvalidAdminPassword)"),
            "operator message missing: {logs}"
        );

        check.assert_async().await;
        info.assert_async().await;
        lan.assert_async().await;
    }

    #[tokio::test]
    async fn test_continue_on_auth_failure() {
        let mut server = Server::new_async().await;
        router(&mut server, BAD_PASSWORD, 1).await;
        let client = client_for(&server.url(), "wrong");
        let mut registry = AccessoryRegistry::new();

        let outcome = DeviceSession::new(&client)
            .continue_on_auth_failure(true)
            .run(&mut registry)
            .await
            .unwrap();

        assert!(matches!(outcome, SessionOutcome::Registered { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_unresponsive_router_aborts_session() {
        let (url, listener) = unresponsive_router().await;
        let client = JnapClient::with_timeouts(
            Endpoint::new(&url, "pw"),
            Duration::from_millis(200),
            Duration::from_millis(200),
        )
        .unwrap();
        let mut registry = AccessoryRegistry::new();

        let err = DeviceSession::new(&client).run(&mut registry).await.unwrap_err();
        assert!(matches!(err, SessionError::Jnap(ref e) if e.is_transport()));
        assert!(registry.is_empty());

        listener.abort();
    }

    #[tokio::test]
    async fn test_second_session_is_idempotent() {
        let mut server = Server::new_async().await;
        let (check, info, lan) = router(&mut server, r#"{"result":"OK"}"#, 2).await;
        let client = client_for(&server.url(), "pw");
        let mut registry = AccessoryRegistry::new();
        let session = DeviceSession::new(&client);

        let first = session.run(&mut registry).await.unwrap();
        let second = session.run(&mut registry).await.unwrap();

        assert!(matches!(first, SessionOutcome::Registered { .. }));
        assert_eq!(
            second,
            SessionOutcome::AlreadyRegistered {
                identifier: accessory_uuid("S1")
            }
        );
        assert_eq!(first.identifier(), second.identifier());
        assert_eq!(registry.len(), 1);

        check.assert_async().await;
        info.assert_async().await;
        lan.assert_async().await;
    }

    #[tokio::test]
    async fn test_incomplete_device_info_aborts_session() {
        let mut server = Server::new_async().await;
        mock_action(&mut server, action::CHECK_ADMIN_PASSWORD, r#"{"result":"OK"}"#).await;
        mock_action(
            &mut server,
            action::GET_DEVICE_INFO,
            r#"{"result":"OK","output":{"serialNumber":"S1"}}"#,
        )
        .await;
        let lan = expect_action(&mut server, action::GET_LAN_SETTINGS, LAN_SETTINGS, 0).await;
        let client = client_for(&server.url(), "pw");
        let mut registry = AccessoryRegistry::new();

        let err = DeviceSession::new(&client).run(&mut registry).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Jnap(JnapError::Protocol {
                source: ProtocolError::InvalidOutput(_),
                ..
            })
        ));
        assert!(registry.is_empty());
        lan.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_ok_informational_result_aborts_session() {
        let mut server = Server::new_async().await;
        mock_action(&mut server, action::CHECK_ADMIN_PASSWORD, r#"{"result":"OK"}"#).await;
        mock_action(&mut server, action::GET_DEVICE_INFO, DEVICE_INFO).await;
        mock_action(&mut server, action::GET_LAN_SETTINGS, r#"{"result":"_ErrorUnauthorized"}"#).await;
        let client = client_for(&server.url(), "pw");
        let mut registry = AccessoryRegistry::new();

        let err = DeviceSession::new(&client).run(&mut registry).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Jnap(JnapError::Protocol {
                source: ProtocolError::UnexpectedResult(ref result),
                ..
            }) if result == "_ErrorUnauthorized"
        ));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_transport_retries_are_bounded() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let accepted = Arc::new(AtomicUsize::new(0));

        let counter = accepted.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                drop(stream);
            }
        });

        let client = client_for(&url, "pw");
        let mut registry = AccessoryRegistry::new();

        let err = DeviceSession::new(&client)
            .max_retries(1)
            .run(&mut registry)
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Jnap(ref e) if e.is_transport()));
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
        assert!(registry.is_empty());

        handle.abort();
    }
}
