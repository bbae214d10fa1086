//! Configuration management
//!
//! Settings come from a TOML file layered under `LINKSYS_*` environment
//! variables (`LINKSYS_ROUTER__PASSWORD`, `LINKSYS_HTTP__TIMEOUT`, ...).
//! Only the router password is required.

use ::config::{Environment, File, FileFormat};
use reqwest::Url;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::jnap::Endpoint;

const ENV_PREFIX: &str = "LINKSYS";

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Router address and credentials
    #[serde(default)]
    pub router: RouterConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Device session settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Clone)]
pub struct RouterConfig {
    /// Router base URL
    #[serde(default = "default_router_ip")]
    pub router_ip: String,

    /// Administrative password
    #[serde(default)]
    pub password: Option<String>,

    /// Keep going after the router rejects the password
    #[serde(default)]
    pub continue_on_auth_failure: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            router_ip: default_router_ip(),
            password: None,
            continue_on_auth_failure: false,
        }
    }
}

impl fmt::Debug for RouterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterConfig")
            .field("router_ip", &self.router_ip)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("continue_on_auth_failure", &self.continue_on_auth_failure)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Extra attempts per action after a transport failure
    #[serde(default)]
    pub max_retries: u32,

    /// Seconds between sessions in daemon mode
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            check_interval: default_check_interval(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_router_ip() -> String {
    "http://192.168.1.1".to_string()
}

fn default_timeout() -> u64 {
    5
}

fn default_connect_timeout() -> u64 {
    3
}

fn default_check_interval() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from `path`, or from the first config file found
    ///
    /// Environment variables override file values. A missing file is not an
    /// error unless `path` was given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
            None => match Self::search_paths().into_iter().find(|p| p.exists()) {
                Some(found) => {
                    tracing::debug!("Loading config from: {}", found.display());
                    builder = builder.add_source(File::from(found).format(FileFormat::Toml));
                }
                None => tracing::debug!("No config file found, using defaults"),
            },
        }

        let cfg = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(cfg.try_deserialize()?)
    }

    /// Parse configuration from TOML text alone
    #[cfg(test)]
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let cfg = ::config::Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()?;
        Ok(cfg.try_deserialize()?)
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("config.toml"),
            PathBuf::from("/etc/linksys-jnap/config.toml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("linksys-jnap/config.toml"));
        }
        paths
    }

    /// Build the router endpoint
    ///
    /// Fails if no password is configured or the router address does not
    /// form a valid URL.
    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        let password = self
            .router
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingPassword)?;

        let endpoint = Endpoint::new(&self.router.router_ip, password);
        Url::parse(&endpoint.jnap_url()).map_err(|e| ConfigError::InvalidRouterUrl {
            url: self.router.router_ip.clone(),
            reason: e.to_string(),
        })?;
        Ok(endpoint)
    }
}
