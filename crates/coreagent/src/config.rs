//! Configuration for the core agent client

use coreagent_protocol::{ByteOrder, Codec, VersionField, DEFAULT_SOCKET_PATH};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::client::AgentClient;
use crate::oneshot::OneShotClient;
use crate::reporter::Reporter;

pub const ENV_APP_NAME: &str = "SCOUT_NAME";
pub const ENV_KEY: &str = "SCOUT_KEY";
pub const ENV_SOCKET: &str = "SCOUT_SOCKET";
pub const ENV_CONNECTION_MODE: &str = "SCOUT_CONNECTION_MODE";
pub const ENV_BYTE_ORDER: &str = "SCOUT_FRAME_BYTE_ORDER";
pub const ENV_VERSION_FIELD: &str = "SCOUT_REGISTER_VERSION_FIELD";

/// How the client manages its socket
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionMode {
    /// One long-lived connection, opened up front and shared under a lock
    #[default]
    Persistent,
    /// A new connection per message; failures are swallowed
    PerCall,
}

impl FromStr for ConnectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "persistent" => Ok(ConnectionMode::Persistent),
            "per-call" | "per_call" | "oneshot" => Ok(ConnectionMode::PerCall),
            other => Err(format!("unknown connection mode: {other}")),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Application name reported in `Register`
    pub app: String,

    /// Agent key reported in `Register`
    pub key: String,

    /// Socket the agent listens on
    pub socket_path: PathBuf,

    pub mode: ConnectionMode,

    pub byte_order: ByteOrder,

    pub version_field: VersionField,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            app: String::new(),
            key: String::new(),
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            mode: ConnectionMode::default(),
            byte_order: ByteOrder::default(),
            version_field: VersionField::default(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unset app name and key become empty strings.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            app: lookup(ENV_APP_NAME).unwrap_or_default(),
            key: lookup(ENV_KEY).unwrap_or_default(),
            socket_path: lookup(ENV_SOCKET)
                .map(PathBuf::from)
                .unwrap_or(defaults.socket_path),
            mode: parse_var(&lookup, ENV_CONNECTION_MODE)?.unwrap_or(defaults.mode),
            byte_order: parse_var(&lookup, ENV_BYTE_ORDER)?.unwrap_or(defaults.byte_order),
            version_field: parse_var(&lookup, ENV_VERSION_FIELD)?
                .unwrap_or(defaults.version_field),
        })
    }

    pub fn codec(&self) -> Codec {
        Codec::new(self.version_field, self.byte_order)
    }

    /// Build a reporter for the configured mode.
    ///
    /// In persistent mode this opens the socket and registers the app. An
    /// unreachable agent is logged, not returned: the disconnected client
    /// is handed back anyway and its sends fail with `NotConnected`.
    pub fn connect(&self) -> Arc<dyn Reporter + Send + Sync> {
        match self.mode {
            ConnectionMode::Persistent => {
                let client = AgentClient::from_config(self);
                if let Err(e) = client.open() {
                    tracing::warn!("unable to open socket to core agent: {}", e);
                } else if let Err(e) = client.register(&self.app, &self.key) {
                    tracing::warn!("unable to register with core agent: {}", e);
                }
                Arc::new(client)
            }
            ConnectionMode::PerCall => {
                let client = OneShotClient::from_config(self);
                if let Err(e) = client.register(&self.app, &self.key) {
                    tracing::warn!("unable to register with core agent: {}", e);
                }
                Arc::new(client)
            }
        }
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}
