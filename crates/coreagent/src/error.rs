use std::path::PathBuf;

use coreagent_protocol::ProtocolError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect to core agent at {path:?}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("core agent not connected")]
    NotConnected,

    #[error(transparent)]
    Serialization(#[from] ProtocolError),

    #[error("failed to write to core agent socket: {0}")]
    Write(#[source] std::io::Error),
}
