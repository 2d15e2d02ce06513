use coreagent_protocol::{Codec, Message, DEFAULT_SOCKET_PATH};
use std::io::Write;
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

use crate::config::AgentConfig;
use crate::error::ClientError;
use crate::reporter::Reporter;

/// Core agent client that opens a fresh connection for every message.
///
/// Connect and write failures are logged and dropped: a missing agent never
/// surfaces as an error. Messages sent from different threads may reach the
/// agent in any order.
#[derive(Clone, Debug)]
pub struct OneShotClient {
    socket_path: PathBuf,
    codec: Codec,
}

impl Default for OneShotClient {
    fn default() -> Self {
        Self::new(DEFAULT_SOCKET_PATH)
    }
}

impl OneShotClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            codec: Codec::default(),
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.socket_path.clone()).with_codec(config.codec())
    }

    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Reporter for OneShotClient {
    fn send(&self, message: &Message) -> Result<(), ClientError> {
        let frame = self.codec.frame(message)?;

        let mut stream = match UnixStream::connect(&self.socket_path) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::debug!(
                    "dropping {}: core agent unreachable at {:?}: {}",
                    message.name(),
                    self.socket_path,
                    e
                );
                return Ok(());
            }
        };

        if let Err(e) = stream.write_all(&frame) {
            tracing::debug!("dropping {}: write failed: {}", message.name(), e);
        }
        let _ = stream.shutdown(Shutdown::Both);
        Ok(())
    }
}
