use coreagent_protocol::{Codec, Message};
use parking_lot::Mutex;
use std::io::Write;
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

use crate::config::AgentConfig;
use crate::error::ClientError;
use crate::reporter::Reporter;

/// Core agent client holding one long-lived socket connection.
///
/// `open`, `send` and `close` all run under the same lock, so frames from
/// concurrent callers reach the agent whole and in the order `send` was
/// called.
pub struct AgentClient {
    socket_path: PathBuf,
    codec: Codec,
    socket: Mutex<Option<UnixStream>>,
}

impl AgentClient {
    /// Create a disconnected client for the agent at `socket_path`
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            codec: Codec::default(),
            socket: Mutex::new(None),
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

    /// Connect to the agent, replacing any connection already held.
    ///
    /// On failure the client is left disconnected. There is no retry.
    pub fn open(&self) -> Result<(), ClientError> {
        let mut socket = self.socket.lock();
        match UnixStream::connect(&self.socket_path) {
            Ok(stream) => {
                tracing::info!("connected to core agent at {:?}", self.socket_path);
                *socket = Some(stream);
                Ok(())
            }
            Err(source) => {
                *socket = None;
                Err(ClientError::Connect {
                    path: self.socket_path.clone(),
                    source,
                })
            }
        }
    }

    /// Drop the connection if there is one. Never fails.
    pub fn close(&self) {
        if let Some(stream) = self.socket.lock().take() {
            // The handle is gone either way
            let _ = stream.shutdown(Shutdown::Both);
            tracing::info!("closed core agent connection");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.socket.lock().is_some()
    }
}

impl Reporter for AgentClient {
    fn send(&self, message: &Message) -> Result<(), ClientError> {
        let mut socket = self.socket.lock();
        let stream = socket.as_mut().ok_or(ClientError::NotConnected)?;

        let frame = self.codec.frame(message)?;
        if let Err(e) = stream.write_all(&frame) {
            // A half-written frame leaves the stream unusable for the agent
            *socket = None;
            return Err(ClientError::Write(e));
        }

        tracing::debug!("sent {} ({} bytes)", message.name(), frame.len());
        Ok(())
    }
}

impl Drop for AgentClient {
    fn drop(&mut self) {
        self.close();
    }
}
