//! Stand-in for the core agent: accepts frames and logs them

use coreagent_protocol::{checked_len, ByteOrder};
use std::future::Future;
use std::io;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

/// Mock core agent listening on a Unix socket.
///
/// Every decoded payload is logged and, if a sink is attached, forwarded to it.
pub struct MockAgent {
    socket_path: PathBuf,
    byte_order: ByteOrder,
    sink: Option<mpsc::UnboundedSender<serde_json::Value>>,
}

impl MockAgent {
    pub fn new(socket_path: impl Into<PathBuf>, byte_order: ByteOrder) -> Self {
        Self {
            socket_path: socket_path.into(),
            byte_order,
            sink: None,
        }
    }

    /// Forward each received payload to `sink`
    pub fn with_sink(mut self, sink: mpsc::UnboundedSender<serde_json::Value>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Listen until `shutdown` resolves, then remove the socket file
    pub async fn serve(self, shutdown: impl Future<Output = ()>) -> io::Result<()> {
        // Remove a stale socket left by a previous run
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!("📡 Mock agent listening on {:?}", self.socket_path);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        let byte_order = self.byte_order;
                        let sink = self.sink.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, byte_order, sink).await {
                                tracing::error!("Connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => tracing::error!("Accept error: {}", e),
                },
            }
        }

        tracing::info!("Mock agent shutting down");
        std::fs::remove_file(&self.socket_path)?;
        Ok(())
    }
}

async fn handle_connection(
    mut stream: UnixStream,
    byte_order: ByteOrder,
    sink: Option<mpsc::UnboundedSender<serde_json::Value>>,
) -> io::Result<()> {
    tracing::debug!("New agent connection");

    loop {
        let mut prefix = [0u8; 4];
        match stream.read_exact(&mut prefix).await {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }

        let len = checked_len(byte_order.decode_len(prefix))?;
        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload).await?;

        let message: serde_json::Value = serde_json::from_slice(&payload)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        tracing::info!("received {}", message);

        if let Some(sink) = &sink {
            let _ = sink.send(message);
        }
    }

    tracing::debug!("Agent connection closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coreagent::{AgentClient, Codec, Message, OneShotClient, Reporter, VersionField};
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    async fn wait_for_socket(path: &std::path::Path) {
        while !path.exists() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_mock_agent_receives_client_frames() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("agent.sock");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let agent = MockAgent::new(&socket_path, ByteOrder::LittleEndian).with_sink(tx);
        let server = tokio::spawn(agent.serve(async move {
            let _ = stop_rx.await;
        }));
        wait_for_socket(&socket_path).await;

        let path = socket_path.clone();
        tokio::task::spawn_blocking(move || {
            let codec = Codec::new(VersionField::ApiVersion, ByteOrder::LittleEndian);
            let client = AgentClient::new(&path).with_codec(codec);
            client.open().unwrap();
            client.register("A", "K").unwrap();
            client.close();

            OneShotClient::new(&path)
                .with_codec(codec)
                .send(&Message::start_request("r1"))
                .unwrap();
        })
        .await
        .unwrap();

        // Each connection is handled on its own task, so arrival order is open
        let mut received = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
        received.sort_by_key(|m| m.get("Register").is_none());
        assert_eq!(received[0]["Register"]["app"], "A");
        assert_eq!(received[0]["Register"]["api_version"], "1.0");
        assert_eq!(received[1]["StartRequest"]["request_id"], "r1");

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert!(!socket_path.exists());
    }

    #[tokio::test]
    async fn test_oversized_frame_closes_connection() {
        use tokio::io::AsyncWriteExt;

        let (server_end, mut client_end) = UnixStream::pair().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handler = tokio::spawn(handle_connection(server_end, ByteOrder::BigEndian, Some(tx)));

        client_end.write_all(&[0xff, 0xff, 0xff, 0xff]).await.unwrap();

        let err = handler.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_stale_socket_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("agent.sock");
        std::fs::write(&socket_path, b"stale").unwrap();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(MockAgent::new(&socket_path, ByteOrder::BigEndian).serve(
            async move {
                let _ = stop_rx.await;
            },
        ));

        // Wait for the listener to replace the stale file
        let path = socket_path.clone();
        tokio::task::spawn_blocking(move || loop {
            if std::os::unix::net::UnixStream::connect(&path).is_ok() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        })
        .await
        .unwrap();

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
