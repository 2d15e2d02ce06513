//! Test doubles: a socket-backed mock agent and an in-memory reporter

use coreagent_protocol::{read_frame, ByteOrder, Message};
use parking_lot::Mutex;
use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::error::ClientError;
use crate::reporter::Reporter;

/// Listens on a Unix socket and collects every frame payload it receives.
///
/// Connections are drained one at a time, in accept order, so every
/// connection made before `finish` is read to the end.
pub struct MockAgent {
    socket_path: PathBuf,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Vec<String>>,
}

impl MockAgent {
    pub fn start(socket_path: PathBuf, order: ByteOrder) -> Self {
        let listener = UnixListener::bind(&socket_path).unwrap();
        let stop = Arc::new(AtomicBool::new(false));

        let stop_flag = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            let mut frames = Vec::new();
            for stream in listener.incoming() {
                drain(stream.unwrap(), order, &mut frames);
                if stop_flag.load(Ordering::SeqCst) {
                    break;
                }
            }

            // Connections queued before `finish` (the wake-up one included)
            // are still in the backlog
            listener.set_nonblocking(true).unwrap();
            loop {
                match listener.accept() {
                    Ok((stream, _)) => drain(stream, order, &mut frames),
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(e) => panic!("accept failed: {e}"),
                }
            }
            frames
        });

        Self {
            socket_path,
            stop,
            handle,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Stop accepting and return the payloads received so far.
    ///
    /// Every client connection must be closed first.
    pub fn finish(self) -> Vec<String> {
        self.stop.store(true, Ordering::SeqCst);
        // Wake the accept loop
        let _ = UnixStream::connect(&self.socket_path);
        self.handle.join().unwrap()
    }
}

fn drain(mut stream: UnixStream, order: ByteOrder, frames: &mut Vec<String>) {
    stream.set_nonblocking(false).unwrap();
    while let Some(payload) = read_frame(&mut stream, order).unwrap() {
        frames.push(String::from_utf8(payload).unwrap());
    }
}

/// Reporter that keeps messages in memory, optionally failing every send
#[derive(Default)]
pub struct RecordingReporter {
    pub messages: Mutex<Vec<Message>>,
    pub fail: bool,
}

impl RecordingReporter {
    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn take(&self) -> Vec<Message> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl Reporter for RecordingReporter {
    fn send(&self, message: &Message) -> Result<(), ClientError> {
        self.messages.lock().push(message.clone());
        if self.fail {
            return Err(ClientError::NotConnected);
        }
        Ok(())
    }
}
