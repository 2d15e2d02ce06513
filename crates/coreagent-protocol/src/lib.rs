//! Protocol definitions for the core agent tracing socket.
//!
//! This crate defines the request/span identifiers, the event messages the
//! agent understands, and the length-prefixed framing used on the wire.

mod error;
mod frame;
mod id;
mod message;

pub use error::*;
pub use frame::*;
pub use id::*;
pub use message::*;

/// Default socket path the core agent listens on
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/core-agent.sock";
