//! Client library for sending request and span events to a local core agent.
//!
//! # Example
//!
//! ```no_run
//! use coreagent::{AgentClient, RequestTrace, Reporter};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AgentClient::new("/tmp/core-agent.sock");
//!     client.open()?;
//!     client.register("my app", "my key")?;
//!
//!     let trace = RequestTrace::start(&client)?;
//!     let span = trace.span("Controller/hello")?;
//!
//!     // Do work...
//!
//!     span.stop();
//!     trace.finish();
//!     client.close();
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod oneshot;
mod reporter;
mod trace;

pub use client::AgentClient;
pub use config::{AgentConfig, ConfigError, ConnectionMode};
pub use coreagent_protocol::*;
pub use error::ClientError;
pub use oneshot::OneShotClient;
pub use reporter::Reporter;
pub use trace::{IdSource, RequestTrace, SpanGuard};

#[cfg(test)]
pub(crate) mod testing;
