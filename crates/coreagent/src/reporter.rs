use coreagent_protocol::{Id, Message};

use crate::error::ClientError;

/// Something that delivers messages to the core agent.
///
/// Only `send` is required; the lifecycle calls build the matching message.
/// Hosts share one reporter across handlers, typically as
/// `Arc<dyn Reporter + Send + Sync>`.
pub trait Reporter {
    fn send(&self, message: &Message) -> Result<(), ClientError>;

    fn register(&self, app: &str, key: &str) -> Result<(), ClientError> {
        self.send(&Message::register(app, key))
    }

    fn start_request(&self, request_id: &Id) -> Result<(), ClientError> {
        self.send(&Message::start_request(request_id.clone()))
    }

    fn finish_request(&self, request_id: &Id) -> Result<(), ClientError> {
        self.send(&Message::finish_request(request_id.clone()))
    }

    fn start_span(&self, request_id: &Id, span_id: &Id, operation: &str) -> Result<(), ClientError> {
        self.send(&Message::start_span(
            request_id.clone(),
            span_id.clone(),
            operation,
        ))
    }

    fn stop_span(&self, request_id: &Id, span_id: &Id) -> Result<(), ClientError> {
        self.send(&Message::stop_span(request_id.clone(), span_id.clone()))
    }
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn send(&self, message: &Message) -> Result<(), ClientError> {
        (**self).send(message)
    }
}

impl<R: Reporter + ?Sized> Reporter for std::sync::Arc<R> {
    fn send(&self, message: &Message) -> Result<(), ClientError> {
        (**self).send(message)
    }
}
