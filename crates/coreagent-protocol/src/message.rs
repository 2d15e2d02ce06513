use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::str::FromStr;

use crate::error::ProtocolError;
use crate::frame::{encode_frame, ByteOrder};
use crate::id::Id;

/// Protocol revision announced by `Register`
pub const PROTOCOL_VERSION: &str = "1.0";

/// Event sent to the core agent
///
/// On the wire each message is a single-key JSON object keyed by the variant
/// name, e.g. `{"StartRequest":{"request_id":"..."}}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Register(Register),
    StartRequest(StartRequest),
    FinishRequest(FinishRequest),
    StartSpan(StartSpan),
    StopSpan(StopSpan),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Register {
    pub app: String,
    pub key: String,
    pub version: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StartRequest {
    pub request_id: Id,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FinishRequest {
    pub request_id: Id,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StartSpan {
    pub request_id: Id,
    pub span_id: Id,
    pub operation: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StopSpan {
    pub request_id: Id,
    pub span_id: Id,
}

impl Message {
    pub fn register(app: impl Into<String>, key: impl Into<String>) -> Self {
        Message::Register(Register {
            app: app.into(),
            key: key.into(),
            version: PROTOCOL_VERSION.to_string(),
        })
    }

    pub fn start_request(request_id: impl Into<Id>) -> Self {
        Message::StartRequest(StartRequest {
            request_id: request_id.into(),
        })
    }

    pub fn finish_request(request_id: impl Into<Id>) -> Self {
        Message::FinishRequest(FinishRequest {
            request_id: request_id.into(),
        })
    }

    pub fn start_span(
        request_id: impl Into<Id>,
        span_id: impl Into<Id>,
        operation: impl Into<String>,
    ) -> Self {
        Message::StartSpan(StartSpan {
            request_id: request_id.into(),
            span_id: span_id.into(),
            operation: operation.into(),
        })
    }

    pub fn stop_span(request_id: impl Into<Id>, span_id: impl Into<Id>) -> Self {
        Message::StopSpan(StopSpan {
            request_id: request_id.into(),
            span_id: span_id.into(),
        })
    }

    /// Variant name, also the top-level JSON key
    pub fn name(&self) -> &'static str {
        match self {
            Message::Register(_) => "Register",
            Message::StartRequest(_) => "StartRequest",
            Message::FinishRequest(_) => "FinishRequest",
            Message::StartSpan(_) => "StartSpan",
            Message::StopSpan(_) => "StopSpan",
        }
    }
}

/// Key used for the protocol version inside `Register`.
///
/// Agents have been fed both `api_version` and `version`, and some clients
/// leave the field out entirely.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VersionField {
    #[default]
    ApiVersion,
    Version,
    Omit,
}

impl VersionField {
    fn key(self) -> Option<&'static str> {
        match self {
            VersionField::ApiVersion => Some("api_version"),
            VersionField::Version => Some("version"),
            VersionField::Omit => None,
        }
    }
}

impl FromStr for VersionField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "api_version" => Ok(VersionField::ApiVersion),
            "version" => Ok(VersionField::Version),
            "omit" => Ok(VersionField::Omit),
            other => Err(format!("unknown version field: {other}")),
        }
    }
}

/// Turns messages into JSON payloads and frames
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Codec {
    pub version_field: VersionField,
    pub byte_order: ByteOrder,
}

impl Codec {
    pub fn new(version_field: VersionField, byte_order: ByteOrder) -> Self {
        Self {
            version_field,
            byte_order,
        }
    }

    /// Serialize a message to its JSON envelope
    pub fn encode(&self, message: &Message) -> Result<Vec<u8>, ProtocolError> {
        let envelope = Envelope {
            message,
            version_field: self.version_field,
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    /// Serialize and length-prefix a message
    pub fn frame(&self, message: &Message) -> Result<Vec<u8>, ProtocolError> {
        let payload = self.encode(message)?;
        encode_frame(&payload, self.byte_order)
    }
}

struct Envelope<'a> {
    message: &'a Message,
    version_field: VersionField,
}

impl Serialize for Envelope<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        let name = self.message.name();
        match self.message {
            Message::Register(register) => map.serialize_entry(
                name,
                &RegisterBody {
                    register,
                    version_field: self.version_field,
                },
            )?,
            Message::StartRequest(body) => map.serialize_entry(name, body)?,
            Message::FinishRequest(body) => map.serialize_entry(name, body)?,
            Message::StartSpan(body) => map.serialize_entry(name, body)?,
            Message::StopSpan(body) => map.serialize_entry(name, body)?,
        }
        map.end()
    }
}

struct RegisterBody<'a> {
    register: &'a Register,
    version_field: VersionField,
}

impl Serialize for RegisterBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let version_key = self.version_field.key();
        let len = if version_key.is_some() { 3 } else { 2 };

        let mut state = serializer.serialize_struct("Register", len)?;
        state.serialize_field("app", &self.register.app)?;
        state.serialize_field("key", &self.register.key)?;
        if let Some(key) = version_key {
            state.serialize_field(key, &self.register.version)?;
        }
        state.end()
    }
}
