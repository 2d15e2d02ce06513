use serde::Serialize;
use std::fmt;

use crate::error::IdError;

/// Request or span identifier.
///
/// Generated ids are random RFC 4122 version 4 UUIDs in canonical
/// 8-4-4-4-12 lowercase hex form. The agent treats ids as opaque strings, so
/// any string converts into an `Id`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    /// Generate a fresh random identifier
    pub fn generate() -> Result<Self, IdError> {
        Self::generate_with(getrandom::getrandom)
    }

    /// Generate an identifier from 16 bytes written by `fill`
    pub fn generate_with(
        fill: impl FnOnce(&mut [u8]) -> Result<(), getrandom::Error>,
    ) -> Result<Self, IdError> {
        let mut bytes = [0u8; 16];
        fill(&mut bytes)?;
        Ok(Self::from_random_bytes(bytes))
    }

    /// Stamp version and variant bits onto 16 random bytes and format them
    fn from_random_bytes(mut bytes: [u8; 16]) -> Self {
        // version 4 (random)
        bytes[6] = (bytes[6] & 0x0f) | 0x40;
        // RFC 4122 variant (10xx)
        bytes[8] = (bytes[8] & 0x3f) | 0x80;

        Self(format!(
            "{}-{}-{}-{}-{}",
            hex::encode(&bytes[0..4]),
            hex::encode(&bytes[4..6]),
            hex::encode(&bytes[6..8]),
            hex::encode(&bytes[8..10]),
            hex::encode(&bytes[10..16]),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
