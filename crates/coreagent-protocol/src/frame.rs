//! Length-prefixed framing.
//!
//! ```text
//! frame := length (4 bytes, unsigned) || payload (length bytes, UTF-8 JSON)
//! ```
//!
//! There is no terminator and no checksum. The agent reads exactly `length`
//! bytes after the prefix.

use std::io::{self, Read};
use std::str::FromStr;

use crate::error::ProtocolError;

/// Largest payload a reader accepts; longer prefixes are `InvalidData`
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Byte order of the 4-byte length prefix
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

impl ByteOrder {
    /// Encode a payload length as a prefix
    pub fn encode_len(self, len: usize) -> Result<[u8; 4], ProtocolError> {
        let len = u32::try_from(len).map_err(|_| ProtocolError::PayloadTooLarge(len))?;
        Ok(match self {
            ByteOrder::BigEndian => len.to_be_bytes(),
            ByteOrder::LittleEndian => len.to_le_bytes(),
        })
    }

    pub fn decode_len(self, prefix: [u8; 4]) -> u32 {
        match self {
            ByteOrder::BigEndian => u32::from_be_bytes(prefix),
            ByteOrder::LittleEndian => u32::from_le_bytes(prefix),
        }
    }
}

impl FromStr for ByteOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "big" | "be" | "big-endian" => Ok(ByteOrder::BigEndian),
            "little" | "le" | "little-endian" => Ok(ByteOrder::LittleEndian),
            other => Err(format!("unknown byte order: {other}")),
        }
    }
}

/// Prefix `payload` with its length, in a single buffer
pub fn encode_frame(payload: &[u8], order: ByteOrder) -> Result<Vec<u8>, ProtocolError> {
    let prefix = order.encode_len(payload.len())?;
    let mut frame = Vec::with_capacity(prefix.len() + payload.len());
    frame.extend_from_slice(&prefix);
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Read one frame from `reader`.
///
/// Returns `Ok(None)` if the stream ends cleanly before a new prefix. A stream
/// that ends inside a frame is an `UnexpectedEof` error. A prefix above
/// [`MAX_FRAME_LEN`] is rejected before any payload buffer is allocated.
pub fn read_frame<R: Read>(reader: &mut R, order: ByteOrder) -> io::Result<Option<Vec<u8>>> {
    let mut prefix = [0u8; 4];
    let mut filled = 0;
    while filled < prefix.len() {
        match reader.read(&mut prefix[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    let len = checked_len(order.decode_len(prefix))?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}

/// Validate a decoded prefix against [`MAX_FRAME_LEN`]
pub fn checked_len(len: u32) -> io::Result<usize> {
    let len = len as usize;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame length {len} exceeds {MAX_FRAME_LEN}"),
        ));
    }
    Ok(len)
}
