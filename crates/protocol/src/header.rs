//! crates/protocol/src/header.rs
//! Fixed-size routing header preceding every payload.

use crate::error::WireError;
use crate::kind::WireKind;

/// Size of an encoded [`MessageHeader`] in bytes.
pub const HEADER_LEN: usize = 20;

/// Largest payload a single message may carry.
pub const MAX_PAYLOAD_LENGTH: usize = 16 * 1024 * 1024;

/// Routing fields shared by every message.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Routing {
    /// Instance the message is addressed to.
    pub target: u32,
    /// Instance that sent the message.
    pub source: u32,
    /// Correlation number; answers echo the request's value.
    pub sequence: u32,
}

impl Routing {
    /// Creates routing fields.
    #[must_use]
    pub const fn new(target: u32, source: u32, sequence: u32) -> Self {
        Self {
            target,
            source,
            sequence,
        }
    }

    /// Routing for an answer to a message carrying `self`.
    #[must_use]
    pub const fn reply(self) -> Self {
        Self {
            target: self.source,
            source: self.target,
            sequence: self.sequence,
        }
    }
}

/// A decoded message header.
///
/// Layout, little-endian: `target u32 | source u32 | kind u16 | reserved u16 |
/// sequence u32 | payload_len u32`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MessageHeader {
    routing: Routing,
    kind: WireKind,
    payload_len: u32,
}

impl MessageHeader {
    /// Creates a header, rejecting payloads above [`MAX_PAYLOAD_LENGTH`].
    pub fn new(routing: Routing, kind: WireKind, payload_len: usize) -> Result<Self, WireError> {
        if payload_len > MAX_PAYLOAD_LENGTH {
            return Err(WireError::OversizedPayload(payload_len));
        }
        Ok(Self {
            routing,
            kind,
            payload_len: payload_len as u32,
        })
    }

    /// Parses a header from the beginning of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let Some(raw) = bytes.first_chunk::<HEADER_LEN>() else {
            return Err(WireError::TruncatedHeader {
                actual: bytes.len(),
            });
        };

        let u32_at =
            |at: usize| u32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]]);
        let kind_value = u16::from_le_bytes([raw[8], raw[9]]);
        let kind = WireKind::from_u16(kind_value).ok_or(WireError::UnknownKind(kind_value))?;
        let payload_len = u32_at(16) as usize;

        Self::new(
            Routing::new(u32_at(0), u32_at(4), u32_at(12)),
            kind,
            payload_len,
        )
    }

    /// Encodes this header into its wire form.
    #[must_use]
    pub fn encode(self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.routing.target.to_le_bytes());
        out[4..8].copy_from_slice(&self.routing.source.to_le_bytes());
        out[8..10].copy_from_slice(&self.kind.as_u16().to_le_bytes());
        out[12..16].copy_from_slice(&self.routing.sequence.to_le_bytes());
        out[16..20].copy_from_slice(&self.payload_len.to_le_bytes());
        out
    }

    /// Routing fields.
    #[must_use]
    #[inline]
    pub const fn routing(self) -> Routing {
        self.routing
    }

    /// Message kind.
    #[must_use]
    #[inline]
    pub const fn kind(self) -> WireKind {
        self.kind
    }

    /// Payload length in bytes.
    #[must_use]
    #[inline]
    pub const fn payload_len(self) -> usize {
        self.payload_len as usize
    }
}

impl TryFrom<&[u8; HEADER_LEN]> for MessageHeader {
    type Error = WireError;

    #[inline]
    fn try_from(bytes: &[u8; HEADER_LEN]) -> Result<Self, Self::Error> {
        Self::decode(bytes)
    }
}
