//! crates/protocol/src/error.rs
//! Failures encountered while encoding or decoding wire messages.

use std::io;

use thiserror::Error;

use crate::header::{HEADER_LEN, MAX_PAYLOAD_LENGTH};

/// Failures encountered while parsing or constructing wire messages.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum WireError {
    /// Fewer than [`HEADER_LEN`] bytes were provided for a header.
    #[error("message header truncated: expected {HEADER_LEN} bytes, got {actual}")]
    TruncatedHeader {
        /// Number of bytes that were available.
        actual: usize,
    },
    /// The header named a message kind this protocol does not define.
    #[error("unknown message kind {0}")]
    UnknownKind(u16),
    /// The payload ended before a declared field or list entry.
    #[error("payload truncated: needed {needed} more bytes at offset {offset}")]
    TruncatedPayload {
        /// Offset of the field that could not be read.
        offset: usize,
        /// Bytes missing.
        needed: usize,
    },
    /// The payload length exceeded [`MAX_PAYLOAD_LENGTH`].
    #[error("payload length {0} exceeds maximum {MAX_PAYLOAD_LENGTH}")]
    OversizedPayload(usize),
    /// A field held a value outside its domain.
    #[error("invalid {field} value {value}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Raw value found on the wire.
        value: u64,
    },
    /// Bytes remained after the payload was fully decoded.
    #[error("payload contains {0} trailing bytes")]
    TrailingBytes(usize),
}

impl From<WireError> for io::Error {
    fn from(err: WireError) -> Self {
        let kind = match err {
            WireError::OversizedPayload(_) => io::ErrorKind::InvalidInput,
            WireError::TruncatedHeader { .. } | WireError::TruncatedPayload { .. } => {
                io::ErrorKind::UnexpectedEof
            }
            WireError::UnknownKind(_)
            | WireError::InvalidField { .. }
            | WireError::TrailingBytes(_) => io::ErrorKind::InvalidData,
        };
        Self::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_truncated_header() {
        assert_eq!(
            WireError::TruncatedHeader { actual: 3 }.to_string(),
            format!("message header truncated: expected {HEADER_LEN} bytes, got 3")
        );
    }

    #[test]
    fn display_formats_invalid_field() {
        assert_eq!(
            WireError::InvalidField {
                field: "message_kind",
                value: 9
            }
            .to_string(),
            "invalid message_kind value 9"
        );
    }

    #[test]
    fn io_mapping_preserves_kind() {
        let oversized: io::Error = WireError::OversizedPayload(1 << 30).into();
        assert_eq!(oversized.kind(), io::ErrorKind::InvalidInput);

        let unknown: io::Error = WireError::UnknownKind(77).into();
        assert_eq!(unknown.kind(), io::ErrorKind::InvalidData);

        let truncated: io::Error = WireError::TruncatedPayload {
            offset: 4,
            needed: 2,
        }
        .into();
        assert_eq!(truncated.kind(), io::ErrorKind::UnexpectedEof);
    }
}
