//! crates/protocol/src/stream.rs
//! Blocking message I/O over any `Read`/`Write` transport.

use std::io::{self, Read, Write};

use crate::header::{HEADER_LEN, MessageHeader};
use crate::message::WireMessage;

/// Writes one encoded message to `writer`.
///
/// Payloads above [`MAX_PAYLOAD_LENGTH`](crate::MAX_PAYLOAD_LENGTH) fail with
/// [`io::ErrorKind::InvalidInput`] before anything is written.
pub fn write_message<W: Write + ?Sized>(writer: &mut W, message: &WireMessage) -> io::Result<()> {
    let bytes = message.encode()?;
    writer.write_all(&bytes)
}

/// Reads the next message from `reader`.
///
/// Blocks until a full header and payload have arrived. Malformed headers or
/// payloads surface as [`io::ErrorKind::InvalidData`]; a stream that ends
/// mid-message surfaces as [`io::ErrorKind::UnexpectedEof`].
pub fn read_message<R: Read + ?Sized>(reader: &mut R) -> io::Result<WireMessage> {
    let mut header_bytes = [0u8; HEADER_LEN];
    reader.read_exact(&mut header_bytes)?;
    let header = MessageHeader::decode(&header_bytes)?;

    let mut payload = vec![0u8; header.payload_len()];
    reader.read_exact(&mut payload)?;

    WireMessage::from_parts(header, &payload).map_err(|err| {
        // A short field inside a complete frame is corrupt data, not a short stream.
        io::Error::new(io::ErrorKind::InvalidData, err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Routing;
    use crate::message::WireBody;
    use logging::{Priority, ScopeId, ScopeSnapshot};

    #[test]
    fn consecutive_messages_share_a_stream() {
        let first = WireMessage::new(Routing::new(1, 2, 0), WireBody::QueryScopes { target: 1 });
        let second = WireMessage::new(
            Routing::new(2, 1, 0),
            WireBody::ScopesUpdated(vec![ScopeSnapshot {
                id: ScopeId::of("a"),
                name: "a".into(),
                priority: Priority::INFO,
            }]),
        );

        let mut buffer = Vec::new();
        write_message(&mut buffer, &first).expect("write first");
        write_message(&mut buffer, &second).expect("write second");

        let mut cursor = io::Cursor::new(buffer);
        assert_eq!(read_message(&mut cursor).expect("first"), first);
        assert_eq!(read_message(&mut cursor).expect("second"), second);
        let eof = read_message(&mut cursor).unwrap_err();
        assert_eq!(eof.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn truncated_payload_is_unexpected_eof() {
        let message = WireMessage::new(Routing::default(), WireBody::QueryInstances { target: 4 });
        let mut bytes = message.encode().expect("encodes");
        bytes.pop();
        let err = read_message(&mut io::Cursor::new(bytes)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn unknown_kind_is_invalid_data() {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[8] = 0xFF;
        let err = read_message(&mut io::Cursor::new(bytes)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn malformed_payload_is_invalid_data() {
        let message = WireMessage::new(Routing::default(), WireBody::QueryScopes { target: 4 });
        let mut bytes = message.encode().expect("encodes");
        // Declare a two-byte payload for a kind that needs four.
        bytes[16..20].copy_from_slice(&2u32.to_le_bytes());
        bytes.truncate(HEADER_LEN + 2);
        let err = read_message(&mut io::Cursor::new(bytes)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
