//! crates/protocol/src/codec.rs
//!
//! Async codec for observer wire messages using tokio-util.
//!
//! [`WireCodec`] frames [`WireMessage`]s on any `AsyncRead`/`AsyncWrite`
//! stream: it waits for a complete header, then for the declared payload,
//! and only then consumes bytes from the buffer.

use std::io;

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::WireError;
use crate::header::{HEADER_LEN, MAX_PAYLOAD_LENGTH, MessageHeader};
use crate::message::WireMessage;

/// Frames [`WireMessage`]s for `tokio_util::codec::Framed`.
///
/// # Example
///
/// ```ignore
/// use futures::{SinkExt, StreamExt};
/// use tokio_util::codec::Framed;
/// use protocol::WireCodec;
///
/// let mut framed = Framed::new(stream, WireCodec::new());
/// framed.send(message).await?;
/// while let Some(message) = framed.next().await {
///     observer.process(&message?);
/// }
/// ```
#[derive(Clone, Debug)]
pub struct WireCodec {
    max_payload_len: usize,
}

impl WireCodec {
    /// Creates a codec accepting payloads up to [`MAX_PAYLOAD_LENGTH`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_payload_len: MAX_PAYLOAD_LENGTH,
        }
    }

    /// Creates a codec with a lower payload limit, clamped to [`MAX_PAYLOAD_LENGTH`].
    #[must_use]
    pub fn with_max_payload_len(max_payload_len: usize) -> Self {
        Self {
            max_payload_len: max_payload_len.min(MAX_PAYLOAD_LENGTH),
        }
    }

    /// Largest payload this codec accepts.
    #[must_use]
    pub const fn max_payload_len(&self) -> usize {
        self.max_payload_len
    }
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for WireCodec {
    type Item = WireMessage;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let header = MessageHeader::decode(&src[..HEADER_LEN])?;
        let payload_len = header.payload_len();
        if payload_len > self.max_payload_len {
            return Err(WireError::OversizedPayload(payload_len).into());
        }

        let total_len = HEADER_LEN + payload_len;
        if src.len() < total_len {
            src.reserve(total_len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let payload = src.split_to(payload_len);
        WireMessage::from_parts(header, &payload)
            .map(Some)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}

impl Encoder<WireMessage> for WireCodec {
    type Error = io::Error;

    fn encode(&mut self, item: WireMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<&WireMessage>>::encode(self, &item, dst)
    }
}

impl Encoder<&WireMessage> for WireCodec {
    type Error = io::Error;

    fn encode(&mut self, item: &WireMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = item.encode()?;
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Routing;
    use crate::message::WireBody;
    use logging::{LogRecord, ScopeId, Severity};

    fn log_message() -> WireMessage {
        WireMessage::new(
            Routing::new(1, 2, 3),
            WireBody::LogMessage(Box::new(LogRecord::text(
                ScopeId::of("codec"),
                Severity::Info,
                "framed",
            ))),
        )
    }

    #[test]
    fn partial_frames_wait_for_more_bytes() {
        let message = log_message();
        let bytes = message.encode().expect("encodes");
        let mut codec = WireCodec::new();
        let mut buffer = BytesMut::from(&bytes[..HEADER_LEN - 1]);
        assert!(codec.decode(&mut buffer).expect("ok").is_none());

        buffer.extend_from_slice(&bytes[HEADER_LEN - 1..bytes.len() - 1]);
        assert!(codec.decode(&mut buffer).expect("ok").is_none());
        assert_eq!(buffer.len(), bytes.len() - 1);

        buffer.extend_from_slice(&bytes[bytes.len() - 1..]);
        let decoded = codec.decode(&mut buffer).expect("ok").expect("frame");
        assert_eq!(decoded, message);
        assert!(buffer.is_empty());
    }

    #[test]
    fn encoder_and_decoder_agree() {
        let mut codec = WireCodec::default();
        let mut buffer = BytesMut::new();
        let message = log_message();
        codec.encode(message.clone(), &mut buffer).expect("encodes");
        codec
            .encode(
                &WireMessage::new(Routing::default(), WireBody::SaveConfiguration),
                &mut buffer,
            )
            .expect("encodes");

        assert_eq!(codec.decode(&mut buffer).expect("ok"), Some(message));
        assert_eq!(
            codec.decode(&mut buffer).expect("ok").map(|m| m.kind()),
            Some(crate::WireKind::SaveConfiguration)
        );
        assert!(codec.decode(&mut buffer).expect("ok").is_none());
    }

    #[test]
    fn payload_limit_is_enforced() {
        let bytes = log_message().encode().expect("encodes");
        let mut codec = WireCodec::with_max_payload_len(16);
        let mut buffer = BytesMut::from(&bytes[..]);
        let err = codec.decode(&mut buffer).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
