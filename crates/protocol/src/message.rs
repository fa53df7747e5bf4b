//! crates/protocol/src/message.rs
//! Typed wire messages and their payload encodings.
//!
//! Every message is a [`MessageHeader`] followed by a kind-specific payload.
//! List payloads start with a `u32` count and are read exactly `count` times;
//! names inside them are `u16`-length-prefixed and clamped to
//! [`SCOPE_NAME_CAPACITY`](crate::SCOPE_NAME_CAPACITY) bytes.

use logging::{LogRecord, Priority, ScopeId, ScopeSnapshot, ScopeUpdate};

use crate::error::WireError;
use crate::header::{HEADER_LEN, MessageHeader, Routing};
use crate::kind::WireKind;
use crate::payload::{PayloadReader, put_name, put_u32};
use crate::record::{RECORD_WIRE_LEN, decode_record, encode_record};

/// Smallest encoding of one scope entry: id, priority, empty name.
const MIN_SCOPE_ENTRY_LEN: usize = 4 + 4 + 2;
/// Smallest encoding of one update entry: empty name, id, priority.
const MIN_UPDATE_ENTRY_LEN: usize = 2 + 4 + 4;

/// Kind-specific content of a [`WireMessage`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WireBody {
    /// Full scope table of the sending instance.
    RegisterScopes(Vec<ScopeSnapshot>),
    /// Priority changes; group names carry [`ScopeId::GROUP`].
    UpdateScopes(Vec<ScopeUpdate>),
    /// Asks `target` for its scope table.
    QueryScopes {
        /// Instance being queried.
        target: u32,
    },
    /// Scope table after a bulk or group change.
    ScopesUpdated(Vec<ScopeSnapshot>),
    /// One log record.
    LogMessage(Box<LogRecord>),
    /// Asks `target` to announce itself.
    QueryInstances {
        /// Instance being queried.
        target: u32,
    },
    /// Asks the receiver to persist its scope priorities.
    SaveConfiguration,
    /// Acknowledges [`WireBody::SaveConfiguration`].
    ConfigurationSaved,
}

impl WireBody {
    /// Kind tag written into the header.
    #[must_use]
    pub const fn kind(&self) -> WireKind {
        match self {
            Self::RegisterScopes(_) => WireKind::RegisterScopes,
            Self::UpdateScopes(_) => WireKind::UpdateScopes,
            Self::QueryScopes { .. } => WireKind::QueryScopes,
            Self::ScopesUpdated(_) => WireKind::ScopesUpdated,
            Self::LogMessage(_) => WireKind::LogMessage,
            Self::QueryInstances { .. } => WireKind::QueryInstances,
            Self::SaveConfiguration => WireKind::SaveConfiguration,
            Self::ConfigurationSaved => WireKind::ConfigurationSaved,
        }
    }

    /// Appends the payload encoding to `out`.
    pub fn encode_payload(&self, out: &mut Vec<u8>) {
        match self {
            Self::RegisterScopes(scopes) | Self::ScopesUpdated(scopes) => {
                put_u32(out, scopes.len() as u32);
                for scope in scopes {
                    put_u32(out, scope.id.as_u32());
                    put_u32(out, scope.priority.bits());
                    put_name(out, &scope.name);
                }
            }
            Self::UpdateScopes(updates) => {
                put_u32(out, updates.len() as u32);
                for update in updates {
                    let id = if update.is_group() {
                        ScopeId::GROUP
                    } else {
                        update.id
                    };
                    put_name(out, &update.name);
                    put_u32(out, id.as_u32());
                    put_u32(out, update.priority.bits());
                }
            }
            Self::QueryScopes { target } | Self::QueryInstances { target } => {
                put_u32(out, *target);
            }
            Self::LogMessage(record) => encode_record(record, out),
            Self::SaveConfiguration | Self::ConfigurationSaved => {}
        }
    }

    /// Decodes a payload of `kind`, rejecting leftover bytes.
    pub fn decode_payload(kind: WireKind, payload: &[u8]) -> Result<Self, WireError> {
        let mut reader = PayloadReader::new(payload);
        let body = match kind {
            WireKind::RegisterScopes => Self::RegisterScopes(read_scopes(&mut reader)?),
            WireKind::ScopesUpdated => Self::ScopesUpdated(read_scopes(&mut reader)?),
            WireKind::UpdateScopes => Self::UpdateScopes(read_updates(&mut reader)?),
            WireKind::QueryScopes => Self::QueryScopes {
                target: reader.u32()?,
            },
            WireKind::QueryInstances => Self::QueryInstances {
                target: reader.u32()?,
            },
            WireKind::LogMessage => Self::LogMessage(Box::new(decode_record(&mut reader)?)),
            WireKind::SaveConfiguration => Self::SaveConfiguration,
            WireKind::ConfigurationSaved => Self::ConfigurationSaved,
        };
        reader.finish()?;
        Ok(body)
    }

    fn payload_hint(&self) -> usize {
        match self {
            Self::RegisterScopes(scopes) | Self::ScopesUpdated(scopes) => {
                4 + scopes.len() * (MIN_SCOPE_ENTRY_LEN + 24)
            }
            Self::UpdateScopes(updates) => 4 + updates.len() * (MIN_UPDATE_ENTRY_LEN + 24),
            Self::LogMessage(_) => RECORD_WIRE_LEN,
            Self::QueryScopes { .. } | Self::QueryInstances { .. } => 4,
            Self::SaveConfiguration | Self::ConfigurationSaved => 0,
        }
    }
}

fn read_scopes(reader: &mut PayloadReader<'_>) -> Result<Vec<ScopeSnapshot>, WireError> {
    let count = reader.count(MIN_SCOPE_ENTRY_LEN)?;
    let mut scopes = Vec::with_capacity(count);
    for _ in 0..count {
        let id = ScopeId::from_raw(reader.u32()?);
        let priority = Priority::from_bits(reader.u32()?);
        let name = reader.name()?;
        scopes.push(ScopeSnapshot { id, name, priority });
    }
    Ok(scopes)
}

fn read_updates(reader: &mut PayloadReader<'_>) -> Result<Vec<ScopeUpdate>, WireError> {
    let count = reader.count(MIN_UPDATE_ENTRY_LEN)?;
    let mut updates = Vec::with_capacity(count);
    for _ in 0..count {
        let name = reader.name()?;
        let id = ScopeId::from_raw(reader.u32()?);
        let priority = Priority::from_bits(reader.u32()?);
        updates.push(ScopeUpdate { name, id, priority });
    }
    Ok(updates)
}

/// A complete message: routing plus body.
///
/// # Examples
///
/// ```
/// use logging::{Priority, ScopeUpdate};
/// use protocol::{Routing, WireBody, WireMessage};
///
/// let update = WireMessage::new(
///     Routing::new(7, 0, 1),
///     WireBody::UpdateScopes(vec![ScopeUpdate::named("net_*", Priority::ERROR)]),
/// );
/// let bytes = update.encode().expect("fits");
/// assert_eq!(WireMessage::decode(&bytes).expect("decodes"), update);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WireMessage {
    /// Addressing and correlation.
    pub routing: Routing,
    /// Kind-specific content.
    pub body: WireBody,
}

impl WireMessage {
    /// Creates a message.
    #[must_use]
    pub const fn new(routing: Routing, body: WireBody) -> Self {
        Self { routing, body }
    }

    /// Kind of the body.
    #[must_use]
    pub const fn kind(&self) -> WireKind {
        self.body.kind()
    }

    /// Encodes header and payload into one buffer.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.body.payload_hint());
        self.encode_into(&mut out)?;
        Ok(out)
    }

    /// Appends header and payload to `out`.
    ///
    /// On error `out` is left as it was.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), WireError> {
        let start = out.len();
        out.resize(start + HEADER_LEN, 0);
        self.body.encode_payload(out);
        let payload_len = out.len() - start - HEADER_LEN;
        match MessageHeader::new(self.routing, self.kind(), payload_len) {
            Ok(header) => {
                out[start..start + HEADER_LEN].copy_from_slice(&header.encode());
                Ok(())
            }
            Err(err) => {
                out.truncate(start);
                Err(err)
            }
        }
    }

    /// Decodes a message occupying exactly `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let header = MessageHeader::decode(bytes)?;
        let payload = &bytes[HEADER_LEN..];
        match payload.len().cmp(&header.payload_len()) {
            std::cmp::Ordering::Less => Err(WireError::TruncatedPayload {
                offset: payload.len(),
                needed: header.payload_len() - payload.len(),
            }),
            std::cmp::Ordering::Greater => {
                Err(WireError::TrailingBytes(payload.len() - header.payload_len()))
            }
            std::cmp::Ordering::Equal => Self::from_parts(header, payload),
        }
    }

    /// Decodes the payload that followed `header`.
    pub fn from_parts(header: MessageHeader, payload: &[u8]) -> Result<Self, WireError> {
        Ok(Self {
            routing: header.routing(),
            body: WireBody::decode_payload(header.kind(), payload)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{SCOPE_NAME_CAPACITY, put_u16};
    use logging::Severity;

    fn snapshot(name: &str, priority: Priority) -> ScopeSnapshot {
        ScopeSnapshot {
            id: ScopeId::of(name),
            name: name.to_owned(),
            priority,
        }
    }

    fn round_trip(body: WireBody) -> WireMessage {
        let message = WireMessage::new(Routing::new(3, 5, 11), body);
        let bytes = message.encode().expect("encodes");
        let decoded = WireMessage::decode(&bytes).expect("decodes");
        assert_eq!(decoded, message);
        decoded
    }

    #[test]
    fn register_scopes_keeps_order() {
        let scopes = vec![
            snapshot("zeta", Priority::INFO),
            snapshot("alpha", Priority::DEBUG | Priority::SCOPE),
            snapshot("mid", Priority::UNSET),
        ];
        let decoded = round_trip(WireBody::RegisterScopes(scopes.clone()));
        assert_eq!(decoded.body, WireBody::RegisterScopes(scopes));
    }

    #[test]
    fn single_update_is_count_one() {
        let message = WireMessage::new(
            Routing::default(),
            WireBody::UpdateScopes(vec![ScopeUpdate::named("net_tcp", Priority::ERROR)]),
        );
        let bytes = message.encode().expect("encodes");
        assert_eq!(&bytes[HEADER_LEN..HEADER_LEN + 4], &1u32.to_le_bytes());
    }

    #[test]
    fn group_update_always_carries_sentinel() {
        let update = ScopeUpdate {
            name: "net_*".to_owned(),
            id: ScopeId::from_raw(42),
            priority: Priority::WARNING,
        };
        let decoded = round_trip_lossy(WireBody::UpdateScopes(vec![update]));
        let WireBody::UpdateScopes(updates) = decoded.body else {
            panic!("wrong body");
        };
        assert_eq!(updates[0].id, ScopeId::GROUP);
        assert_eq!(updates[0].name, "net_*");
    }

    fn round_trip_lossy(body: WireBody) -> WireMessage {
        let bytes = WireMessage::new(Routing::default(), body)
            .encode()
            .expect("encodes");
        WireMessage::decode(&bytes).expect("decodes")
    }

    #[test]
    fn scalar_and_empty_bodies_round_trip() {
        round_trip(WireBody::QueryScopes { target: 9 });
        round_trip(WireBody::QueryInstances { target: 0 });
        round_trip(WireBody::SaveConfiguration);
        round_trip(WireBody::ConfigurationSaved);
        round_trip(WireBody::ScopesUpdated(Vec::new()));
    }

    #[test]
    fn log_message_round_trips() {
        let record = LogRecord::text(ScopeId::of("app"), Severity::Error, "disk full");
        round_trip(WireBody::LogMessage(Box::new(record)));
    }

    #[test]
    fn oversized_names_are_truncated_not_overrun() {
        let mut payload = Vec::new();
        put_u32(&mut payload, 1);
        put_u32(&mut payload, 7);
        put_u32(&mut payload, Priority::INFO.bits());
        put_u16(&mut payload, 300);
        payload.extend(std::iter::repeat_n(b'q', 300));

        let body = WireBody::decode_payload(WireKind::RegisterScopes, &payload).expect("decodes");
        let WireBody::RegisterScopes(scopes) = body else {
            panic!("wrong body");
        };
        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes[0].name.len(), SCOPE_NAME_CAPACITY);
        assert_eq!(scopes[0].priority, Priority::INFO);
    }

    #[test]
    fn count_larger_than_entries_is_truncated_payload() {
        let mut payload = Vec::new();
        put_u32(&mut payload, 2);
        put_u32(&mut payload, 1);
        put_u32(&mut payload, 0);
        put_u16(&mut payload, 0);
        assert!(matches!(
            WireBody::decode_payload(WireKind::ScopesUpdated, &payload),
            Err(WireError::TruncatedPayload { .. })
        ));
    }

    #[test]
    fn extra_bytes_after_list_are_rejected() {
        let mut payload = Vec::new();
        put_u32(&mut payload, 0);
        payload.push(1);
        assert_eq!(
            WireBody::decode_payload(WireKind::UpdateScopes, &payload),
            Err(WireError::TrailingBytes(1))
        );
    }

    #[test]
    fn decode_checks_declared_length() {
        let bytes = WireMessage::new(Routing::default(), WireBody::QueryScopes { target: 1 })
            .encode()
            .expect("encodes");
        assert!(matches!(
            WireMessage::decode(&bytes[..bytes.len() - 1]),
            Err(WireError::TruncatedPayload { .. })
        ));
        let mut longer = bytes.clone();
        longer.push(0);
        assert_eq!(WireMessage::decode(&longer), Err(WireError::TrailingBytes(1)));
    }

    #[test]
    fn encode_into_appends() {
        let mut out = vec![0xEE];
        WireMessage::new(Routing::default(), WireBody::SaveConfiguration)
            .encode_into(&mut out)
            .expect("encodes");
        assert_eq!(out.len(), 1 + HEADER_LEN);
        assert_eq!(out[0], 0xEE);
    }
}
