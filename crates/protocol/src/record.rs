//! crates/protocol/src/record.rs
//! Fixed-layout wire form of [`LogRecord`].
//!
//! Every field sits at a fixed offset, text buffers included, so the record
//! always occupies [`RECORD_WIRE_LEN`] bytes. Declared text lengths larger
//! than the buffer behind them are clamped on decode.

use logging::{
    BoundedText, DataOrigin, LogRecord, MESSAGE_CAPACITY, MODULE_NAME_CAPACITY, MessageKind,
    Priority, ScopeId, THREAD_NAME_CAPACITY,
};

use crate::error::WireError;
use crate::payload::{PayloadReader, put_u16, put_u32, put_u64};

/// Bytes preceding the text buffers.
const FIXED_FIELDS_LEN: usize = 76;

/// Encoded size of one record.
pub const RECORD_WIRE_LEN: usize =
    FIXED_FIELDS_LEN + MESSAGE_CAPACITY + THREAD_NAME_CAPACITY + MODULE_NAME_CAPACITY;

/// Appends the wire form of `record` to `out`.
///
/// Thread and module names are only carried for remote-origin records; for
/// local records both lengths are written as zero.
pub fn encode_record(record: &LogRecord, out: &mut Vec<u8>) {
    out.reserve(RECORD_WIRE_LEN);
    let carries_names = record.data_origin == DataOrigin::Remote;
    let name_len = |len: usize| if carries_names { len as u16 } else { 0 };

    out.push(record.data_origin as u8);
    out.push(record.message_kind as u8);
    put_u16(out, 0);
    put_u32(out, record.priority.bits());
    put_u32(out, record.source_id);
    put_u32(out, record.target_id);
    put_u64(out, record.connection_cookie);
    put_u32(out, record.process_id);
    put_u64(out, record.thread_id);
    put_u64(out, record.timestamp);
    put_u64(out, record.received_timestamp);
    put_u64(out, record.duration);
    put_u32(out, record.scope_id.as_u32());
    put_u32(out, record.session_id);
    put_u16(out, record.message.len() as u16);
    put_u16(out, name_len(record.thread_name.len()));
    put_u16(out, name_len(record.module_name.len()));
    put_u16(out, 0);

    out.extend_from_slice(record.message.raw());
    if carries_names {
        out.extend_from_slice(record.thread_name.raw());
        out.extend_from_slice(record.module_name.raw());
    } else {
        out.resize(out.len() + THREAD_NAME_CAPACITY + MODULE_NAME_CAPACITY, 0);
    }
}

pub(crate) fn decode_record(reader: &mut PayloadReader<'_>) -> Result<LogRecord, WireError> {
    let origin = reader.u8()?;
    let data_origin = DataOrigin::from_u8(origin).ok_or(WireError::InvalidField {
        field: "data_origin",
        value: u64::from(origin),
    })?;
    let kind = reader.u8()?;
    let message_kind = MessageKind::from_u8(kind).ok_or(WireError::InvalidField {
        field: "message_kind",
        value: u64::from(kind),
    })?;
    let _reserved = reader.u16()?;

    let mut record = LogRecord {
        data_origin,
        message_kind,
        priority: Priority::from_bits(reader.u32()?),
        source_id: reader.u32()?,
        target_id: reader.u32()?,
        connection_cookie: reader.u64()?,
        process_id: reader.u32()?,
        thread_id: reader.u64()?,
        timestamp: reader.u64()?,
        received_timestamp: reader.u64()?,
        duration: reader.u64()?,
        scope_id: ScopeId::from_raw(reader.u32()?),
        session_id: reader.u32()?,
        ..LogRecord::default()
    };

    let message_len = usize::from(reader.u16()?);
    let thread_len = usize::from(reader.u16()?);
    let module_len = usize::from(reader.u16()?);
    let _reserved = reader.u16()?;

    record.message = bounded(reader.take(MESSAGE_CAPACITY)?, message_len);
    let thread = reader.take(THREAD_NAME_CAPACITY)?;
    let module = reader.take(MODULE_NAME_CAPACITY)?;
    if data_origin == DataOrigin::Remote {
        record.thread_name = bounded(thread, thread_len);
        record.module_name = bounded(module, module_len);
    }
    Ok(record)
}

fn bounded<const N: usize>(buffer: &[u8], declared: usize) -> BoundedText<N> {
    BoundedText::from_bytes(&buffer[..declared.min(buffer.len())])
}
