//! crates/protocol/src/payload.rs
//! Bounds-checked little-endian cursor over payload bytes, and the matching writers.

use std::borrow::Cow;

use logging::{GROUP_SUFFIX, is_group_name};

use crate::error::WireError;

/// Longest scope name carried in a list payload, in bytes.
pub const SCOPE_NAME_CAPACITY: usize = 128;

pub(crate) struct PayloadReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> PayloadReader<'a> {
    pub(crate) const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub(crate) const fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        if len > self.remaining() {
            return Err(WireError::TruncatedPayload {
                offset: self.offset,
                needed: len - self.remaining(),
            });
        }
        let chunk = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(chunk)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16, WireError> {
        self.array().map(u16::from_le_bytes)
    }

    pub(crate) fn u32(&mut self) -> Result<u32, WireError> {
        self.array().map(u32::from_le_bytes)
    }

    pub(crate) fn u64(&mut self) -> Result<u64, WireError> {
        self.array().map(u64::from_le_bytes)
    }

    /// Reads a `u16`-prefixed name, consuming all declared bytes but keeping
    /// at most [`SCOPE_NAME_CAPACITY`] of them.
    pub(crate) fn name(&mut self) -> Result<String, WireError> {
        let len = usize::from(self.u16()?);
        let bytes = self.take(len)?;
        Ok(clamp_name(valid_prefix(bytes)).into_owned())
    }

    /// Reads a `u32` element count, rejecting counts the remaining bytes cannot hold.
    pub(crate) fn count(&mut self, min_entry_len: usize) -> Result<usize, WireError> {
        let count = self.u32()? as usize;
        let needed = count.saturating_mul(min_entry_len);
        if needed > self.remaining() {
            return Err(WireError::TruncatedPayload {
                offset: self.offset,
                needed: needed - self.remaining(),
            });
        }
        Ok(count)
    }

    pub(crate) fn finish(self) -> Result<(), WireError> {
        match self.remaining() {
            0 => Ok(()),
            trailing => Err(WireError::TrailingBytes(trailing)),
        }
    }
}

pub(crate) fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn put_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Writes `name` with a `u16` length prefix, clamped by [`clamp_name`].
pub(crate) fn put_name(out: &mut Vec<u8>, name: &str) {
    let name = clamp_name(name);
    put_u16(out, name.len() as u16);
    out.extend_from_slice(name.as_bytes());
}

/// Cuts `name` to [`SCOPE_NAME_CAPACITY`] bytes at a character boundary.
///
/// A group name keeps its trailing [`GROUP_SUFFIX`], so a clamped group still
/// addresses every scope sharing the shortened prefix.
pub(crate) fn clamp_name(name: &str) -> Cow<'_, str> {
    if name.len() <= SCOPE_NAME_CAPACITY {
        return Cow::Borrowed(name);
    }
    if !is_group_name(name) {
        return Cow::Borrowed(char_prefix(name, SCOPE_NAME_CAPACITY));
    }
    let prefix = char_prefix(name, SCOPE_NAME_CAPACITY - GROUP_SUFFIX.len_utf8());
    let mut clamped = String::with_capacity(SCOPE_NAME_CAPACITY);
    clamped.push_str(prefix);
    clamped.push(GROUP_SUFFIX);
    Cow::Owned(clamped)
}

fn char_prefix(name: &str, max: usize) -> &str {
    let mut len = name.len().min(max);
    while !name.is_char_boundary(len) {
        len -= 1;
    }
    &name[..len]
}

/// Longest valid UTF-8 prefix of `bytes`.
pub(crate) fn valid_prefix(bytes: &[u8]) -> &str {
    match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => std::str::from_utf8(&bytes[..err.valid_up_to()]).unwrap_or_default(),
    }
}
