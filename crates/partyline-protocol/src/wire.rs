//! Protobuf wire primitives: varints, tags, and length-delimited fields.
//!
//! Only the subset the envelopes need is implemented. Writers follow proto3
//! rules (zero values are omitted); the reader skips any field it doesn't
//! know so newer peers can add fields without breaking this client.

use bytes::{Buf, BufMut};

use crate::ProtocolError;

/// Longest legal varint: ten 7-bit groups cover 64 bits.
const MAX_VARINT_LEN: usize = 10;

/// The wire types a field tag can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WireType {
    Varint = 0,
    LengthDelimited = 2,
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

pub(crate) fn put_varint(buf: &mut impl BufMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

pub(crate) fn put_tag(buf: &mut impl BufMut, field: u32, wire_type: WireType) {
    put_varint(buf, (u64::from(field) << 3) | wire_type as u64);
}

/// Writes an `int64` field. Negative values are sign-extended to 64 bits
/// (ten bytes on the wire), exactly like protobuf's `int64`.
pub(crate) fn put_int64(buf: &mut impl BufMut, field: u32, value: i64) {
    if value != 0 {
        put_tag(buf, field, WireType::Varint);
        put_varint(buf, value as u64);
    }
}

/// Writes a `bytes` or `string` field, skipping it when empty.
pub(crate) fn put_bytes(buf: &mut impl BufMut, field: u32, value: &[u8]) {
    if !value.is_empty() {
        put_message(buf, field, value);
    }
}

/// Writes an embedded message. Always emitted, even when empty, because
/// presence is what selects a one-of variant.
pub(crate) fn put_message(buf: &mut impl BufMut, field: u32, encoded: &[u8]) {
    put_tag(buf, field, WireType::LengthDelimited);
    put_varint(buf, encoded.len() as u64);
    buf.put_slice(encoded);
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

fn get_varint(buf: &mut &[u8]) -> Result<u64, ProtocolError> {
    let mut value = 0u64;
    for index in 0..MAX_VARINT_LEN {
        if !buf.has_remaining() {
            return Err(ProtocolError::Truncated("varint"));
        }
        let byte = buf.get_u8();
        // The tenth byte may only contribute the top bit.
        if index == MAX_VARINT_LEN - 1 && byte > 1 {
            return Err(ProtocolError::VarintOverflow);
        }
        value |= u64::from(byte & 0x7F) << (7 * index);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(ProtocolError::VarintOverflow)
}

/// Walks the fields of one encoded message.
pub(crate) struct FieldReader<'a> {
    buf: &'a [u8],
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Reads the next tag. `Ok(None)` at the end of the message.
    pub(crate) fn next_field(
        &mut self,
    ) -> Result<Option<(u32, u8)>, ProtocolError> {
        if !self.buf.has_remaining() {
            return Ok(None);
        }
        let key = get_varint(&mut self.buf)?;
        let field = u32::try_from(key >> 3)
            .map_err(|_| ProtocolError::InvalidTag(key))?;
        if field == 0 {
            return Err(ProtocolError::InvalidTag(key));
        }
        Ok(Some((field, (key & 0x7) as u8)))
    }

    pub(crate) fn read_int64(
        &mut self,
        field: u32,
        wire_type: u8,
    ) -> Result<i64, ProtocolError> {
        expect_wire_type(field, wire_type, WireType::Varint)?;
        Ok(get_varint(&mut self.buf)? as i64)
    }

    /// Reads a length-delimited field and returns its raw contents.
    pub(crate) fn read_len(
        &mut self,
        field: u32,
        wire_type: u8,
    ) -> Result<&'a [u8], ProtocolError> {
        expect_wire_type(field, wire_type, WireType::LengthDelimited)?;
        let len = get_varint(&mut self.buf)?;
        let len = usize::try_from(len)
            .ok()
            .filter(|len| *len <= self.buf.len())
            .ok_or(ProtocolError::Truncated("length-delimited field"))?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    pub(crate) fn read_string(
        &mut self,
        field: u32,
        wire_type: u8,
        name: &'static str,
    ) -> Result<String, ProtocolError> {
        let raw = self.read_len(field, wire_type)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| ProtocolError::InvalidUtf8(name))
    }

    /// Skips a field this decoder doesn't know.
    pub(crate) fn skip(
        &mut self,
        field: u32,
        wire_type: u8,
    ) -> Result<(), ProtocolError> {
        let width = match wire_type {
            0 => {
                get_varint(&mut self.buf)?;
                return Ok(());
            }
            1 => 8,
            2 => {
                self.read_len(field, wire_type)?;
                return Ok(());
            }
            5 => 4,
            // 3 and 4 are the deprecated group markers.
            _ => return Err(ProtocolError::InvalidWireType { field, wire_type }),
        };
        if self.buf.remaining() < width {
            return Err(ProtocolError::Truncated("fixed-width field"));
        }
        self.buf.advance(width);
        Ok(())
    }

    /// Skips every remaining field, validating structure only.
    pub(crate) fn skip_all(mut self) -> Result<(), ProtocolError> {
        while let Some((field, wire_type)) = self.next_field()? {
            self.skip(field, wire_type)?;
        }
        Ok(())
    }
}

fn expect_wire_type(
    field: u32,
    actual: u8,
    expected: WireType,
) -> Result<(), ProtocolError> {
    if actual == expected as u8 {
        Ok(())
    } else {
        Err(ProtocolError::InvalidWireType {
            field,
            wire_type: actual,
        })
    }
}
