//! Encoding and decoding of the envelope messages.
//!
//! [`WireMessage`] is implemented for both envelopes and every message they
//! carry. Callers normally only touch the envelopes:
//!
//! ```rust
//! use partyline_protocol::{C2s, Join, MemberId, PartyId, WireMessage};
//!
//! let join = C2s::Join(Join {
//!     party_id: PartyId(1),
//!     member_id: MemberId(-2),
//! });
//! let bytes = join.encode().unwrap();
//! assert_eq!(C2s::decode(&bytes).unwrap(), join);
//! ```

use bytes::{Bytes, BytesMut};

use crate::wire::{self, FieldReader};
use crate::{
    C2s, Data, Join, MemberId, PartyData, PartyId, ProtocolError, S2c,
    UserJoin, UserPart,
};

/// A message with a protobuf wire representation.
pub trait WireMessage: Sized {
    /// Appends this message's fields to `buf`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::NoMessageSet`] for an `Unset` envelope.
    fn encode_to(&self, buf: &mut BytesMut) -> Result<(), ProtocolError>;

    /// Parses a message from its encoded fields.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the bytes are structurally invalid.
    fn decode(data: &[u8]) -> Result<Self, ProtocolError>;

    /// Encodes this message into a fresh buffer.
    fn encode(&self) -> Result<Bytes, ProtocolError> {
        let mut buf = BytesMut::new();
        self.encode_to(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// Encodes `message` and writes it as embedded field `field` of `buf`.
fn put_embedded<M: WireMessage>(
    buf: &mut BytesMut,
    field: u32,
    message: &M,
) -> Result<(), ProtocolError> {
    let inner = message.encode()?;
    wire::put_message(buf, field, &inner);
    Ok(())
}

// ---------------------------------------------------------------------------
// Inner messages
// ---------------------------------------------------------------------------

/// `Join`, `UserJoin` and `UserPart` share one layout: two `int64` ids at
/// tags 1 and 2.
fn encode_ids(buf: &mut BytesMut, party_id: PartyId, member_id: MemberId) {
    wire::put_int64(buf, 1, party_id.0);
    wire::put_int64(buf, 2, member_id.0);
}

fn decode_ids(data: &[u8]) -> Result<(PartyId, MemberId), ProtocolError> {
    let mut party_id = 0;
    let mut member_id = 0;
    let mut reader = FieldReader::new(data);
    while let Some((field, wire_type)) = reader.next_field()? {
        match field {
            1 => party_id = reader.read_int64(field, wire_type)?,
            2 => member_id = reader.read_int64(field, wire_type)?,
            _ => reader.skip(field, wire_type)?,
        }
    }
    Ok((PartyId(party_id), MemberId(member_id)))
}

impl WireMessage for Join {
    fn encode_to(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        encode_ids(buf, self.party_id, self.member_id);
        Ok(())
    }

    fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let (party_id, member_id) = decode_ids(data)?;
        Ok(Self {
            party_id,
            member_id,
        })
    }
}

impl WireMessage for UserJoin {
    fn encode_to(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        encode_ids(buf, self.party_id, self.member_id);
        Ok(())
    }

    fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let (party_id, member_id) = decode_ids(data)?;
        Ok(Self {
            party_id,
            member_id,
        })
    }
}

impl WireMessage for UserPart {
    fn encode_to(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        encode_ids(buf, self.party_id, self.member_id);
        Ok(())
    }

    fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let (party_id, member_id) = decode_ids(data)?;
        Ok(Self {
            party_id,
            member_id,
        })
    }
}

impl WireMessage for Data {
    fn encode_to(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        wire::put_bytes(buf, 1, &self.body);
        wire::put_bytes(buf, 2, self.type_name.as_bytes());
        Ok(())
    }

    fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut body = Bytes::new();
        let mut type_name = String::new();
        let mut reader = FieldReader::new(data);
        while let Some((field, wire_type)) = reader.next_field()? {
            match field {
                1 => {
                    body =
                        Bytes::copy_from_slice(reader.read_len(field, wire_type)?)
                }
                2 => type_name = reader.read_string(field, wire_type, "type")?,
                _ => reader.skip(field, wire_type)?,
            }
        }
        Ok(Self { type_name, body })
    }
}

impl WireMessage for PartyData {
    fn encode_to(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        encode_ids(buf, self.party_id, self.member_id);
        wire::put_bytes(buf, 3, &self.body);
        wire::put_bytes(buf, 4, self.type_name.as_bytes());
        Ok(())
    }

    fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut party_id = 0;
        let mut member_id = 0;
        let mut body = Bytes::new();
        let mut type_name = String::new();
        let mut reader = FieldReader::new(data);
        while let Some((field, wire_type)) = reader.next_field()? {
            match field {
                1 => party_id = reader.read_int64(field, wire_type)?,
                2 => member_id = reader.read_int64(field, wire_type)?,
                3 => {
                    body =
                        Bytes::copy_from_slice(reader.read_len(field, wire_type)?)
                }
                4 => type_name = reader.read_string(field, wire_type, "type")?,
                _ => reader.skip(field, wire_type)?,
            }
        }
        Ok(Self {
            party_id: PartyId(party_id),
            member_id: MemberId(member_id),
            type_name,
            body,
        })
    }
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

impl WireMessage for C2s {
    fn encode_to(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        match self {
            Self::Join(join) => put_embedded(buf, 1, join),
            Self::Part => {
                wire::put_message(buf, 2, &[]);
                Ok(())
            }
            Self::Data(data) => put_embedded(buf, 3, data),
            Self::Unset => Err(ProtocolError::NoMessageSet),
        }
    }

    /// Decodes a client envelope. If the one-of field appears more than
    /// once, the last occurrence wins.
    fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut message = Self::Unset;
        let mut reader = FieldReader::new(data);
        while let Some((field, wire_type)) = reader.next_field()? {
            match field {
                1 => {
                    message =
                        Self::Join(Join::decode(reader.read_len(field, wire_type)?)?)
                }
                2 => {
                    FieldReader::new(reader.read_len(field, wire_type)?)
                        .skip_all()?;
                    message = Self::Part;
                }
                3 => {
                    message =
                        Self::Data(Data::decode(reader.read_len(field, wire_type)?)?)
                }
                _ => reader.skip(field, wire_type)?,
            }
        }
        Ok(message)
    }
}

impl WireMessage for S2c {
    fn encode_to(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        match self {
            Self::UserJoin(join) => put_embedded(buf, 1, join),
            Self::UserPart(part) => put_embedded(buf, 2, part),
            Self::PartyData(data) => put_embedded(buf, 3, data),
            Self::Unset => Err(ProtocolError::NoMessageSet),
        }
    }

    fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut message = Self::Unset;
        let mut reader = FieldReader::new(data);
        while let Some((field, wire_type)) = reader.next_field()? {
            let payload = match field {
                1 | 2 | 3 => reader.read_len(field, wire_type)?,
                _ => {
                    reader.skip(field, wire_type)?;
                    continue;
                }
            };
            message = match field {
                1 => Self::UserJoin(UserJoin::decode(payload)?),
                2 => Self::UserPart(UserPart::decode(payload)?),
                _ => Self::PartyData(PartyData::decode(payload)?),
            };
        }
        Ok(message)
    }
}
