//! Storage for fields that a message does not recognize.
//!
//! Fields are kept as their raw wire encoding (key followed by value) in
//! the order they were read, so that re-encoding the message emits them
//! unchanged. Varints are copied byte for byte, padding included.

use bytes::{Buf, BufMut};
use prost::{
    encoding::{encode_key, WireType},
    DecodeError,
};
use tracing::debug;

/// Groups may nest; bound the depth the same way prost bounds messages.
const RECURSION_LIMIT: u32 = 100;

const MAX_VARINT_LEN: usize = 10;

/// The raw bytes of unrecognized fields.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct UnknownFields(Vec<u8>);

// === impl UnknownFields ===

impl UnknownFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the value of one field from `buf`, appending it to the set
    /// after `key`, the field's key bytes as they appeared on the wire.
    ///
    /// On error nothing is appended, though `buf` may have been partially
    /// consumed.
    pub fn capture<B: Buf>(
        &mut self,
        key: &[u8],
        tag: u32,
        wire_type: WireType,
        buf: &mut B,
    ) -> Result<(), DecodeError> {
        let start = self.0.len();
        self.0.extend_from_slice(key);
        if let Err(error) = copy_value(tag, wire_type, buf, &mut self.0, RECURSION_LIMIT) {
            self.0.truncate(start);
            return Err(error);
        }
        debug!(tag, ?wire_type, bytes = self.0.len() - start, "Captured unknown field");
        Ok(())
    }

    /// Like [`UnknownFields::capture`], for a field whose key bytes are no
    /// longer available. The key is written in its shortest form.
    pub fn capture_decoded<B: Buf>(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut B,
    ) -> Result<(), DecodeError> {
        let mut key = Vec::with_capacity(MAX_VARINT_LEN);
        encode_key(tag, wire_type, &mut key);
        self.capture(&key, tag, wire_type, buf)
    }

    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.0);
    }

    pub fn encoded_len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Appends the fields of `other` after the fields already held.
    pub fn extend(&mut self, other: &Self) {
        self.0.extend_from_slice(&other.0);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl std::fmt::Debug for UnknownFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("UnknownFields").field(&self.0.len()).finish()
    }
}

/// Reads a field key, appending its bytes to `raw` exactly as they appear
/// in `buf`.
///
/// Accepts and rejects the same keys as `prost::encoding::decode_key`.
pub fn read_key<B: Buf>(buf: &mut B, raw: &mut Vec<u8>) -> Result<(u32, WireType), DecodeError> {
    let key = copy_varint(buf, raw)?;
    if key > u64::from(u32::MAX) {
        return Err(DecodeError::new(format!("invalid key value: {key}")));
    }
    let wire_type = match key & 0x07 {
        0 => WireType::Varint,
        1 => WireType::SixtyFourBit,
        2 => WireType::LengthDelimited,
        3 => WireType::StartGroup,
        4 => WireType::EndGroup,
        5 => WireType::ThirtyTwoBit,
        value => {
            return Err(DecodeError::new(format!(
                "invalid wire type value: {value}"
            )))
        }
    };
    let tag = key as u32 >> 3;
    if tag == 0 {
        return Err(DecodeError::new("invalid tag value: 0"));
    }
    Ok((tag, wire_type))
}

/// Copies a varint byte for byte, returning its value.
///
/// Padded encodings are kept as they are; a tenth byte may only carry the
/// top bit of a `u64`.
fn copy_varint<B: Buf>(buf: &mut B, out: &mut Vec<u8>) -> Result<u64, DecodeError> {
    let mut value = 0u64;
    for count in 0..MAX_VARINT_LEN {
        if !buf.has_remaining() {
            break;
        }
        let byte = buf.get_u8();
        out.push(byte);
        value |= u64::from(byte & 0x7f) << (count * 7);
        if byte < 0x80 {
            if count == MAX_VARINT_LEN - 1 && byte >= 2 {
                break;
            }
            return Ok(value);
        }
    }
    Err(DecodeError::new("invalid varint"))
}

/// Copies the value of a field whose key has already been copied.
fn copy_value<B: Buf>(
    tag: u32,
    wire_type: WireType,
    buf: &mut B,
    out: &mut Vec<u8>,
    depth: u32,
) -> Result<(), DecodeError> {
    match wire_type {
        WireType::Varint => {
            copy_varint(buf, out)?;
        }
        WireType::SixtyFourBit => copy_bytes(8, buf, out)?,
        WireType::ThirtyTwoBit => copy_bytes(4, buf, out)?,
        WireType::LengthDelimited => {
            let len = copy_varint(buf, out)?;
            if len > buf.remaining() as u64 {
                return Err(DecodeError::new("buffer underflow"));
            }
            copy_bytes(len as usize, buf, out)?;
        }
        WireType::StartGroup => {
            if depth == 0 {
                return Err(DecodeError::new("recursion limit reached"));
            }
            loop {
                let (inner_tag, inner_wire_type) = read_key(buf, out)?;
                if inner_wire_type == WireType::EndGroup {
                    if inner_tag != tag {
                        return Err(DecodeError::new("unexpected end group tag"));
                    }
                    break;
                }
                copy_value(inner_tag, inner_wire_type, buf, out, depth - 1)?;
            }
        }
        WireType::EndGroup => return Err(DecodeError::new("unexpected end group tag")),
    }
    Ok(())
}

fn copy_bytes<B: Buf>(len: usize, buf: &mut B, out: &mut Vec<u8>) -> Result<(), DecodeError> {
    if buf.remaining() < len {
        return Err(DecodeError::new("buffer underflow"));
    }
    out.extend_from_slice(&buf.copy_to_bytes(len));
    Ok(())
}
