//! Deterministic binary encoding primitives shared by the Wormhole VAA model and the
//! self-describing structured record format used for application state.
//!
//! Everything in this crate is pure and synchronous: encoding the same value twice
//! always produces byte-identical output, which matters because most of what gets
//! encoded here ends up hashed and signed. All multi-byte integers are big-endian.
//!
//! The crate is split in three layers:
//!
//! - Free functions and the [`Writer`]/[`Reader`] pair for fixed-width primitives.
//! - [`schema`] for the recursively-encoded record descriptors.
//! - [`value`] for packing and unpacking records against (or alongside) a schema.

mod error;
pub mod schema;
pub mod value;

pub use error::CodecError;
pub use schema::{FieldType, Schema, TypeTag};
pub use value::{hash_record, pack_data, unpack_data, Record, Value};

/// Byte-size fields (field counts, name lengths, array lengths, sized-type sizes) are
/// capped below 128 to leave headroom for a future varint encoding.
pub const MAX_COUNT: usize = 128;

/// Encode `value` as a big-endian unsigned integer of exactly `width` bytes.
///
/// Fails if `width` is not in `1..=8` or if the value does not fit.
pub fn encode_uint(value: u64, width: usize) -> Result<Vec<u8>, CodecError> {
    if width == 0 || width > 8 {
        return Err(CodecError::InvalidWidth(width));
    }
    if width < 8 && value >> (8 * width) != 0 {
        return Err(CodecError::ValueOutOfRange { value, width });
    }
    Ok(value.to_be_bytes()[8 - width..].to_vec())
}

/// Decode a big-endian unsigned integer of exactly `width` bytes. Exact inverse of
/// [`encode_uint`]; fails if fewer than `width` bytes are supplied.
pub fn decode_uint(data: &[u8], width: usize) -> Result<u64, CodecError> {
    if width == 0 || width > 8 {
        return Err(CodecError::InvalidWidth(width));
    }
    if data.len() < width {
        return Err(CodecError::UnexpectedEnd {
            offset: data.len(),
            needed: width - data.len(),
        });
    }
    let mut out = 0u64;
    for b in &data[..width] {
        out = (out << 8) | u64::from(*b);
    }
    Ok(out)
}

/// Append-only byte buffer with typed big-endian writers.
#[derive(Debug, Default, Clone)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over an immutable byte slice with typed big-endian readers.
///
/// Every read reports how far the cursor got when the input runs short, and
/// [`Reader::finish`] turns unconsumed trailing bytes into an error so decoders never
/// silently accept extra data.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEnd {
                offset: self.offset,
                needed: n - self.remaining(),
            });
        }
        let out = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(out)
    }

    /// Consume the rest of the input.
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.offset..];
        self.offset = self.data.len();
        out
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        let b = self.take(8)?;
        let mut out = [0u8; 8];
        out.copy_from_slice(b);
        Ok(u64::from_be_bytes(out))
    }

    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let b = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(b);
        Ok(out)
    }

    /// Fails with a consumed/length mismatch if any input is left.
    pub fn finish(self) -> Result<(), CodecError> {
        if self.offset != self.data.len() {
            return Err(CodecError::TrailingBytes {
                consumed: self.offset,
                len: self.data.len(),
            });
        }
        Ok(())
    }
}
