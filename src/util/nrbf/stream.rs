/*!
 A forward-only cursor over the raw bytes of a serialized stream.

 Reads the fixed-width little-endian primitives, the packed timestamps, and the length-prefixed strings
 that every other part of the decoder is built from.
*/

use crate::{
    error::nrbf::{DecodeError, NrbfError},
    util::{
        dates::{datetime_from_ticks, unpack_ticks},
        nrbf::models::{NetDateTime, Primitive, PrimitiveType},
    },
};

/// A length prefix never needs more than five 7-bit groups
const MAX_LENGTH_PREFIX_BYTES: usize = 5;
/// Set on every length prefix byte that is followed by another
const CONTINUATION_BIT: u8 = 0x80;
/// The fifth group only holds the top 3 bits of a 31-bit length
const LAST_GROUP_MAX: u8 = 0x07;

/// Contains the stream being read and the current position within it
#[derive(Debug)]
pub struct ByteStream<'a> {
    /// The bytes we want to decode
    stream: &'a [u8],
    /// The current index we are at in the stream
    idx: usize,
}

impl<'a> ByteStream<'a> {
    pub fn new(stream: &'a [u8]) -> Self {
        Self { stream, idx: 0 }
    }

    /// The offset of the next byte to be read
    pub fn position(&self) -> usize {
        self.idx
    }

    /// Whether every byte has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.idx >= self.stream.len()
    }

    /// Build an error located at the current position
    pub(crate) fn fail(&self, error: NrbfError) -> DecodeError {
        DecodeError::new(self.idx, error)
    }

    /// Read exactly `n` bytes from the stream
    pub fn read_exact_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let stream = self.stream;
        let start = self.idx;
        let range = start
            .checked_add(n)
            .and_then(|end| stream.get(start..end))
            .ok_or(DecodeError::new(start, NrbfError::UnexpectedEndOfStream))?;
        self.idx += n;
        Ok(range)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0; N];
        out.copy_from_slice(self.read_exact_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let [byte] = self.read_array()?;
        Ok(byte)
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read an [`i32`] that counts something, rejecting negative values
    pub fn read_count(&mut self) -> Result<usize, DecodeError> {
        let start = self.idx;
        let count = self.read_i32()?;
        usize::try_from(count)
            .map_err(|_| DecodeError::new(start, NrbfError::InvalidCount(i64::from(count))))
    }

    /// Read the 7-bit-group length prefix that precedes string data
    ///
    /// Each byte contributes its low 7 bits, least significant group first; a set high bit means another byte follows.
    /// The decoded length never exceeds 31 bits.
    pub fn read_length_prefix(&mut self) -> Result<usize, DecodeError> {
        let start = self.idx;
        let mut length = 0;
        for group in 0..MAX_LENGTH_PREFIX_BYTES {
            let byte = self.read_u8()?;
            if group == MAX_LENGTH_PREFIX_BYTES - 1 && byte > LAST_GROUP_MAX {
                break;
            }
            length |= usize::from(byte & !CONTINUATION_BIT) << (7 * group);
            if byte & CONTINUATION_BIT == 0 {
                return Ok(length);
            }
        }
        Err(DecodeError::new(start, NrbfError::InvalidStringLength))
    }

    /// Read a length-prefixed UTF-8 string
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let length = self.read_length_prefix()?;
        let start = self.idx;
        let bytes = self.read_exact_bytes(length)?;
        let string = std::str::from_utf8(bytes)
            .map_err(|why| DecodeError::new(start, NrbfError::InvalidStringEncoding(why)))?;
        Ok(string.to_string())
    }

    /// Read a one-byte primitive type tag
    pub fn read_primitive_type(&mut self) -> Result<PrimitiveType, DecodeError> {
        let start = self.idx;
        let byte = self.read_u8()?;
        PrimitiveType::from_byte(byte)
            .ok_or_else(|| DecodeError::new(start, NrbfError::UnknownPrimitiveType(byte)))
    }

    /// Read a single primitive value of the given type
    pub fn read_primitive(&mut self, kind: PrimitiveType) -> Result<Primitive, DecodeError> {
        Ok(match kind {
            PrimitiveType::Boolean => Primitive::Boolean(self.read_u8()? != 0),
            PrimitiveType::Byte => Primitive::Byte(self.read_u8()?),
            PrimitiveType::Int16 => Primitive::Int16(self.read_i16()?),
            PrimitiveType::Int32 => Primitive::Int32(self.read_i32()?),
            PrimitiveType::Int64 => Primitive::Int64(self.read_i64()?),
            PrimitiveType::UInt16 => Primitive::UInt16(self.read_u16()?),
            PrimitiveType::UInt32 => Primitive::UInt32(self.read_u32()?),
            PrimitiveType::UInt64 => Primitive::UInt64(self.read_u64()?),
            PrimitiveType::DateTime => Primitive::DateTime(self.read_datetime()?),
            PrimitiveType::Char
            | PrimitiveType::Decimal
            | PrimitiveType::Double
            | PrimitiveType::SByte
            | PrimitiveType::Single
            | PrimitiveType::TimeSpan
            | PrimitiveType::Null
            | PrimitiveType::String => {
                return Err(self.fail(NrbfError::UnsupportedPrimitiveType(kind)))
            }
        })
    }

    /// Read a packed timestamp; the kind bits are recorded but do not shift the value
    fn read_datetime(&mut self) -> Result<NetDateTime, DecodeError> {
        let start = self.idx;
        let raw = self.read_u64()?;
        let (kind, ticks) = unpack_ticks(raw);
        let value = datetime_from_ticks(ticks)
            .ok_or_else(|| DecodeError::new(start, NrbfError::InvalidDateTime(raw)))?;
        Ok(NetDateTime { ticks, kind, value })
    }
}
