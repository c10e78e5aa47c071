/*!
 Errors that can happen when decoding binary-serialized object graph data.
*/

use std::{
    error,
    fmt::{Display, Formatter, Result},
    str::Utf8Error,
};

use crate::util::nrbf::models::{ObjectId, PrimitiveType, Record, RecordType};

/// Errors that can happen when decoding a record stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NrbfError {
    /// The leading tag byte does not name any record kind
    UnknownRecordType(u8),
    /// A primitive type byte does not name any primitive kind
    UnknownPrimitiveType(u8),
    /// A member type byte does not name any binary type
    UnknownBinaryType(u8),
    /// An array kind byte does not name any array shape
    UnknownArrayType(u8),
    UnsupportedPrimitiveType(PrimitiveType),
    UnsupportedRecordType(RecordType),
    /// No known-layout rule matches the named class or member
    UnknownLayout(String),
    UnresolvedReference(ObjectId),
    NotAClassTemplate(ObjectId),
    DuplicateObjectId(ObjectId),
    InvalidStringEncoding(Utf8Error),
    InvalidStringLength,
    InvalidCount(i64),
    /// Expected logical element count, logical positions actually consumed
    ArrayLengthMismatch(usize, usize),
    InvalidDateTime(u64),
    UnexpectedEndOfStream,
    GraphTooDeep(usize),
}

impl Display for NrbfError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            NrbfError::UnknownRecordType(tag) => write!(fmt, "Unknown record type {tag:#04x}"),
            NrbfError::UnknownPrimitiveType(byte) => {
                write!(fmt, "Unknown primitive type {byte:#04x}")
            }
            NrbfError::UnknownBinaryType(byte) => write!(fmt, "Unknown binary type {byte:#04x}"),
            NrbfError::UnknownArrayType(byte) => write!(fmt, "Unknown array type {byte:#04x}"),
            NrbfError::UnsupportedPrimitiveType(kind) => {
                write!(fmt, "Cannot read primitives of type {kind:?}")
            }
            NrbfError::UnsupportedRecordType(kind) => {
                write!(fmt, "Cannot read records of type {kind:?}")
            }
            NrbfError::UnknownLayout(name) => write!(fmt, "No known layout for {name}"),
            NrbfError::UnresolvedReference(id) => {
                write!(fmt, "Object {id} is referenced but never defined")
            }
            NrbfError::NotAClassTemplate(id) => {
                write!(fmt, "Object {id} does not describe a class layout")
            }
            NrbfError::DuplicateObjectId(id) => write!(fmt, "Object {id} is defined twice"),
            NrbfError::InvalidStringEncoding(why) => write!(fmt, "Failed to parse string: {why}"),
            NrbfError::InvalidStringLength => write!(fmt, "String length prefix is too long"),
            NrbfError::InvalidCount(count) => write!(fmt, "Invalid element count {count}"),
            NrbfError::ArrayLengthMismatch(expected, got) => {
                write!(fmt, "Array declares {expected} elements but encodes {got}")
            }
            NrbfError::InvalidDateTime(raw) => write!(fmt, "DateTime {raw:#018x} is out of range"),
            NrbfError::UnexpectedEndOfStream => write!(fmt, "Stream ended inside a record"),
            NrbfError::GraphTooDeep(max) => {
                write!(fmt, "Object graph is nested deeper than {max} records")
            }
        }
    }
}

impl error::Error for NrbfError {}

/// An [`NrbfError`] along with the byte offset at which it was detected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub offset: usize,
    pub error: NrbfError,
}

impl DecodeError {
    pub fn new(offset: usize, error: NrbfError) -> Self {
        Self { offset, error }
    }
}

impl Display for DecodeError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        write!(fmt, "{} at offset {:#x}", self.error, self.offset)
    }
}

impl error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.error)
    }
}

/// The result of a decode that stopped at its first error
///
/// Holds every top-level record decoded before the failure so callers can inspect the valid prefix.
#[derive(Debug)]
pub struct PartialDecode {
    pub records: Vec<Record>,
    pub error: DecodeError,
}

impl Display for PartialDecode {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        write!(
            fmt,
            "{} after {} complete records",
            self.error,
            self.records.len()
        )
    }
}

impl error::Error for PartialDecode {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.error)
    }
}
