//! Error types for schema registration, bit reading, custom codecs and decoding.

use thiserror::Error;

use crate::field::FieldType;

/// Errors produced by the bit extraction primitives in [crate::bits].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// The read touches a byte at or past the end of the buffer.
    #[error("byte {byte_index} is out of range for a {len}-byte buffer")]
    OutOfRange { byte_index: usize, len: usize },
    /// More than one chunk (8 bits) was requested in a single read.
    #[error("cannot read {0} bits in a single chunk")]
    TooManyBits(usize),
}

/// Problems with a record declaration, reported per field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A nested record field refers to a record that is not registered yet.
    #[error("{nested} needs to be registered before {record} (field {field})")]
    UnregisteredRecord {
        record: String,
        field: String,
        nested: String,
    },
    /// A field refers to a custom decoder that is not registered yet.
    #[error("decoder {decoder} needs to be registered before {record} (field {field})")]
    UnregisteredDecoder {
        record: String,
        field: String,
        decoder: String,
    },
    /// A variable-length field names no decoder.
    #[error("{record}.{field} has neither a length nor a decoder")]
    MissingDecoder { record: String, field: String },
    /// A bit-sized field declares no length.
    #[error("{record}.{field} needs a declared length")]
    MissingLength { record: String, field: String },
    /// The declared length does not fit the field's type.
    #[error("{record}.{field} has invalid length {len} (allowed 1..={max})")]
    InvalidLength {
        record: String,
        field: String,
        len: usize,
        max: usize,
    },
    /// A byte block length (in bits) that is not a whole number of bytes.
    #[error("{record}.{field} has length {len}, which is not a whole number of bytes")]
    PartialBytes {
        record: String,
        field: String,
        len: usize,
    },
    /// The field's type cannot be decoded.
    #[error("{record}.{field} ({kind:?}) is ignored")]
    UnsupportedKind {
        record: String,
        field: String,
        kind: FieldType,
    },
    /// A nested field names a registered decoder rather than a record.
    #[error("{nested} is not a record (field {record}.{field})")]
    NotARecord {
        record: String,
        field: String,
        nested: String,
    },
}

impl SchemaError {
    /// Name of the record whose declaration failed.
    pub fn record(&self) -> &str {
        match self {
            SchemaError::UnregisteredRecord { record, .. }
            | SchemaError::UnregisteredDecoder { record, .. }
            | SchemaError::MissingDecoder { record, .. }
            | SchemaError::MissingLength { record, .. }
            | SchemaError::InvalidLength { record, .. }
            | SchemaError::PartialBytes { record, .. }
            | SchemaError::UnsupportedKind { record, .. }
            | SchemaError::NotARecord { record, .. } => record,
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            SchemaError::UnregisteredRecord { field, .. }
            | SchemaError::UnregisteredDecoder { field, .. }
            | SchemaError::MissingDecoder { field, .. }
            | SchemaError::MissingLength { field, .. }
            | SchemaError::InvalidLength { field, .. }
            | SchemaError::PartialBytes { field, .. }
            | SchemaError::UnsupportedKind { field, .. }
            | SchemaError::NotARecord { field, .. } => field,
        }
    }
}

/// Failures reported by custom decoders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The encoded value runs past the end of the buffer.
    #[error("encoded value starting at {start} is truncated at byte {at}")]
    Truncated { start: usize, at: usize },
    /// A length byte uses the reserved `01`/`10` label types.
    #[error("reserved label type 0x{byte:02x} at byte {at}")]
    ReservedLabelType { byte: u8, at: usize },
    /// A compression pointer does not point strictly before the labels it ends.
    #[error("compression pointer at byte {at} targets {target}, which is not before its name")]
    ForwardPointer { at: usize, target: usize },
    /// Failure raised by an application decoder.
    #[error("{0}")]
    Custom(String),
}

/// Failures converting a decoded [crate::value::Value] into a destination field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("expected {expected} value, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("destination has no field at index {0}")]
    NoSuchField(usize),
    #[error("decoded bytes are not valid UTF-8")]
    InvalidUtf8,
    #[error("expected {expected} bytes, decoded {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("value {0} does not fit the destination field")]
    OutOfRange(i128),
}

/// Errors aborting a decode call. Field-level variants carry the dotted path
/// of the first failing field (`question.qname`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The destination's record type is not in the registry.
    #[error("{0} needs to be registered")]
    NotRegistered(String),
    /// The name is registered, but as a decoder.
    #[error("{0} is registered as a decoder, not a record")]
    NotARecord(String),
    /// The buffer ends before the field's bits.
    #[error("buffer too short for {field}: byte {byte_index} of {len}")]
    TruncatedBuffer {
        field: String,
        byte_index: usize,
        len: usize,
    },
    /// Any other bit extraction failure.
    #[error("cannot read {field}: {source}")]
    Read {
        field: String,
        #[source]
        source: ReadError,
    },
    /// A byte-oriented field does not start on a byte boundary.
    #[error("{field} must start on a byte boundary (bit {bit_index})")]
    Misaligned { field: String, bit_index: usize },
    /// A custom decoder failed.
    #[error("decoder failed for {field}: {source}")]
    Codec {
        field: String,
        #[source]
        source: CodecError,
    },
    /// The destination rejected the decoded value.
    #[error("cannot store {field}: {source}")]
    Destination {
        field: String,
        #[source]
        source: ValueError,
    },
}

impl DecodeError {
    pub(crate) fn from_read(field: &str, err: ReadError) -> Self {
        match err {
            ReadError::OutOfRange { byte_index, len } => DecodeError::TruncatedBuffer {
                field: field.to_string(),
                byte_index,
                len,
            },
            other => DecodeError::Read {
                field: field.to_string(),
                source: other,
            },
        }
    }

    /// Dotted path of the failing field, if the error is field-level.
    pub fn field(&self) -> Option<&str> {
        match self {
            DecodeError::NotRegistered(_) | DecodeError::NotARecord(_) => None,
            DecodeError::TruncatedBuffer { field, .. }
            | DecodeError::Read { field, .. }
            | DecodeError::Misaligned { field, .. }
            | DecodeError::Codec { field, .. }
            | DecodeError::Destination { field, .. } => Some(field),
        }
    }
}
