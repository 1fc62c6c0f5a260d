//! Declared fields: what a record says about each of its members before compilation.

/// Storage width of an integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    pub fn bits(self) -> usize {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
        }
    }
}

/// Declared type of a field, independent of how it is laid out on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    Uint(IntWidth),
    Int(IntWidth),
    /// Raw byte block, fixed (with a length) or variable (with a decoder).
    Bytes,
    /// Like [FieldType::Bytes], stored as text.
    Text,
    /// Fixed-size byte array, filled by a custom decoder.
    Array(usize),
    /// Carries no data; used for padding and alignment markers.
    Unit,
    /// Another registered record embedded in place.
    Record(String),
    Float32,
    Float64,
}

impl FieldType {
    pub fn record(name: impl Into<String>) -> Self {
        FieldType::Record(name.into())
    }
}

/// Layout metadata attached to a field: the bit length and the decoder reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    /// Width in bits. Fixed byte blocks take a multiple of 8.
    pub len: Option<usize>,
    /// Name of a registered custom decoder.
    pub decoder: Option<String>,
}

impl Tag {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn len(len: usize) -> Self {
        Tag {
            len: Some(len),
            decoder: None,
        }
    }

    pub fn decoder(name: impl Into<String>) -> Self {
        Tag {
            len: None,
            decoder: Some(name.into()),
        }
    }
}

/// A single declared field of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Name used in decoded records and diagnostics.
    pub name: String,
    pub ty: FieldType,
    pub tag: Tag,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType, tag: Tag) -> Self {
        Field {
            name: name.into(),
            ty,
            tag,
        }
    }
}
