//! Record declarations: an ordered list of [Field]s under a type name.

use crate::field::{Field, FieldType, IntWidth, Tag};

/// Declaration of a record type, built programmatically, by [crate::bit_record!]
/// or from a JSON schema file.
///
/// ```
/// use bitschema::record::RecordDef;
///
/// let flags = RecordDef::new("flags")
///     .padding(4)
///     .uint("kind", 4)
///     .flag("urgent")
///     .marker();
/// assert_eq!(flags.fields.len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDef {
    pub name: String,
    pub fields: Vec<Field>,
}

impl RecordDef {
    pub fn new(name: impl Into<String>) -> Self {
        RecordDef {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// One-bit boolean flag.
    pub fn flag(self, name: &str) -> Self {
        self.field(Field::new(name, FieldType::Bool, Tag::len(1)))
    }

    /// Unsigned integer stored in the narrowest width that holds `bits`.
    pub fn uint(self, name: &str, bits: usize) -> Self {
        self.field(Field::new(name, FieldType::Uint(width_for(bits)), Tag::len(bits)))
    }

    /// Signed integer stored in the narrowest width that holds `bits`.
    pub fn int(self, name: &str, bits: usize) -> Self {
        self.field(Field::new(name, FieldType::Int(width_for(bits)), Tag::len(bits)))
    }

    /// Fixed block of `bits / 8` bytes; `bits` must be a multiple of 8.
    pub fn bytes(self, name: &str, bits: usize) -> Self {
        self.field(Field::new(name, FieldType::Bytes, Tag::len(bits)))
    }

    /// Variable-length bytes produced by the named decoder.
    pub fn decoded(self, name: &str, decoder: &str) -> Self {
        self.field(Field::new(name, FieldType::Bytes, Tag::decoder(decoder)))
    }

    /// Embeds the registered record `record`.
    pub fn nested(self, name: &str, record: &str) -> Self {
        self.field(Field::new(name, FieldType::record(record), Tag::none()))
    }

    /// Skips `bits` bits.
    pub fn padding(self, bits: usize) -> Self {
        let name = format!("_{}", self.fields.len());
        self.field(Field::new(name, FieldType::Unit, Tag::len(bits)))
    }

    /// Zero-length alignment marker.
    pub fn marker(self) -> Self {
        self.padding(0)
    }
}

fn width_for(bits: usize) -> IntWidth {
    match bits {
        0..=8 => IntWidth::W8,
        9..=16 => IntWidth::W16,
        17..=32 => IntWidth::W32,
        _ => IntWidth::W64,
    }
}

/// A Rust type with a registered record layout. Implemented by [crate::bit_record!].
pub trait Schema {
    /// Registry key of the record type.
    const NAME: &'static str;

    fn record_def() -> RecordDef;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_picks_storage_width() {
        let def = RecordDef::new("r").uint("a", 3).uint("b", 13).int("c", 33);
        assert_eq!(def.fields[0].ty, FieldType::Uint(IntWidth::W8));
        assert_eq!(def.fields[1].ty, FieldType::Uint(IntWidth::W16));
        assert_eq!(def.fields[2].ty, FieldType::Int(IntWidth::W64));
        assert_eq!(def.fields[2].tag, Tag::len(33));
    }

    #[test]
    fn test_padding_names_are_unique() {
        let def = RecordDef::new("r").padding(3).flag("x").marker();
        assert_eq!(def.fields[0].name, "_0");
        assert_eq!(def.fields[2].name, "_2");
        assert_eq!(def.fields[2].tag, Tag::len(0));
    }
}
