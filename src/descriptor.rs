//! Compiled descriptors: what the decode engine walks.
//!
//! A [RecordDescriptor] is built once from a [RecordDef] when the record is
//! registered. Nested records and custom decoders are resolved at that point,
//! so decoding never looks anything up by name.

use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    codec::CustomDecoder,
    errors::SchemaError,
    field::{Field, FieldType, IntWidth},
    record::RecordDef,
    registry::Entry,
};

/// A resolved reference to a registered custom decoder.
#[derive(Clone)]
pub struct DecoderRef {
    pub name: String,
    pub(crate) decoder: Arc<dyn CustomDecoder>,
}

impl fmt::Debug for DecoderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DecoderRef").field(&self.name).finish()
    }
}

/// How a field is read from the buffer.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Single flag bit.
    Bool,
    Uint { width: IntWidth, bits: usize },
    Int { width: IntWidth, bits: usize },
    /// `len` bytes copied verbatim from a byte boundary.
    FixedBytes { len: usize },
    /// Bytes produced by a custom decoder; `array` holds the declared size of
    /// fixed array fields.
    Variable {
        decoder: DecoderRef,
        array: Option<usize>,
    },
    Nested(Arc<RecordDescriptor>),
    /// Skips `bits` bits; zero marks a byte-alignment point.
    Padding { bits: usize },
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// Declared width in bits, when the field has a static size.
    pub fn bit_len(&self) -> Option<usize> {
        match &self.kind {
            FieldKind::Bool => Some(1),
            FieldKind::Uint { bits, .. } | FieldKind::Int { bits, .. } => Some(*bits),
            FieldKind::FixedBytes { len } => Some(len * 8),
            FieldKind::Padding { bits } => Some(*bits),
            FieldKind::Variable { .. } | FieldKind::Nested(_) => None,
        }
    }
}

/// One declared field after compilation.
#[derive(Debug, Clone)]
pub enum FieldSlot {
    Ready(FieldDescriptor),
    /// Kept so decoding can skip it explicitly; only lenient registries store these.
    Unusable { name: String, error: SchemaError },
}

impl FieldSlot {
    pub fn name(&self) -> &str {
        match self {
            FieldSlot::Ready(field) => &field.name,
            FieldSlot::Unusable { name, .. } => name,
        }
    }
}

/// Registered layout of a record type.
#[derive(Debug, Clone)]
pub struct RecordDescriptor {
    pub name: String,
    pub slots: Vec<FieldSlot>,
}

impl RecordDescriptor {
    pub(crate) fn compile(def: &RecordDef, entries: &HashMap<String, Entry>) -> Self {
        let slots = def
            .fields
            .iter()
            .map(|field| match compile_field(&def.name, field, entries) {
                Ok(kind) => FieldSlot::Ready(FieldDescriptor {
                    name: field.name.clone(),
                    kind,
                }),
                Err(error) => FieldSlot::Unusable {
                    name: field.name.clone(),
                    error,
                },
            })
            .collect();

        RecordDescriptor {
            name: def.name.clone(),
            slots,
        }
    }

    pub fn field_count(&self) -> usize {
        self.slots.len()
    }

    /// Descriptor at `index`, `None` when out of range or unusable.
    pub fn field(&self, index: usize) -> Option<&FieldDescriptor> {
        match self.slots.get(index)? {
            FieldSlot::Ready(field) => Some(field),
            FieldSlot::Unusable { .. } => None,
        }
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.slots.iter().map(FieldSlot::name).collect()
    }

    /// Fields that failed to compile, with their declaration index.
    pub fn unusable(&self) -> impl Iterator<Item = (usize, &SchemaError)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                FieldSlot::Unusable { error, .. } => Some((index, error)),
                FieldSlot::Ready(_) => None,
            })
    }

    /// Total width in bits when every field has a static size.
    pub fn static_bit_len(&self) -> Option<usize> {
        self.slots.iter().try_fold(0, |acc, slot| match slot {
            FieldSlot::Ready(field) => match &field.kind {
                FieldKind::Nested(nested) => Some(acc + nested.static_bit_len()?),
                _ => Some(acc + field.bit_len()?),
            },
            FieldSlot::Unusable { .. } => Some(acc),
        })
    }
}

fn compile_field(
    record: &str,
    field: &Field,
    entries: &HashMap<String, Entry>,
) -> Result<FieldKind, SchemaError> {
    let bit_len = |max: usize| -> Result<usize, SchemaError> {
        match field.tag.len {
            None => Err(SchemaError::MissingLength {
                record: record.to_string(),
                field: field.name.clone(),
            }),
            Some(len) if len == 0 || len > max => Err(SchemaError::InvalidLength {
                record: record.to_string(),
                field: field.name.clone(),
                len,
                max,
            }),
            Some(len) => Ok(len),
        }
    };

    // A length on a byte block takes precedence over a decoder.
    if let (FieldType::Bytes | FieldType::Text, Some(bits)) = (&field.ty, field.tag.len) {
        if bits % 8 != 0 {
            return Err(SchemaError::PartialBytes {
                record: record.to_string(),
                field: field.name.clone(),
                len: bits,
            });
        }
        return Ok(FieldKind::FixedBytes { len: bits / 8 });
    }

    match &field.ty {
        FieldType::Record(nested) => match entries.get(nested) {
            Some(Entry::Record(descriptor)) => Ok(FieldKind::Nested(descriptor.clone())),
            Some(Entry::Decoder(_)) => Err(SchemaError::NotARecord {
                record: record.to_string(),
                field: field.name.clone(),
                nested: nested.clone(),
            }),
            None => Err(SchemaError::UnregisteredRecord {
                record: record.to_string(),
                field: field.name.clone(),
                nested: nested.clone(),
            }),
        },
        FieldType::Bool => bit_len(1).map(|_| FieldKind::Bool),
        FieldType::Uint(width) => bit_len(width.bits()).map(|bits| FieldKind::Uint {
            width: *width,
            bits,
        }),
        FieldType::Int(width) => bit_len(width.bits()).map(|bits| FieldKind::Int {
            width: *width,
            bits,
        }),
        FieldType::Unit => match field.tag.len {
            Some(bits) => Ok(FieldKind::Padding { bits }),
            None => Err(SchemaError::MissingLength {
                record: record.to_string(),
                field: field.name.clone(),
            }),
        },
        FieldType::Bytes | FieldType::Text | FieldType::Array(_) => {
            let array = match field.ty {
                FieldType::Array(size) => Some(size),
                _ => None,
            };
            let name = field
                .tag
                .decoder
                .as_ref()
                .ok_or_else(|| SchemaError::MissingDecoder {
                    record: record.to_string(),
                    field: field.name.clone(),
                })?;

            match entries.get(name) {
                Some(Entry::Decoder(decoder)) => Ok(FieldKind::Variable {
                    decoder: DecoderRef {
                        name: name.clone(),
                        decoder: decoder.clone(),
                    },
                    array,
                }),
                _ => Err(SchemaError::UnregisteredDecoder {
                    record: record.to_string(),
                    field: field.name.clone(),
                    decoder: name.clone(),
                }),
            }
        }
        FieldType::Float32 | FieldType::Float64 => Err(SchemaError::UnsupportedKind {
            record: record.to_string(),
            field: field.name.clone(),
            kind: field.ty.clone(),
        }),
    }
}
