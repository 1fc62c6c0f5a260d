//! The decode engine: walks a record's field descriptors over a buffer with
//! a single [BitCursor], writing each decoded value into a [Destination].

use tracing::{debug, trace};

use crate::{
    bits::{sign_extend, MAX_CHUNK_BITS},
    cursor::BitCursor,
    descriptor::{FieldDescriptor, FieldKind, FieldSlot, RecordDescriptor},
    errors::{DecodeError, ReadError, ValueError},
    record::Schema,
    registry::{Entry, Registry},
    value::{Record, Value},
};

/// Order in which the byte-sized chunks of a multi-byte integer are assembled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ByteOrder {
    /// First chunk read is the most significant.
    #[default]
    BigEndian,
    /// First chunk read is the least significant.
    LittleEndian,
}

/// Meaning of a zero-length padding field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarkerPolicy {
    /// Move to the start of the next byte, even when already aligned.
    #[default]
    NextByte,
    /// Leave the cursor where it is.
    Ignore,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub byte_order: ByteOrder,
    pub marker: MarkerPolicy,
}

impl DecodeOptions {
    pub fn new(byte_order: ByteOrder) -> Self {
        DecodeOptions {
            byte_order,
            ..Default::default()
        }
    }

    pub fn with_marker(mut self, marker: MarkerPolicy) -> Self {
        self.marker = marker;
        self
    }
}

/// Something a record can be decoded into.
///
/// Values arrive by declaration index, in order; fields that are skipped
/// (padding, unusable fields) are never written.
pub trait Destination {
    /// Registry key of the record type to decode.
    fn record_name(&self) -> &str;

    /// Called once before the first field, with every declared field name.
    fn prepare(&mut self, _field_names: &[&str]) {}

    fn put(&mut self, index: usize, name: &str, value: Value) -> Result<(), ValueError>;
}

impl Registry {
    /// Decodes `src` into `dest` from the first byte, using the record type
    /// `dest` names. Returns the cursor position after the last field.
    pub fn decode<D: Destination + ?Sized>(
        &self,
        dest: &mut D,
        src: &[u8],
        byte_order: ByteOrder,
    ) -> Result<BitCursor, DecodeError> {
        self.decode_with(dest, src, &DecodeOptions::new(byte_order))
    }

    /// Like [Registry::decode] with full options. On error `dest` keeps the
    /// fields written before the failing one.
    pub fn decode_with<D: Destination + ?Sized>(
        &self,
        dest: &mut D,
        src: &[u8],
        options: &DecodeOptions,
    ) -> Result<BitCursor, DecodeError> {
        let name = dest.record_name().to_string();
        let descriptor = match self.get(&name) {
            Some(Entry::Record(descriptor)) => descriptor,
            Some(Entry::Decoder(_)) => return Err(DecodeError::NotARecord(name)),
            None => {
                debug!(record = %name, "type not registered");
                return Err(DecodeError::NotRegistered(name));
            }
        };

        let mut cursor = BitCursor::new();
        Walker { src, options }
            .walk(&descriptor, dest, &mut cursor, "")
            .inspect_err(|err| debug!(record = %name, field = err.field(), "decode failed: {err}"))?;

        Ok(cursor)
    }

    /// Decodes into a fresh dynamic [Record] of type `name`.
    pub fn decode_record(
        &self,
        name: &str,
        src: &[u8],
        options: &DecodeOptions,
    ) -> Result<Record, DecodeError> {
        let mut record = Record::new(name);
        self.decode_with(&mut record, src, options)?;
        Ok(record)
    }

    /// Decodes into a default-initialized typed record.
    pub fn decode_as<T>(&self, src: &[u8], options: &DecodeOptions) -> Result<T, DecodeError>
    where
        T: Schema + Destination + Default,
    {
        let mut out = T::default();
        self.decode_with(&mut out, src, options)?;
        Ok(out)
    }
}

/// Decodes `src` against an already resolved descriptor, starting and
/// finishing at `cursor`.
pub fn decode_descriptor<D: Destination + ?Sized>(
    descriptor: &RecordDescriptor,
    dest: &mut D,
    src: &[u8],
    options: &DecodeOptions,
    cursor: &mut BitCursor,
) -> Result<(), DecodeError> {
    Walker { src, options }.walk(descriptor, dest, cursor, "")
}

struct Walker<'a> {
    src: &'a [u8],
    options: &'a DecodeOptions,
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

impl Walker<'_> {
    fn walk<D: Destination + ?Sized>(
        &self,
        record: &RecordDescriptor,
        dest: &mut D,
        cursor: &mut BitCursor,
        prefix: &str,
    ) -> Result<(), DecodeError> {
        dest.prepare(&record.field_names());

        for (index, slot) in record.slots.iter().enumerate() {
            let field = match slot {
                FieldSlot::Ready(field) => field,
                FieldSlot::Unusable { name, .. } => {
                    // The cursor does not move: the field's width is unknown.
                    trace!(record = %record.name, field = %name, "skipping unusable field");
                    continue;
                }
            };

            if let Some(value) = self.field(field, cursor, prefix)? {
                dest.put(index, &field.name, value)
                    .map_err(|source| DecodeError::Destination {
                        field: join(prefix, &field.name),
                        source,
                    })?;
            }
        }

        Ok(())
    }

    fn field(
        &self,
        field: &FieldDescriptor,
        cursor: &mut BitCursor,
        prefix: &str,
    ) -> Result<Option<Value>, DecodeError> {
        let path = || join(prefix, &field.name);
        let read = |err: ReadError| DecodeError::from_read(&path(), err);

        let value = match &field.kind {
            FieldKind::Bool => Value::Bool(cursor.read_flag(self.src).map_err(read)?),
            FieldKind::Uint { bits, .. } => Value::U64(self.integer(cursor, *bits).map_err(read)?),
            FieldKind::Int { width, bits } => {
                let raw = self.integer(cursor, *bits).map_err(read)?;
                Value::I64(sign_extend(raw, width.bits()))
            }
            FieldKind::FixedBytes { len } => {
                self.require_aligned(cursor, &path)?;
                Value::Bytes(cursor.take_bytes(self.src, *len).map_err(read)?.to_vec())
            }
            FieldKind::Variable { decoder, array } => {
                self.require_aligned(cursor, &path)?;
                let start = cursor.byte_index();
                let decoded = decoder
                    .decoder
                    .decode(self.src, start)
                    .map_err(|source| DecodeError::Codec {
                        field: path(),
                        source,
                    })?;

                if let Some(expected) = *array {
                    if decoded.bytes.len() != expected {
                        return Err(DecodeError::Destination {
                            field: path(),
                            source: ValueError::LengthMismatch {
                                expected,
                                found: decoded.bytes.len(),
                            },
                        });
                    }
                }
                if let Some(consumed) = decoded.consumed {
                    cursor
                        .seek_byte(self.src, start.saturating_add(consumed))
                        .map_err(read)?;
                }
                Value::Bytes(decoded.bytes)
            }
            FieldKind::Nested(nested) => {
                let mut record = Record::new(nested.name.clone());
                self.walk(nested, &mut record, cursor, &path())?;
                Value::Record(record)
            }
            FieldKind::Padding { bits: 0 } => {
                if self.options.marker == MarkerPolicy::NextByte {
                    cursor.skip_to_next_byte(self.src).map_err(read)?;
                }
                return Ok(None);
            }
            FieldKind::Padding { bits } => {
                cursor.skip(self.src, *bits).map_err(read)?;
                return Ok(None);
            }
        };

        Ok(Some(value))
    }

    /// Assembles an integer of `bits` width from chunk reads of at most 8
    /// bits. Each leading full chunk lands in its own byte slot and the final
    /// (possibly partial) chunk fills the lowest slot for big-endian, the
    /// highest for little-endian.
    fn integer(&self, cursor: &mut BitCursor, bits: usize) -> Result<u64, ReadError> {
        let full = bits.saturating_sub(1) / MAX_CHUNK_BITS;
        let mut value = 0u64;

        for (i, len) in BitCursor::chunks(bits).enumerate() {
            let chunk = cursor.read_chunk(self.src, len)?;
            let slot = match self.options.byte_order {
                ByteOrder::BigEndian => full - i,
                ByteOrder::LittleEndian => i,
            };
            value |= chunk << (MAX_CHUNK_BITS * slot);
        }

        Ok(value)
    }

    fn require_aligned(
        &self,
        cursor: &BitCursor,
        path: &dyn Fn() -> String,
    ) -> Result<(), DecodeError> {
        if cursor.is_byte_aligned() {
            Ok(())
        } else {
            Err(DecodeError::Misaligned {
                field: path(),
                bit_index: cursor.bit_index(),
            })
        }
    }
}
