//! Decoded values and the dynamic [Record] destination.

use crate::{
    decode::Destination,
    errors::ValueError,
    field::{FieldType, IntWidth},
};

/// A value produced for one field of a decoded record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Value {
    /// Not written: padding, or a field skipped by a lenient registry.
    #[default]
    Unset,
    Bool(bool),
    U64(u64),
    I64(i64),
    Bytes(Vec<u8>),
    Record(Record),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Unset => "unset",
            Value::Bool(_) => "bool",
            Value::U64(_) => "unsigned",
            Value::I64(_) => "signed",
            Value::Bytes(_) => "bytes",
            Value::Record(_) => "record",
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(v) => Some(v),
            _ => None,
        }
    }
}

/// Record decoded without a Rust type: the record name plus one named slot
/// per declared field, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    name: String,
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Record {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First field called `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.fields.get(index).map(|(_, value)| value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Replays every written slot into another destination, by index.
    pub fn populate<D: Destination + ?Sized>(self, dest: &mut D) -> Result<(), ValueError> {
        for (index, (name, value)) in self.fields.into_iter().enumerate() {
            if value != Value::Unset {
                dest.put(index, &name, value)?;
            }
        }

        Ok(())
    }
}

impl Destination for Record {
    fn record_name(&self) -> &str {
        &self.name
    }

    fn prepare(&mut self, field_names: &[&str]) {
        self.fields = field_names
            .iter()
            .map(|name| (name.to_string(), Value::Unset))
            .collect();
    }

    fn put(&mut self, index: usize, name: &str, value: Value) -> Result<(), ValueError> {
        if index >= self.fields.len() {
            self.fields
                .resize_with(index + 1, || (String::new(), Value::Unset));
        }
        self.fields[index] = (name.to_string(), value);
        Ok(())
    }
}

/// Rust types that can hold a decoded field.
///
/// `field_type` is the declared type registered for the field; `from_value`
/// converts what the engine produced.
pub trait FieldValue: Sized {
    fn field_type() -> FieldType;

    fn from_value(value: Value) -> Result<Self, ValueError>;
}

fn mismatch<T>(expected: &'static str, found: &Value) -> Result<T, ValueError> {
    Err(ValueError::TypeMismatch {
        expected,
        found: found.kind(),
    })
}

impl FieldValue for bool {
    fn field_type() -> FieldType {
        FieldType::Bool
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(v) => Ok(v),
            other => mismatch("bool", &other),
        }
    }
}

macro_rules! unsigned_field {
    ($($ty:ty => $width:ident),*) => {$(
        impl FieldValue for $ty {
            fn field_type() -> FieldType {
                FieldType::Uint(IntWidth::$width)
            }

            fn from_value(value: Value) -> Result<Self, ValueError> {
                match value {
                    Value::U64(v) => <$ty>::try_from(v).map_err(|_| ValueError::OutOfRange(i128::from(v))),
                    other => mismatch("unsigned", &other),
                }
            }
        }
    )*};
}

macro_rules! signed_field {
    ($($ty:ty => $width:ident),*) => {$(
        impl FieldValue for $ty {
            fn field_type() -> FieldType {
                FieldType::Int(IntWidth::$width)
            }

            fn from_value(value: Value) -> Result<Self, ValueError> {
                match value {
                    Value::I64(v) => <$ty>::try_from(v).map_err(|_| ValueError::OutOfRange(i128::from(v))),
                    other => mismatch("signed", &other),
                }
            }
        }
    )*};
}

unsigned_field!(u8 => W8, u16 => W16, u32 => W32, u64 => W64);
signed_field!(i8 => W8, i16 => W16, i32 => W32, i64 => W64);

impl FieldValue for Vec<u8> {
    fn field_type() -> FieldType {
        FieldType::Bytes
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bytes(v) => Ok(v),
            other => mismatch("bytes", &other),
        }
    }
}

impl FieldValue for String {
    fn field_type() -> FieldType {
        FieldType::Text
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bytes(v) => String::from_utf8(v).map_err(|_| ValueError::InvalidUtf8),
            other => mismatch("bytes", &other),
        }
    }
}

impl<const N: usize> FieldValue for [u8; N] {
    fn field_type() -> FieldType {
        FieldType::Array(N)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bytes(v) => {
                let found = v.len();
                v.try_into()
                    .map_err(|_| ValueError::LengthMismatch { expected: N, found })
            }
            other => mismatch("bytes", &other),
        }
    }
}

/// Placeholder type for padding and alignment fields; never receives a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pad;

impl FieldValue for Pad {
    fn field_type() -> FieldType {
        FieldType::Unit
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Unset => Ok(Pad),
            other => mismatch("unset", &other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_slots() {
        let mut record = Record::new("r");
        record.prepare(&["a", "b", "c"]);
        record.put(1, "b", Value::U64(7)).unwrap();

        assert_eq!(record.len(), 3);
        assert_eq!(record.get("a"), Some(&Value::Unset));
        assert_eq!(record.get("b").and_then(Value::as_u64), Some(7));
        assert_eq!(record.get_index(2), Some(&Value::Unset));
        assert_eq!(record.get("d"), None);
    }

    #[test]
    fn test_narrowing_conversions() {
        assert_eq!(u8::from_value(Value::U64(255)), Ok(255));
        assert_eq!(
            u8::from_value(Value::U64(256)),
            Err(ValueError::OutOfRange(256))
        );
        assert_eq!(i8::from_value(Value::I64(-1)), Ok(-1));
        assert_eq!(
            u16::from_value(Value::I64(1)),
            Err(ValueError::TypeMismatch {
                expected: "unsigned",
                found: "signed"
            })
        );
    }

    #[test]
    fn test_byte_conversions() {
        assert_eq!(
            String::from_value(Value::Bytes(b"isi".to_vec())),
            Ok("isi".to_string())
        );
        assert_eq!(
            String::from_value(Value::Bytes(vec![0xFF])),
            Err(ValueError::InvalidUtf8)
        );
        assert_eq!(
            <[u8; 2]>::from_value(Value::Bytes(vec![1, 2])),
            Ok([1, 2])
        );
        assert_eq!(
            <[u8; 2]>::from_value(Value::Bytes(vec![1])),
            Err(ValueError::LengthMismatch {
                expected: 2,
                found: 1
            })
        );
    }
}
