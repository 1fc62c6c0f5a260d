//! Declarative record definitions.

/// Declares a struct together with its registered layout.
///
/// Each field is written `name: Type = tag`, where the tag is a
/// [`Tag`](crate::field::Tag) expression giving the bit length or decoder.
/// The declared [`FieldType`](crate::field::FieldType) comes from the Rust
/// type through [`FieldValue`](crate::value::FieldValue). The struct must
/// implement `Default`; the macro implements [`Schema`](crate::record::Schema),
/// [`Destination`](crate::decode::Destination) and `FieldValue` (so the type
/// can be nested in other records).
///
/// ```
/// use bitschema::{bit_record, decode::DecodeOptions, field::Tag, registry::Registry, value::Pad};
///
/// bit_record! {
///     #[derive(Debug, Default, PartialEq)]
///     pub struct Flags as "flags" {
///         pub kind: u8 = Tag::len(3),
///         pub urgent: bool = Tag::len(1),
///         pub _rest: Pad = Tag::len(4),
///     }
/// }
///
/// let registry = Registry::new();
/// registry.register::<Flags>().unwrap();
/// let flags: Flags = registry
///     .decode_as(&[0b101_0_0001], &DecodeOptions::default())
///     .unwrap();
/// assert_eq!(flags.kind, 5);
/// assert!(!flags.urgent);
/// ```
#[macro_export]
macro_rules! bit_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident as $record:literal {
            $( $fvis:vis $field:ident : $ty:ty = $tag:expr ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $fvis $field: $ty, )*
        }

        impl $crate::record::Schema for $name {
            const NAME: &'static str = $record;

            fn record_def() -> $crate::record::RecordDef {
                $crate::record::RecordDef::new($record)
                    $( .field($crate::field::Field::new(
                        stringify!($field),
                        <$ty as $crate::value::FieldValue>::field_type(),
                        $tag,
                    )) )*
            }
        }

        impl $crate::decode::Destination for $name {
            fn record_name(&self) -> &str {
                $record
            }

            #[allow(unused_assignments, unused_variables, unused_mut)]
            fn put(
                &mut self,
                index: usize,
                name: &str,
                value: $crate::value::Value,
            ) -> ::std::result::Result<(), $crate::errors::ValueError> {
                let mut position = 0usize;
                $(
                    if index == position {
                        self.$field = <$ty as $crate::value::FieldValue>::from_value(value)?;
                        return Ok(());
                    }
                    position += 1;
                )*
                Err($crate::errors::ValueError::NoSuchField(index))
            }
        }

        impl $crate::value::FieldValue for $name {
            fn field_type() -> $crate::field::FieldType {
                $crate::field::FieldType::Record($record.to_string())
            }

            fn from_value(
                value: $crate::value::Value,
            ) -> ::std::result::Result<Self, $crate::errors::ValueError> {
                match value {
                    $crate::value::Value::Record(record) => {
                        let mut out = <$name as ::std::default::Default>::default();
                        record.populate(&mut out)?;
                        Ok(out)
                    }
                    other => Err($crate::errors::ValueError::TypeMismatch {
                        expected: "record",
                        found: other.kind(),
                    }),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{
        codec::DomainName,
        decode::{ByteOrder, DecodeOptions, Destination},
        errors::{DecodeError, ValueError},
        field::{FieldType, IntWidth, Tag},
        record::Schema,
        registry::Registry,
        value::{Pad, Value},
    };

    bit_record! {
        #[derive(Debug, Default, PartialEq)]
        struct Question as "question" {
            qname: String = Tag::decoder(DomainName::NAME),
            qtype: u16 = Tag::len(16),
            qclass: u16 = Tag::len(16),
        }
    }

    bit_record! {
        #[derive(Debug, Default, PartialEq)]
        struct Query as "query" {
            id: u16 = Tag::len(16),
            opcode: u8 = Tag::len(4),
            delta: i8 = Tag::len(8),
            _align: Pad = Tag::len(4),
            question: Question = Tag::none(),
        }
    }

    fn registry() -> Registry {
        let registry = Registry::new();
        registry.register_decoder(DomainName::NAME, DomainName);
        registry.register::<Question>().unwrap();
        registry.register::<Query>().unwrap();
        registry
    }

    #[test]
    fn test_record_def_from_macro() {
        let def = Query::record_def();
        assert_eq!(def.name, "query");
        assert_eq!(def.fields.len(), 5);
        assert_eq!(def.fields[1].ty, FieldType::Uint(IntWidth::W8));
        assert_eq!(def.fields[2].ty, FieldType::Int(IntWidth::W8));
        assert_eq!(def.fields[3].ty, FieldType::Unit);
        assert_eq!(def.fields[4].ty, FieldType::record("question"));
        assert_eq!(Query::NAME, "query");
    }

    #[test]
    fn test_decode_typed_nested() {
        let registry = registry();
        let data = [
            0xBE, 0xEF, 0x3F, 0xE0, 0x01, b'f', 0x00, 0x00, 0x1C, 0x00, 0x01,
        ];
        let query: Query = registry.decode_as(&data, &DecodeOptions::default()).unwrap();

        assert_eq!(
            query,
            Query {
                id: 0xBEEF,
                opcode: 3,
                delta: -2,
                _align: Pad,
                question: Question {
                    qname: "f".to_string(),
                    qtype: 28,
                    qclass: 1,
                },
            }
        );
    }

    #[test]
    fn test_unknown_index_is_rejected() {
        let mut question = Question::default();
        assert_eq!(question.record_name(), "question");
        assert_eq!(
            question.put(9, "x", Value::U64(1)),
            Err(ValueError::NoSuchField(9))
        );
    }

    #[test]
    fn test_type_mismatch_names_field() {
        let registry = registry();
        let mut question = Question::default();
        let err = registry
            .decode(&mut question, &[0x01, 0xFF, 0x00, 0, 1, 0, 1], ByteOrder::BigEndian)
            .unwrap_err();
        assert_eq!(
            err,
            DecodeError::Destination {
                field: "qname".to_string(),
                source: ValueError::InvalidUtf8,
            }
        );
    }
}
