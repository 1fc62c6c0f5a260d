//! JSON-deserializable schema description.
//!
//! A schema file lists record declarations in registration order. Decoders
//! are code, so they are registered separately before the file is loaded;
//! records refer to them by name.
//!
//! ```json
//! {
//!   "records": [
//!     {
//!       "name": "question",
//!       "fields": [
//!         { "name": "qname", "type": "bytes", "decoder": "domain-name" },
//!         { "name": "qtype", "type": "u16", "len": 16 },
//!         { "name": "qclass", "type": "u16", "len": 16 }
//!       ]
//!     }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    errors::SchemaError,
    field::{Field, FieldType, IntWidth, Tag},
    record::RecordDef,
    registry::{Registration, Registry},
};

/// Top-level schema file: record declarations in registration order.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SchemaDef {
    pub records: Vec<RecordDefJson>,
}

impl SchemaDef {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecordDefJson {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

/// One field declaration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldTypeDef,
    /// Length in bits; a multiple of 8 for `bytes`/`string` blocks.
    #[serde(default)]
    pub len: Option<usize>,
    /// Registered decoder for variable-length fields.
    #[serde(default)]
    pub decoder: Option<String>,
}

/// Declared type names accepted in schema files.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldTypeDef {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Bytes,
    String,
    /// Fixed-size byte array of the given size.
    Array(usize),
    /// Padding or alignment marker.
    Unit,
    /// Nested record by name.
    Record(String),
    F32,
    F64,
}

impl From<FieldTypeDef> for FieldType {
    fn from(value: FieldTypeDef) -> Self {
        match value {
            FieldTypeDef::Bool => FieldType::Bool,
            FieldTypeDef::U8 => FieldType::Uint(IntWidth::W8),
            FieldTypeDef::U16 => FieldType::Uint(IntWidth::W16),
            FieldTypeDef::U32 => FieldType::Uint(IntWidth::W32),
            FieldTypeDef::U64 => FieldType::Uint(IntWidth::W64),
            FieldTypeDef::I8 => FieldType::Int(IntWidth::W8),
            FieldTypeDef::I16 => FieldType::Int(IntWidth::W16),
            FieldTypeDef::I32 => FieldType::Int(IntWidth::W32),
            FieldTypeDef::I64 => FieldType::Int(IntWidth::W64),
            FieldTypeDef::Bytes => FieldType::Bytes,
            FieldTypeDef::String => FieldType::Text,
            FieldTypeDef::Array(size) => FieldType::Array(size),
            FieldTypeDef::Unit => FieldType::Unit,
            FieldTypeDef::Record(name) => FieldType::Record(name),
            FieldTypeDef::F32 => FieldType::Float32,
            FieldTypeDef::F64 => FieldType::Float64,
        }
    }
}

impl From<FieldDef> for Field {
    fn from(value: FieldDef) -> Self {
        Field::new(
            value.name,
            value.ty.into(),
            Tag {
                len: value.len,
                decoder: value.decoder,
            },
        )
    }
}

impl From<RecordDefJson> for RecordDef {
    fn from(value: RecordDefJson) -> Self {
        RecordDef {
            name: value.name,
            fields: value.fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl Registry {
    /// Registers every record of `schema` in order. A rejected record does
    /// not stop the ones after it; each gets its own result.
    pub fn register_schema(
        &self,
        schema: &SchemaDef,
    ) -> Vec<(String, Result<Registration, SchemaError>)> {
        schema
            .records
            .iter()
            .cloned()
            .map(|record| {
                let def = RecordDef::from(record);
                let result = self.register_record(&def);
                (def.name, result)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        codec::DomainName,
        decode::DecodeOptions,
        value::Value,
    };

    use super::*;

    const SCHEMA: &str = r#"{
        "records": [
            {
                "name": "question",
                "fields": [
                    { "name": "qname", "type": "bytes", "decoder": "domain-name" },
                    { "name": "qtype", "type": "u16", "len": 16 },
                    { "name": "qclass", "type": "u16", "len": 16 }
                ]
            },
            {
                "name": "broken",
                "fields": [
                    { "name": "ratio", "type": "f32", "len": 32 }
                ]
            },
            {
                "name": "query",
                "fields": [
                    { "name": "id", "type": "u16", "len": 16 },
                    { "name": "flags", "type": "unit", "len": 0 },
                    { "name": "q", "type": { "record": "question" } }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_schema_json() {
        let schema = SchemaDef::from_json(SCHEMA).unwrap();
        assert_eq!(schema.records.len(), 3);
        assert_eq!(schema.records[2].fields[2].ty, FieldTypeDef::Record("question".to_string()));
        assert_eq!(schema.records[0].fields[0].len, None);
    }

    #[test]
    fn test_register_schema_continues_after_rejection() {
        let registry = Registry::new();
        registry.register_decoder(DomainName::NAME, DomainName);
        let results = registry.register_schema(&SchemaDef::from_json(SCHEMA).unwrap());

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].1, Ok(Registration::Added { unusable: 0 }));
        assert!(matches!(results[1].1, Err(SchemaError::UnsupportedKind { .. })));
        assert_eq!(results[2].1, Ok(Registration::Added { unusable: 0 }));

        let data = [0x00, 0x07, 0xFF, 0x01, b'a', 0x00, 0x00, 0x01, 0x00, 0x01];
        let record = registry
            .decode_record("query", &data, &DecodeOptions::default())
            .unwrap();
        assert_eq!(record.get("id"), Some(&Value::U64(7)));
        let q = record.get("q").and_then(Value::as_record).unwrap();
        assert_eq!(q.get("qname").and_then(Value::as_bytes), Some(&b"a"[..]));
    }
}
