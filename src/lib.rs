//! # bitschema
//!
//! Decodes bit-packed binary records described by registered schemas.
//!
//! Records are declared as ordered fields with bit widths (1 to 64 bits,
//! free to straddle byte boundaries), padding, fixed byte blocks, nested
//! records and variable-length blocks handled by named custom decoders such
//! as [codec::DomainName]. Declarations are compiled once into a
//! [registry::Registry]; decoding then walks the compiled descriptors over a
//! byte slice with a single bit cursor.
//!
//! ## Example
//!
//! ```
//! use bitschema::{
//!     codec::DomainName,
//!     decode::DecodeOptions,
//!     record::RecordDef,
//!     registry::Registry,
//!     value::Value,
//! };
//!
//! let registry = Registry::new();
//! registry.register_decoder(DomainName::NAME, DomainName);
//! registry
//!     .register_record(
//!         &RecordDef::new("question")
//!             .decoded("qname", DomainName::NAME)
//!             .uint("qtype", 16)
//!             .uint("qclass", 16),
//!     )
//!     .unwrap();
//!
//! let data = [0x03, b'i', b's', b'i', 0x00, 0x00, 0x01, 0x00, 0x01];
//! let question = registry
//!     .decode_record("question", &data, &DecodeOptions::default())
//!     .unwrap();
//! assert_eq!(question.get("qname").and_then(Value::as_bytes), Some(&b"isi"[..]));
//! assert_eq!(question.get("qtype"), Some(&Value::U64(1)));
//! ```

pub mod bits;
pub mod codec;
pub mod cursor;
pub mod decode;
pub mod descriptor;
pub mod errors;
pub mod field;
mod macros;
pub mod record;
pub mod registry;
#[cfg(feature = "serde")]
pub mod serde;
pub mod value;
