//! Custom decoders for variable-length fields.
//!
//! A decoder receives the whole source buffer and an absolute start offset,
//! not a sub-slice, so encodings with backward references (DNS name
//! compression) can resolve them against earlier parts of the same message.

use crate::errors::CodecError;

/// Output of a [CustomDecoder].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    pub bytes: Vec<u8>,
    /// Bytes occupied at the start offset. When known, the engine moves the
    /// cursor past them; otherwise the cursor stays where the field began.
    pub consumed: Option<usize>,
}

impl Decoded {
    pub fn new(bytes: Vec<u8>, consumed: usize) -> Self {
        Decoded {
            bytes,
            consumed: Some(consumed),
        }
    }
}

impl From<Vec<u8>> for Decoded {
    fn from(bytes: Vec<u8>) -> Self {
        Decoded {
            bytes,
            consumed: None,
        }
    }
}

/// Decoding logic for fields whose size is not known from the schema.
pub trait CustomDecoder: Send + Sync {
    fn decode(&self, src: &[u8], start: usize) -> Result<Decoded, CodecError>;
}

impl<F> CustomDecoder for F
where
    F: Fn(&[u8], usize) -> Result<Decoded, CodecError> + Send + Sync,
{
    fn decode(&self, src: &[u8], start: usize) -> Result<Decoded, CodecError> {
        self(src, start)
    }
}

const POINTER_TAG: u8 = 0xC0;

/// Decodes length-prefixed labels (`[len][bytes]...[0]`) into a dotted name,
/// following compression pointers.
///
/// A pointer (top two bits set, 14-bit target offset) appends `'.'` followed by
/// the name found at the target; a name that starts with a pointer therefore
/// decodes with a leading dot. Each target must lie strictly before the start
/// of the labels containing the pointer, so every hop moves backwards and
/// pointer loops are impossible.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainName;

impl DomainName {
    /// Conventional registry name for this decoder.
    pub const NAME: &'static str = "domain-name";

    fn decode_at(src: &[u8], start: usize) -> Result<Decoded, CodecError> {
        let mut out = Vec::new();
        // Start of the run of labels being read; moves back on every pointer.
        let mut segment = start;
        let mut pos = start;
        let mut consumed = None;

        loop {
            let len = *src.get(pos).ok_or(CodecError::Truncated {
                start: segment,
                at: pos,
            })?;

            if len & POINTER_TAG == POINTER_TAG {
                let low = *src.get(pos + 1).ok_or(CodecError::Truncated {
                    start: segment,
                    at: pos + 1,
                })?;
                let target = (usize::from(len & !POINTER_TAG) << 8) | usize::from(low);
                if target >= segment {
                    return Err(CodecError::ForwardPointer { at: pos, target });
                }

                if consumed.is_none() {
                    consumed = Some(pos + 2 - start);
                }
                out.push(b'.');
                segment = target;
                pos = target;
                continue;
            }

            if len & POINTER_TAG != 0 {
                return Err(CodecError::ReservedLabelType { byte: len, at: pos });
            }

            if len == 0 {
                let consumed = consumed.unwrap_or(pos + 1 - start);
                return Ok(Decoded::new(out, consumed));
            }

            let label_end = pos + 1 + usize::from(len);
            let label = src.get(pos + 1..label_end).ok_or(CodecError::Truncated {
                start: segment,
                at: src.len(),
            })?;
            if pos != segment {
                out.push(b'.');
            }
            out.extend_from_slice(label);
            pos = label_end;
        }
    }
}

impl CustomDecoder for DomainName {
    fn decode(&self, src: &[u8], start: usize) -> Result<Decoded, CodecError> {
        Self::decode_at(src, start)
    }
}
