//! Low-level bit extraction over byte slices.
//!
//! Bits are addressed MSB-first inside a byte: bit index 0 is the high bit.
//! [`read_bits`] extracts at most 8 bits per call and touches at most one
//! continuation byte; wider values are assembled by the decode engine from
//! repeated chunk reads.

use crate::errors::ReadError;

/// `RIGHT_MASK[k]` covers the top `k` bits of a byte. Clearing it drops the
/// bits of the current byte that were already consumed.
pub const RIGHT_MASK: [u8; 9] = [0, 128, 192, 224, 240, 248, 252, 254, 0];

/// `LEFT_MASK[k]` covers the low `8 - k` bits of a byte. Clearing it keeps the
/// top `k` bits of the continuation byte.
pub const LEFT_MASK: [u8; 9] = [0, 127, 63, 31, 15, 7, 3, 1, 0];

/// Largest number of bits a single [`read_bits`] call can extract.
pub const MAX_CHUNK_BITS: usize = 8;

/// Reads `bit_len` (0..=8) bits starting at bit `bit_index` of `data[byte_index]`,
/// continuing into the next byte when the range straddles a byte boundary.
pub fn read_bits(
    data: &[u8],
    byte_index: usize,
    bit_index: usize,
    bit_len: usize,
) -> Result<u64, ReadError> {
    if bit_len > MAX_CHUNK_BITS {
        return Err(ReadError::TooManyBits(bit_len));
    }
    let (byte_index, bit_index) = advance(byte_index, bit_index, 0);

    let right_shift = 8usize.saturating_sub(bit_index + bit_len);
    let left_shift = match (bit_len + bit_index).checked_sub(8) {
        Some(shift) if shift <= 7 => shift,
        _ => 0,
    };

    let byte = *data.get(byte_index).ok_or(ReadError::OutOfRange {
        byte_index,
        len: data.len(),
    })?;

    let mut value = (u64::from(byte & !RIGHT_MASK[bit_index]) >> right_shift) << left_shift;

    if left_shift > 0 {
        let next = *data.get(byte_index + 1).ok_or(ReadError::OutOfRange {
            byte_index: byte_index + 1,
            len: data.len(),
        })?;
        value |= u64::from(next & !LEFT_MASK[left_shift]) >> (8 - left_shift);
    }

    Ok(value)
}

/// Moves a `(byte_index, bit_index)` position forward by `bit_len` bits.
pub fn advance(byte_index: usize, bit_index: usize, bit_len: usize) -> (usize, usize) {
    let bit_index = bit_index + bit_len;
    (byte_index + bit_index / 8, bit_index % 8)
}

/// Sign-extends the low `bits` of `value` to a full `i64`.
pub fn sign_extend(value: u64, bits: usize) -> i64 {
    if bits == 0 || bits >= 64 {
        return value as i64;
    }

    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}
