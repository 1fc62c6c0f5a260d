//! Decode position tracking.

use crate::{
    bits::{self, MAX_CHUNK_BITS},
    errors::ReadError,
};

/// A `(byte_index, bit_index)` position inside a source buffer, `bit_index` in `0..8`.
///
/// One cursor is owned by each decode call; nested records continue on the
/// same cursor so the outer record advances by exactly what the nested one consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitCursor {
    byte_index: usize,
    bit_index: usize,
}

impl BitCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor positioned at the start of byte `byte_index`.
    pub fn at_byte(byte_index: usize) -> Self {
        Self {
            byte_index,
            bit_index: 0,
        }
    }

    pub fn byte_index(&self) -> usize {
        self.byte_index
    }

    pub fn bit_index(&self) -> usize {
        self.bit_index
    }

    /// Absolute position in bits from the start of the buffer.
    pub fn bit_position(&self) -> usize {
        self.byte_index * 8 + self.bit_index
    }

    pub fn is_byte_aligned(&self) -> bool {
        self.bit_index == 0
    }

    pub fn advance(&mut self, bit_len: usize) {
        (self.byte_index, self.bit_index) = bits::advance(self.byte_index, self.bit_index, bit_len);
    }

    /// Jumps to the start of the following byte, even when already aligned.
    pub fn next_byte(&mut self) {
        self.byte_index += 1;
        self.bit_index = 0;
    }

    /// Reads up to 8 bits at the cursor without moving it.
    pub fn peek(&self, data: &[u8], bit_len: usize) -> Result<u64, ReadError> {
        bits::read_bits(data, self.byte_index, self.bit_index, bit_len)
    }

    /// Reads up to 8 bits and moves past them.
    pub fn read_chunk(&mut self, data: &[u8], bit_len: usize) -> Result<u64, ReadError> {
        let value = self.peek(data, bit_len)?;
        self.advance(bit_len);
        Ok(value)
    }

    /// Tests bit `bit_index` counted from the least significant end of the
    /// current byte, which is how flag fields are laid out.
    pub fn read_flag(&mut self, data: &[u8]) -> Result<bool, ReadError> {
        let byte = *data.get(self.byte_index).ok_or(ReadError::OutOfRange {
            byte_index: self.byte_index,
            len: data.len(),
        })?;
        let set = byte & (1 << self.bit_index) != 0;
        self.advance(1);
        Ok(set)
    }

    /// Skips `bit_len` bits without reading them. The skipped range must
    /// still lie inside `data`.
    pub fn skip(&mut self, data: &[u8], bit_len: usize) -> Result<(), ReadError> {
        let end = self.bit_position().saturating_add(bit_len);
        if end > data.len().saturating_mul(8) {
            return Err(ReadError::OutOfRange {
                byte_index: (end - 1) / 8,
                len: data.len(),
            });
        }

        self.advance(bit_len);
        Ok(())
    }

    /// [BitCursor::next_byte], failing when the current byte is past the end of `data`.
    pub fn skip_to_next_byte(&mut self, data: &[u8]) -> Result<(), ReadError> {
        if self.byte_index >= data.len() {
            return Err(ReadError::OutOfRange {
                byte_index: self.byte_index,
                len: data.len(),
            });
        }

        self.next_byte();
        Ok(())
    }

    /// Moves to the start of byte `byte_index`, which may be one past the
    /// last byte of `data` but no further.
    pub fn seek_byte(&mut self, data: &[u8], byte_index: usize) -> Result<(), ReadError> {
        if byte_index > data.len() {
            return Err(ReadError::OutOfRange {
                byte_index: byte_index - 1,
                len: data.len(),
            });
        }

        *self = BitCursor::at_byte(byte_index);
        Ok(())
    }

    /// Takes `len` whole bytes starting at the cursor's byte.
    pub fn take_bytes<'a>(&mut self, data: &'a [u8], len: usize) -> Result<&'a [u8], ReadError> {
        let out_of_range = |end: usize| ReadError::OutOfRange {
            byte_index: end.saturating_sub(1),
            len: data.len(),
        };
        let end = self
            .byte_index
            .checked_add(len)
            .ok_or_else(|| out_of_range(usize::MAX))?;
        let bytes = data
            .get(self.byte_index..end)
            .ok_or_else(|| out_of_range(end))?;
        self.advance(len * 8);
        Ok(bytes)
    }

    /// Reads a wide value as consecutive chunks of at most [`MAX_CHUNK_BITS`].
    pub fn chunks(bit_len: usize) -> impl Iterator<Item = usize> {
        let full = bit_len.saturating_sub(1) / MAX_CHUNK_BITS;
        let last = bit_len - full * MAX_CHUNK_BITS;
        std::iter::repeat_n(MAX_CHUNK_BITS, full).chain(std::iter::once(last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_wraps_into_next_byte() {
        let mut cursor = BitCursor::new();
        cursor.advance(4);
        cursor.advance(6);
        assert_eq!((cursor.byte_index(), cursor.bit_index()), (1, 2));
        assert_eq!(cursor.bit_position(), 10);
    }

    #[test]
    fn test_next_byte_always_moves() {
        let mut cursor = BitCursor::at_byte(2);
        cursor.next_byte();
        assert_eq!(cursor, BitCursor::at_byte(3));

        cursor.advance(3);
        cursor.next_byte();
        assert_eq!(cursor, BitCursor::at_byte(4));
    }

    #[test]
    fn test_read_chunk_moves_cursor() {
        let data = [0x97, 0x98];
        let mut cursor = BitCursor::new();
        cursor.advance(4);
        assert_eq!(cursor.read_chunk(&data, 6).unwrap(), 30);
        assert_eq!((cursor.byte_index(), cursor.bit_index()), (1, 2));
    }

    #[test]
    fn test_read_flag_counts_from_low_bit() {
        let data = [0b0000_0010];
        let mut cursor = BitCursor::new();
        assert!(!cursor.read_flag(&data).unwrap());
        assert!(cursor.read_flag(&data).unwrap());
        assert_eq!(cursor.bit_index(), 2);
    }

    #[test]
    fn test_take_bytes() {
        let data = [1, 2, 3, 4];
        let mut cursor = BitCursor::at_byte(1);
        assert_eq!(cursor.take_bytes(&data, 2).unwrap(), &[2, 3]);
        assert_eq!(cursor, BitCursor::at_byte(3));
        assert_eq!(
            cursor.take_bytes(&data, 2).unwrap_err(),
            ReadError::OutOfRange {
                byte_index: 4,
                len: 4
            }
        );
    }

    #[test]
    fn test_take_bytes_with_overflowing_length() {
        let mut cursor = BitCursor::at_byte(1);
        assert!(matches!(
            cursor.take_bytes(&[1, 2], usize::MAX),
            Err(ReadError::OutOfRange { len: 2, .. })
        ));
        assert_eq!(cursor, BitCursor::at_byte(1));
    }

    #[test]
    fn test_skip_stays_inside_buffer() {
        let data = [0, 0];
        let mut cursor = BitCursor::new();
        cursor.skip(&data, 12).unwrap();
        cursor.skip(&data, 4).unwrap();
        assert_eq!(cursor, BitCursor::at_byte(2));

        assert_eq!(
            cursor.skip(&data, 1).unwrap_err(),
            ReadError::OutOfRange {
                byte_index: 2,
                len: 2
            }
        );
        assert!(cursor.skip(&data, usize::MAX).is_err());
        assert_eq!(cursor, BitCursor::at_byte(2));
    }

    #[test]
    fn test_skip_to_next_byte_at_end() {
        let data = [0, 0];
        let mut cursor = BitCursor::at_byte(1);
        cursor.skip_to_next_byte(&data).unwrap();
        assert_eq!(cursor, BitCursor::at_byte(2));
        assert_eq!(
            cursor.skip_to_next_byte(&data).unwrap_err(),
            ReadError::OutOfRange {
                byte_index: 2,
                len: 2
            }
        );
    }

    #[test]
    fn test_seek_byte() {
        let data = [0, 0, 0];
        let mut cursor = BitCursor::new();
        cursor.advance(3);
        cursor.seek_byte(&data, 3).unwrap();
        assert_eq!(cursor, BitCursor::at_byte(3));
        assert_eq!(
            cursor.seek_byte(&data, 5).unwrap_err(),
            ReadError::OutOfRange {
                byte_index: 4,
                len: 3
            }
        );
    }

    #[test]
    fn test_chunks() {
        assert_eq!(BitCursor::chunks(1).collect::<Vec<_>>(), vec![1]);
        assert_eq!(BitCursor::chunks(8).collect::<Vec<_>>(), vec![8]);
        assert_eq!(BitCursor::chunks(13).collect::<Vec<_>>(), vec![8, 5]);
        assert_eq!(BitCursor::chunks(33).collect::<Vec<_>>(), vec![8, 8, 8, 8, 1]);
    }
}
