//! Bit-packed big-endian field access.
//!
//! Sub-word fields are described by the index of their containing word, a
//! mask over that word and the shift of the field's lowest bit. Writes read
//! the whole word, clear the masked bits, merge the new value and store the
//! word back, so sibling fields sharing the word are preserved. Values wider
//! than the field are truncated to the field width.
//!
//! Callers validate buffer sizes once at parse time; these helpers index
//! directly.

use byteorder::{BigEndian, ByteOrder};

#[inline]
pub(crate) fn read_bits8(buf: &[u8], at: usize, mask: u8, shift: u32) -> u8 {
    (buf[at] & mask) >> shift
}

#[inline]
pub(crate) fn write_bits8(buf: &mut [u8], at: usize, mask: u8, shift: u32, value: u8) {
    let merged = (buf[at] & !mask) | ((value << shift) & mask);
    buf[at] = merged;
}

#[inline]
pub(crate) fn read_bits16(buf: &[u8], at: usize, mask: u16, shift: u32) -> u16 {
    (BigEndian::read_u16(&buf[at..at + 2]) & mask) >> shift
}

#[inline]
pub(crate) fn write_bits16(buf: &mut [u8], at: usize, mask: u16, shift: u32, value: u16) {
    let word = BigEndian::read_u16(&buf[at..at + 2]);
    let merged = (word & !mask) | ((value << shift) & mask);
    BigEndian::write_u16(&mut buf[at..at + 2], merged);
}

#[inline]
pub(crate) fn read_bits32(buf: &[u8], at: usize, mask: u32, shift: u32) -> u32 {
    (BigEndian::read_u32(&buf[at..at + 4]) & mask) >> shift
}

#[inline]
pub(crate) fn write_bits32(buf: &mut [u8], at: usize, mask: u32, shift: u32, value: u32) {
    let word = BigEndian::read_u32(&buf[at..at + 4]);
    let merged = (word & !mask) | ((value << shift) & mask);
    BigEndian::write_u32(&mut buf[at..at + 4], merged);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nibbles_are_independent() {
        let mut buf = [0x45u8];
        write_bits8(&mut buf, 0, 0xF0, 4, 6);
        assert_eq!(buf[0], 0x65);
        write_bits8(&mut buf, 0, 0x0F, 0, 0xF);
        assert_eq!(buf[0], 0x6F);
        assert_eq!(read_bits8(&buf, 0, 0xF0, 4), 6);
    }

    #[test]
    fn oversized_values_truncate_to_field() {
        let mut buf = [0u8; 2];
        write_bits16(&mut buf, 0, 0xE000, 13, 0xFF);
        assert_eq!(buf, [0xE0, 0x00]);
        write_bits16(&mut buf, 0, 0x1FFF, 0, 0xFFFF);
        assert_eq!(buf, [0xFF, 0xFF]);
        assert_eq!(read_bits16(&buf, 0, 0xE000, 13), 0x7);
    }

    #[test]
    fn word_fields_straddle_bytes() {
        let mut buf = [0x60u8, 0, 0, 0];
        write_bits32(&mut buf, 0, 0x0FF0_0000, 20, 0xAB);
        write_bits32(&mut buf, 0, 0x000F_FFFF, 0, 0x12345);
        assert_eq!(buf, [0x6A, 0xB1, 0x23, 0x45]);
        assert_eq!(read_bits32(&buf, 0, 0xF000_0000, 28), 6);
    }
}
