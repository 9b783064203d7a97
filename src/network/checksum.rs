//! Internet checksum (RFC 1071)
//!
//! Algorithm: sum the data in 16-bit big-endian words, pad an odd trailing
//! byte with a zero low byte, and fold every carry out of bit 16 back into
//! bit 0. The checksum written on the wire is the one's complement of that
//! folded sum; a range that already contains its checksum sums to 0xFFFF.

use byteorder::{BigEndian, ByteOrder};

/// Folds a 32-bit accumulator into 16 bits with end-around carry
#[inline]
fn fold(mut sum: u32) -> u16 {
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum as u16
}

/// One's-complement sum of `data`, not complemented
pub fn ones_complement_sum(data: &[u8]) -> u16 {
    let mut sum = 0u32;

    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum += BigEndian::read_u16(chunk) as u32;
        // A u32 overflows only after ~65k words; fold well before that.
        if sum & 0x8000_0000 != 0 {
            sum = fold(sum) as u32;
        }
    }

    if let [last] = chunks.remainder() {
        sum += (*last as u32) << 8;
    }

    fold(sum)
}

/// Adds two folded sums with end-around carry
pub fn ones_complement_add(a: u16, b: u16) -> u16 {
    fold(a as u32 + b as u32)
}

/// The value to store in a checksum field covering `data`
///
/// `data` must have its checksum field zeroed.
pub fn checksum(data: &[u8]) -> u16 {
    !ones_complement_sum(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc1071_example() {
        // RFC 1071 section 3 worked example
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(ones_complement_sum(&data), 0xddf2);
        assert_eq!(checksum(&data), 0x220d);
    }

    #[test]
    fn odd_length_pads_low_byte() {
        assert_eq!(ones_complement_sum(&[0xAB]), 0xAB00);
        assert_eq!(ones_complement_sum(&[0x12, 0x34, 0x56]), 0x1234 + 0x5600);
    }

    #[test]
    fn carries_fold_back() {
        assert_eq!(ones_complement_sum(&[0xFF, 0xFF, 0x00, 0x01]), 0x0001);
        assert_eq!(ones_complement_add(0xFFFF, 0x0001), 0x0001);
        assert_eq!(ones_complement_add(0x8000, 0x8000), 0x0001);
    }

    #[test]
    fn empty_range_sums_to_zero() {
        assert_eq!(ones_complement_sum(&[]), 0);
        assert_eq!(checksum(&[]), 0xFFFF);
    }

    #[test]
    fn long_ranges_do_not_overflow() {
        let data = vec![0xFFu8; 200_000];
        assert_eq!(ones_complement_sum(&data), 0xFFFF);
    }

    #[test]
    fn range_with_its_checksum_sums_to_all_ones() {
        let mut data = [0x45, 0x00, 0x00, 0x1c, 0x00, 0x00, 0x00, 0x00];
        let value = checksum(&data);
        data[4..6].copy_from_slice(&value.to_be_bytes());
        assert_eq!(ones_complement_sum(&data), 0xFFFF);
    }
}
