//! Pseudo-headers for upper-layer checksums
//!
//! Transport checksums cover a synthetic prefix built from the enclosing IP
//! header, followed by the segment itself. The prefix is never transmitted;
//! the output here exists only to be fed to the checksum engine. A trailing
//! zero byte is appended when the segment length is odd so the engine sees
//! whole 16-bit words.

use std::net::{Ipv4Addr, Ipv6Addr};

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};

/// Size of the IPv4 pseudo-header prefix
pub const IPV4_PSEUDO_HEADER_LEN: usize = 12;
/// Size of the IPv6 pseudo-header prefix
pub const IPV6_PSEUDO_HEADER_LEN: usize = 40;

fn with_padding(mut bytes: Vec<u8>, upper: &[u8]) -> Vec<u8> {
    bytes.extend_from_slice(upper);
    if upper.len() % 2 != 0 {
        bytes.push(0);
    }
    bytes
}

/// `[src][dst][0x00][protocol][length16][upper][pad]`
pub fn ipv4(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8, upper: &[u8]) -> Result<Vec<u8>> {
    let upper_len = u16::try_from(upper.len()).map_err(|_| Error::FieldRange {
        field: "upper-layer length",
        value: upper.len(),
    })?;

    let mut bytes = Vec::with_capacity(IPV4_PSEUDO_HEADER_LEN + upper.len() + 1);
    bytes.resize(IPV4_PSEUDO_HEADER_LEN, 0);
    bytes[0..4].copy_from_slice(&src.octets());
    bytes[4..8].copy_from_slice(&dst.octets());
    bytes[9] = protocol;
    BigEndian::write_u16(&mut bytes[10..12], upper_len);

    Ok(with_padding(bytes, upper))
}

/// `[src][dst][length32][0x000000][next header][upper][pad]` (RFC 8200 section 8.1)
pub fn ipv6(src: Ipv6Addr, dst: Ipv6Addr, next_header: u8, upper: &[u8]) -> Result<Vec<u8>> {
    let upper_len = u32::try_from(upper.len()).map_err(|_| Error::FieldRange {
        field: "upper-layer length",
        value: upper.len(),
    })?;

    let mut bytes = Vec::with_capacity(IPV6_PSEUDO_HEADER_LEN + upper.len() + 1);
    bytes.resize(IPV6_PSEUDO_HEADER_LEN, 0);
    bytes[0..16].copy_from_slice(&src.octets());
    bytes[16..32].copy_from_slice(&dst.octets());
    BigEndian::write_u32(&mut bytes[32..36], upper_len);
    bytes[39] = next_header;

    Ok(with_padding(bytes, upper))
}
