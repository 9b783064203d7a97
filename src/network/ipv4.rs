//! IPv4 header view
//!
//! This module provides zero-copy access to an IPv4 header (RFC 791) that
//! lives inside a larger packet buffer. Every accessor reads the backing
//! bytes directly and every setter writes them in place; nothing is cached.
//!
//! Features:
//! - Header parsing with length validation done once, up front
//! - Bit-packed accessors for version/IHL, DSCP/ECN and flags/fragment offset
//! - Header checksum computation and validation
//! - Header construction from addresses, and whole packets via [`Ipv4Builder`]

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use byteorder::{BigEndian, ByteOrder};

use crate::decode::Protocol;
use crate::error::{Error, Result};
use crate::field::{read_bits16, read_bits8, write_bits16, write_bits8};
use crate::network::checksum::{ones_complement_add, ones_complement_sum};
use crate::network::{pseudo, IpHeader, IpProtocol};

/// Minimum (and option-less) header length in bytes
pub const IPV4_HEADER_LEN: usize = 20;
/// Largest header the 4-bit IHL field can describe
pub const IPV4_MAX_HEADER_LEN: usize = 60;
pub const IPV4_VERSION: u8 = 4;
const MIN_IHL: u8 = 5; // 5 * 4 = 20 bytes
const MAX_IHL: u8 = 15;
const DEFAULT_TTL: u8 = 64;

mod layout {
    use std::ops::Range;

    pub const VER_IHL: usize = 0;
    pub const TOS: usize = 1;
    pub const TOTAL_LEN: Range<usize> = 2..4;
    pub const IDENT: Range<usize> = 4..6;
    pub const FLAGS_FRAG: usize = 6;
    pub const TTL: usize = 8;
    pub const PROTOCOL: usize = 9;
    pub const CHECKSUM: Range<usize> = 10..12;
    pub const SRC_ADDR: Range<usize> = 12..16;
    pub const DST_ADDR: Range<usize> = 16..20;
}

/// IPv4 flag bits, as they appear in the 3-bit flags field
pub mod flags {
    pub const RESERVED: u8 = 0b100;
    pub const DONT_FRAGMENT: u8 = 0b010;
    pub const MORE_FRAGMENTS: u8 = 0b001;
    pub const FRAGMENT_OFFSET_MASK: u16 = 0x1FFF;
}

/// A view of an IPv4 header at the start of `buffer`
///
/// The buffer may extend past the header; the bytes after it are the
/// payload, bounded by the total-length field.
#[derive(Clone)]
pub struct Ipv4Header<B> {
    buffer: B,
}

impl<B: AsRef<[u8]>> Ipv4Header<B> {
    /// Wraps `buffer` without validating it
    ///
    /// The buffer must hold at least the header length declared in its IHL
    /// field, and that length must be at least 20 bytes; accessors index the
    /// buffer directly and panic otherwise.
    pub fn new_unchecked(buffer: B) -> Self {
        Ipv4Header { buffer }
    }

    /// Validates the header lengths and wraps `buffer`
    pub fn parse(buffer: B) -> Result<Self> {
        let available = buffer.as_ref().len();
        if available < IPV4_HEADER_LEN {
            return Err(Error::too_short(Protocol::Ipv4, available, IPV4_HEADER_LEN));
        }

        let header = Ipv4Header::new_unchecked(buffer);
        let declared = header.header_len();
        if declared < IPV4_HEADER_LEN {
            return Err(Error::length_too_small(Protocol::Ipv4, declared, IPV4_HEADER_LEN));
        }
        if declared > available {
            return Err(Error::truncated(Protocol::Ipv4, declared, available));
        }

        Ok(header)
    }

    /// Gives back the backing buffer
    pub fn into_inner(self) -> B {
        self.buffer
    }

    /// The whole backing buffer, header and anything after it
    pub fn buffer(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    /// The header bytes, options included
    pub fn header_bytes(&self) -> &[u8] {
        &self.buffer.as_ref()[..self.header_len()]
    }

    /// The version nibble, 4 for a well-formed header
    pub fn version(&self) -> u8 {
        read_bits8(self.buffer.as_ref(), layout::VER_IHL, 0xF0, 4)
    }

    /// Header length in 32-bit words (the IHL field)
    pub fn header_len_words(&self) -> u8 {
        read_bits8(self.buffer.as_ref(), layout::VER_IHL, 0x0F, 0)
    }

    /// Header length in bytes
    pub fn header_len(&self) -> usize {
        self.header_len_words() as usize * 4
    }

    /// Type of service byte (DSCP and ECN together)
    pub fn tos(&self) -> u8 {
        self.buffer.as_ref()[layout::TOS]
    }

    /// Differentiated services code point, the upper six TOS bits
    pub fn dscp(&self) -> u8 {
        read_bits8(self.buffer.as_ref(), layout::TOS, 0xFC, 2)
    }

    /// Explicit congestion notification, the low two TOS bits
    pub fn ecn(&self) -> u8 {
        read_bits8(self.buffer.as_ref(), layout::TOS, 0x03, 0)
    }

    /// Header plus payload length in bytes, as declared
    pub fn total_len(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[layout::TOTAL_LEN])
    }

    /// Total length minus header length, saturating at zero
    pub fn payload_len(&self) -> u16 {
        self.total_len().saturating_sub(self.header_len() as u16)
    }

    /// Identification used to group fragments
    pub fn identification(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[layout::IDENT])
    }

    /// The 3-bit flags field, see [`flags`]
    pub fn flags(&self) -> u8 {
        read_bits16(self.buffer.as_ref(), layout::FLAGS_FRAG, 0xE000, 13) as u8
    }

    /// Is the DF bit set
    pub fn dont_fragment(&self) -> bool {
        self.flags() & flags::DONT_FRAGMENT != 0
    }

    /// Is the MF bit set
    pub fn more_fragments(&self) -> bool {
        self.flags() & flags::MORE_FRAGMENTS != 0
    }

    /// Fragment offset in 8-byte units
    pub fn fragment_offset(&self) -> u16 {
        read_bits16(
            self.buffer.as_ref(),
            layout::FLAGS_FRAG,
            flags::FRAGMENT_OFFSET_MASK,
            0,
        )
    }

    /// Time to live
    pub fn ttl(&self) -> u8 {
        self.buffer.as_ref()[layout::TTL]
    }

    /// Protocol carried in the payload
    pub fn protocol(&self) -> IpProtocol {
        IpProtocol::from(self.buffer.as_ref()[layout::PROTOCOL])
    }

    /// The checksum field as stored
    pub fn checksum(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[layout::CHECKSUM])
    }

    /// Source address
    pub fn src_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(BigEndian::read_u32(&self.buffer.as_ref()[layout::SRC_ADDR]))
    }

    /// Destination address
    pub fn dst_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(BigEndian::read_u32(&self.buffer.as_ref()[layout::DST_ADDR]))
    }

    /// Option bytes between the fixed header and the payload
    pub fn options(&self) -> &[u8] {
        &self.buffer.as_ref()[IPV4_HEADER_LEN..self.header_len()]
    }

    /// End of the payload within the buffer
    ///
    /// The total-length field bounds the payload when it is consistent with
    /// the header length and the buffer; otherwise the payload runs to the
    /// end of the buffer (truncated captures, TSO-zeroed lengths).
    pub fn payload_end(&self) -> usize {
        let available = self.buffer.as_ref().len();
        let total = self.total_len() as usize;
        if total >= self.header_len() && total <= available {
            total
        } else {
            available
        }
    }

    /// Bytes after the header, up to [`Ipv4Header::payload_end`]
    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[self.header_len()..self.payload_end()]
    }

    /// Sum over a scratch copy of the header with the checksum field zeroed
    fn zeroed_sum(&self) -> Option<u16> {
        let len = self.header_len();
        if len < IPV4_HEADER_LEN {
            return None;
        }
        let bytes = self.buffer.as_ref().get(..len)?;

        let mut scratch = [0u8; IPV4_MAX_HEADER_LEN];
        scratch[..len].copy_from_slice(bytes);
        scratch[layout::CHECKSUM].fill(0);
        Some(ones_complement_sum(&scratch[..len]))
    }

    /// The value that belongs in the checksum field for the current header
    ///
    /// This never writes the field; see [`Ipv4Header::fill_checksum`].
    /// Returns `None` when the header declares less than the 20 byte minimum
    /// or more bytes than the buffer holds.
    pub fn compute_checksum(&self) -> Option<u16> {
        self.zeroed_sum().map(|sum| !sum)
    }

    /// Does the stored checksum match the header contents
    ///
    /// A header declaring less than the 20 byte minimum is never valid.
    pub fn valid_checksum(&self) -> bool {
        match self.zeroed_sum() {
            Some(sum) => ones_complement_add(sum, self.checksum()) == 0xFFFF,
            None => false,
        }
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Ipv4Header<B> {
    /// The whole backing buffer, for editing
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        self.buffer.as_mut()
    }

    /// Sets the version nibble, leaving the IHL nibble untouched
    pub fn set_version(&mut self, version: u8) {
        write_bits8(self.buffer.as_mut(), layout::VER_IHL, 0xF0, 4, version);
    }

    /// Sets the IHL nibble, leaving the version nibble untouched
    ///
    /// The new length must be between 5 and 15 words and fit in the buffer.
    /// Windows computed from the old length (a decoded chain) are stale
    /// afterwards and must be rebuilt.
    pub fn set_header_len_words(&mut self, words: u8) -> Result<()> {
        if !(MIN_IHL..=MAX_IHL).contains(&words) {
            return Err(Error::FieldRange {
                field: "ipv4 header length",
                value: words as usize,
            });
        }
        let declared = words as usize * 4;
        let available = self.buffer.as_ref().len();
        if declared > available {
            return Err(Error::truncated(Protocol::Ipv4, declared, available));
        }
        write_bits8(self.buffer.as_mut(), layout::VER_IHL, 0x0F, 0, words);
        Ok(())
    }

    /// Overwrites the TOS byte, DSCP and ECN together
    pub fn set_tos(&mut self, tos: u8) {
        self.buffer.as_mut()[layout::TOS] = tos;
    }

    /// Sets DSCP, leaving ECN untouched
    pub fn set_dscp(&mut self, dscp: u8) {
        write_bits8(self.buffer.as_mut(), layout::TOS, 0xFC, 2, dscp);
    }

    /// Sets ECN, leaving DSCP untouched
    pub fn set_ecn(&mut self, ecn: u8) {
        write_bits8(self.buffer.as_mut(), layout::TOS, 0x03, 0, ecn);
    }

    /// Sets the total-length field as given, without checking it
    pub fn set_total_len(&mut self, total_len: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[layout::TOTAL_LEN], total_len);
    }

    /// Writes `header_len + payload_len` into the total-length field
    pub fn set_payload_len(&mut self, payload_len: u16) -> Result<()> {
        let total = (self.header_len() as u16)
            .checked_add(payload_len)
            .ok_or(Error::FieldRange {
                field: "ipv4 payload length",
                value: payload_len as usize,
            })?;
        self.set_total_len(total);
        Ok(())
    }

    pub fn set_identification(&mut self, id: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[layout::IDENT], id);
    }

    /// Sets the 3-bit flags field, leaving the fragment offset untouched
    pub fn set_flags(&mut self, value: u8) {
        write_bits16(
            self.buffer.as_mut(),
            layout::FLAGS_FRAG,
            0xE000,
            13,
            (value & 0x07) as u16,
        );
    }

    pub fn set_dont_fragment(&mut self, on: bool) {
        self.toggle_flag(flags::DONT_FRAGMENT, on);
    }

    pub fn set_more_fragments(&mut self, on: bool) {
        self.toggle_flag(flags::MORE_FRAGMENTS, on);
    }

    fn toggle_flag(&mut self, flag: u8, on: bool) {
        let current = self.flags();
        self.set_flags(if on { current | flag } else { current & !flag });
    }

    /// Sets the 13-bit fragment offset, leaving the flags untouched
    pub fn set_fragment_offset(&mut self, offset: u16) {
        write_bits16(
            self.buffer.as_mut(),
            layout::FLAGS_FRAG,
            flags::FRAGMENT_OFFSET_MASK,
            0,
            offset,
        );
    }

    /// Sets the time to live
    pub fn set_ttl(&mut self, ttl: u8) {
        self.buffer.as_mut()[layout::TTL] = ttl;
    }

    pub fn set_protocol(&mut self, protocol: IpProtocol) {
        self.buffer.as_mut()[layout::PROTOCOL] = protocol.into();
    }

    /// Stores `checksum` verbatim
    pub fn set_checksum(&mut self, checksum: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[layout::CHECKSUM], checksum);
    }

    /// Computes the header checksum and stores it
    ///
    /// Fails, leaving the buffer untouched, when the declared header length
    /// cannot be summed.
    pub fn fill_checksum(&mut self) -> Result<()> {
        let value = self.compute_checksum().ok_or_else(|| {
            let (declared, available) = (self.header_len(), self.buffer.as_ref().len());
            if declared < IPV4_HEADER_LEN {
                Error::length_too_small(Protocol::Ipv4, declared, IPV4_HEADER_LEN)
            } else {
                Error::truncated(Protocol::Ipv4, declared, available)
            }
        })?;
        self.set_checksum(value);
        Ok(())
    }

    /// Sets the source address
    pub fn set_src_addr(&mut self, addr: Ipv4Addr) {
        self.buffer.as_mut()[layout::SRC_ADDR].copy_from_slice(&addr.octets());
    }

    pub fn set_dst_addr(&mut self, addr: Ipv4Addr) {
        self.buffer.as_mut()[layout::DST_ADDR].copy_from_slice(&addr.octets());
    }

    /// Option bytes, for editing
    pub fn options_mut(&mut self) -> &mut [u8] {
        let end = self.header_len();
        &mut self.buffer.as_mut()[IPV4_HEADER_LEN..end]
    }

    /// Payload bytes, for editing
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let (start, end) = (self.header_len(), self.payload_end());
        &mut self.buffer.as_mut()[start..end]
    }
}

impl<'a> Ipv4Header<&'a [u8]> {
    /// Parses the header starting `offset` bytes into `buffer`
    pub fn parse_at(buffer: &'a [u8], offset: usize) -> Result<Self> {
        let rest = buffer.get(offset..).ok_or_else(|| out_of_bounds(offset, buffer.len()))?;
        Ipv4Header::parse(rest)
    }
}

impl<'a> Ipv4Header<&'a mut [u8]> {
    /// Parses the header starting `offset` bytes into `buffer`, for editing
    pub fn parse_at_mut(buffer: &'a mut [u8], offset: usize) -> Result<Self> {
        let len = buffer.len();
        let rest = buffer.get_mut(offset..).ok_or_else(|| out_of_bounds(offset, len))?;
        Ipv4Header::parse(rest)
    }
}

fn out_of_bounds(offset: usize, len: usize) -> Error {
    Error::MalformedHeader {
        protocol: Protocol::Ipv4,
        reason: crate::error::Malformed::OffsetOutOfBounds { offset, len },
    }
}

impl Ipv4Header<Vec<u8>> {
    /// Allocates a minimal header carrying the two addresses
    ///
    /// Version is 4, IHL is 5 and the total length covers only the header.
    /// Every other field is zero, and no checksum is computed.
    pub fn build(src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        let mut header = Ipv4Header::new_unchecked(vec![0u8; IPV4_HEADER_LEN]);
        header.set_version(IPV4_VERSION);
        write_bits8(header.buffer.as_mut(), layout::VER_IHL, 0x0F, 0, MIN_IHL);
        header.set_total_len(IPV4_HEADER_LEN as u16);
        header.set_src_addr(src);
        header.set_dst_addr(dst);
        header
    }
}

impl<B: AsRef<[u8]>> IpHeader for Ipv4Header<B> {
    fn version(&self) -> u8 {
        Ipv4Header::version(self)
    }

    fn header_len(&self) -> usize {
        Ipv4Header::header_len(self)
    }

    fn payload_len(&self) -> usize {
        Ipv4Header::payload_len(self) as usize
    }

    fn next_protocol(&self) -> IpProtocol {
        self.protocol()
    }

    fn src_addr(&self) -> IpAddr {
        IpAddr::V4(Ipv4Header::src_addr(self))
    }

    fn dst_addr(&self) -> IpAddr {
        IpAddr::V4(Ipv4Header::dst_addr(self))
    }

    fn pseudo_header(&self, upper: &[u8]) -> Result<Vec<u8>> {
        pseudo::ipv4(
            Ipv4Header::src_addr(self),
            Ipv4Header::dst_addr(self),
            self.protocol().into(),
            upper,
        )
    }
}

impl<B: AsRef<[u8]>> fmt::Debug for Ipv4Header<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ipv4Header")
            .field("version", &self.version())
            .field("ihl", &self.header_len_words())
            .field("tos", &self.tos())
            .field("total_len", &self.total_len())
            .field("id", &self.identification())
            .field("flags", &self.flags())
            .field("frag_offset", &self.fragment_offset())
            .field("ttl", &self.ttl())
            .field("protocol", &self.protocol())
            .field("checksum", &format_args!("{:#06x}", self.checksum()))
            .field("src", &self.src_addr())
            .field("dst", &self.dst_addr())
            .finish()
    }
}

/// Builds complete IPv4 packets around a payload
///
/// Unlike [`Ipv4Header::build`], the result is ready to send: the total
/// length covers the payload and the header checksum is filled in as the
/// final step.
#[derive(Debug, Clone)]
pub struct Ipv4Builder {
    src: Ipv4Addr,
    dst: Ipv4Addr,
    protocol: IpProtocol,
    ttl: u8,
    tos: u8,
    identification: u16,
    dont_fragment: bool,
}

impl Ipv4Builder {
    /// Starts a packet with TTL 64 and every other field zero
    pub fn new(src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        Ipv4Builder {
            src,
            dst,
            protocol: IpProtocol::Unknown(0),
            ttl: DEFAULT_TTL,
            tos: 0,
            identification: 0,
            dont_fragment: false,
        }
    }

    pub fn protocol(mut self, protocol: IpProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn tos(mut self, tos: u8) -> Self {
        self.tos = tos;
        self
    }

    pub fn identification(mut self, id: u16) -> Self {
        self.identification = id;
        self
    }

    pub fn dont_fragment(mut self, on: bool) -> Self {
        self.dont_fragment = on;
        self
    }

    /// Emits header and payload as one buffer
    pub fn build(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let payload_len = u16::try_from(payload.len()).map_err(|_| Error::FieldRange {
            field: "ipv4 payload length",
            value: payload.len(),
        })?;

        let mut packet = Ipv4Header::build(self.src, self.dst).into_inner();
        packet.extend_from_slice(payload);

        let mut header = Ipv4Header::new_unchecked(packet);
        header.set_payload_len(payload_len)?;
        header.set_protocol(self.protocol);
        header.set_ttl(self.ttl);
        header.set_tos(self.tos);
        header.set_identification(self.identification);
        header.set_dont_fragment(self.dont_fragment);
        header.fill_checksum()?;

        Ok(header.into_inner())
    }
}
