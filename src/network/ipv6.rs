//! IPv6 fixed header view (RFC 8200)
//!
//! Only the 40-byte fixed header is interpreted. Extension headers are not
//! walked; their next-header codes end a decoded chain as opaque payload.

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};

use byteorder::{BigEndian, ByteOrder};

use crate::decode::Protocol;
use crate::error::{Error, Result};
use crate::field::{read_bits32, write_bits32};
use crate::network::{pseudo, IpHeader, IpProtocol};

pub const IPV6_HEADER_LEN: usize = 40;
pub const IPV6_VERSION: u8 = 6;

mod layout {
    use std::ops::Range;

    pub const VER_TC_FLOW: usize = 0;
    pub const PAYLOAD_LEN: Range<usize> = 4..6;
    pub const NEXT_HEADER: usize = 6;
    pub const HOP_LIMIT: usize = 7;
    pub const SRC_ADDR: Range<usize> = 8..24;
    pub const DST_ADDR: Range<usize> = 24..40;
}

const VERSION_MASK: u32 = 0xF000_0000;
const TRAFFIC_CLASS_MASK: u32 = 0x0FF0_0000;
const FLOW_LABEL_MASK: u32 = 0x000F_FFFF;

/// A view of an IPv6 fixed header at the start of `buffer`
#[derive(Clone)]
pub struct Ipv6Header<B> {
    buffer: B,
}

impl<B: AsRef<[u8]>> Ipv6Header<B> {
    /// Wraps `buffer` without validating it; it must hold at least 40 bytes
    pub fn new_unchecked(buffer: B) -> Self {
        Ipv6Header { buffer }
    }

    /// Checks the buffer holds the fixed 40 byte header and wraps it
    pub fn parse(buffer: B) -> Result<Self> {
        let available = buffer.as_ref().len();
        if available < IPV6_HEADER_LEN {
            return Err(Error::too_short(Protocol::Ipv6, available, IPV6_HEADER_LEN));
        }
        Ok(Ipv6Header::new_unchecked(buffer))
    }

    /// Gives back the backing buffer
    pub fn into_inner(self) -> B {
        self.buffer
    }

    /// The whole backing buffer
    pub fn buffer(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    /// The version nibble, 6 for a well-formed header
    pub fn version(&self) -> u8 {
        read_bits32(self.buffer.as_ref(), layout::VER_TC_FLOW, VERSION_MASK, 28) as u8
    }

    /// Traffic class, the 8 bits after the version
    pub fn traffic_class(&self) -> u8 {
        read_bits32(self.buffer.as_ref(), layout::VER_TC_FLOW, TRAFFIC_CLASS_MASK, 20) as u8
    }

    /// The 20-bit flow label
    pub fn flow_label(&self) -> u32 {
        read_bits32(self.buffer.as_ref(), layout::VER_TC_FLOW, FLOW_LABEL_MASK, 0)
    }

    /// Length of everything after the fixed header, as declared
    pub fn payload_len(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[layout::PAYLOAD_LEN])
    }

    /// Protocol or extension header that follows
    pub fn next_header(&self) -> IpProtocol {
        IpProtocol::from(self.buffer.as_ref()[layout::NEXT_HEADER])
    }

    /// Hop limit, the IPv6 counterpart of TTL
    pub fn hop_limit(&self) -> u8 {
        self.buffer.as_ref()[layout::HOP_LIMIT]
    }

    /// Source address
    pub fn src_addr(&self) -> Ipv6Addr {
        Ipv6Addr::from(BigEndian::read_u128(&self.buffer.as_ref()[layout::SRC_ADDR]))
    }

    /// Destination address
    pub fn dst_addr(&self) -> Ipv6Addr {
        Ipv6Addr::from(BigEndian::read_u128(&self.buffer.as_ref()[layout::DST_ADDR]))
    }

    /// End of the payload, bounded by the payload-length field when it fits
    pub fn payload_end(&self) -> usize {
        let available = self.buffer.as_ref().len();
        let end = IPV6_HEADER_LEN + self.payload_len() as usize;
        end.min(available)
    }

    /// Bytes after the fixed header
    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[IPV6_HEADER_LEN..self.payload_end()]
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Ipv6Header<B> {
    /// Sets the version nibble, leaving the traffic class untouched
    pub fn set_version(&mut self, version: u8) {
        let buf = self.buffer.as_mut();
        write_bits32(buf, layout::VER_TC_FLOW, VERSION_MASK, 28, version as u32);
    }

    /// Sets the traffic class, leaving version and flow label untouched
    pub fn set_traffic_class(&mut self, class: u8) {
        let buf = self.buffer.as_mut();
        write_bits32(buf, layout::VER_TC_FLOW, TRAFFIC_CLASS_MASK, 20, class as u32);
    }

    /// Sets the flow label; bits past 20 are dropped
    pub fn set_flow_label(&mut self, label: u32) {
        write_bits32(self.buffer.as_mut(), layout::VER_TC_FLOW, FLOW_LABEL_MASK, 0, label);
    }

    /// Sets the payload-length field as given
    pub fn set_payload_len(&mut self, len: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[layout::PAYLOAD_LEN], len);
    }

    /// Sets the next-header code
    pub fn set_next_header(&mut self, next: IpProtocol) {
        self.buffer.as_mut()[layout::NEXT_HEADER] = next.into();
    }

    pub fn set_hop_limit(&mut self, hops: u8) {
        self.buffer.as_mut()[layout::HOP_LIMIT] = hops;
    }

    /// Sets the source address
    pub fn set_src_addr(&mut self, addr: Ipv6Addr) {
        self.buffer.as_mut()[layout::SRC_ADDR].copy_from_slice(&addr.octets());
    }

    /// Sets the destination address
    pub fn set_dst_addr(&mut self, addr: Ipv6Addr) {
        self.buffer.as_mut()[layout::DST_ADDR].copy_from_slice(&addr.octets());
    }
}

impl Ipv6Header<Vec<u8>> {
    /// Allocates a fixed header carrying the two addresses, every other field zero
    pub fn build(src: Ipv6Addr, dst: Ipv6Addr) -> Self {
        let mut header = Ipv6Header::new_unchecked(vec![0u8; IPV6_HEADER_LEN]);
        header.set_version(IPV6_VERSION);
        header.set_src_addr(src);
        header.set_dst_addr(dst);
        header
    }
}

impl<B: AsRef<[u8]>> IpHeader for Ipv6Header<B> {
    fn version(&self) -> u8 {
        Ipv6Header::version(self)
    }

    fn header_len(&self) -> usize {
        IPV6_HEADER_LEN
    }

    fn payload_len(&self) -> usize {
        Ipv6Header::payload_len(self) as usize
    }

    fn next_protocol(&self) -> IpProtocol {
        self.next_header()
    }

    fn src_addr(&self) -> IpAddr {
        IpAddr::V6(Ipv6Header::src_addr(self))
    }

    fn dst_addr(&self) -> IpAddr {
        IpAddr::V6(Ipv6Header::dst_addr(self))
    }

    fn pseudo_header(&self, upper: &[u8]) -> Result<Vec<u8>> {
        pseudo::ipv6(
            Ipv6Header::src_addr(self),
            Ipv6Header::dst_addr(self),
            self.next_header().into(),
            upper,
        )
    }
}

impl<B: AsRef<[u8]>> fmt::Debug for Ipv6Header<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ipv6Header")
            .field("version", &self.version())
            .field("traffic_class", &self.traffic_class())
            .field("flow_label", &self.flow_label())
            .field("payload_len", &self.payload_len())
            .field("next_header", &self.next_header())
            .field("hop_limit", &self.hop_limit())
            .field("src", &self.src_addr())
            .field("dst", &self.dst_addr())
            .finish()
    }
}
