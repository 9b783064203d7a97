//! Network layer protocols
//!
//! This module contains the IP-family header views and what they share:
//! - IPv4 and IPv6 header views
//! - ICMP (carried by IPv4)
//! - The Internet checksum and upper-layer pseudo-headers
//!
//! [`IpHeader`] is the capability both IP versions provide to the layers
//! above them; [`IpHeaderView`] picks the version from the first nibble.

pub mod checksum;
pub mod icmp;
pub mod ipv4;
pub mod ipv6;
pub mod pseudo;

use std::fmt;
use std::net::IpAddr;

pub use checksum::{checksum, ones_complement_add, ones_complement_sum};
pub use icmp::{IcmpHeader, ICMP_TYPE_ECHO_REPLY, ICMP_TYPE_ECHO_REQUEST};
pub use ipv4::{flags, Ipv4Builder, Ipv4Header};
pub use ipv6::Ipv6Header;

use crate::decode::Protocol;
use crate::error::{Error, Result};

/// IP protocol numbers (IANA "Assigned Internet Protocol Numbers")
pub mod protocol {
    pub const ICMP: u8 = 1;
    pub const IPV4: u8 = 4;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
    pub const IPV6: u8 = 41;
}

/// The "next protocol" code carried by an IP header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpProtocol {
    Icmp,
    /// IPv4 encapsulated in IP
    Ipv4,
    Tcp,
    Udp,
    /// IPv6 encapsulated in IP
    Ipv6,
    Unknown(u8),
}

impl From<u8> for IpProtocol {
    fn from(code: u8) -> Self {
        match code {
            protocol::ICMP => IpProtocol::Icmp,
            protocol::IPV4 => IpProtocol::Ipv4,
            protocol::TCP => IpProtocol::Tcp,
            protocol::UDP => IpProtocol::Udp,
            protocol::IPV6 => IpProtocol::Ipv6,
            other => IpProtocol::Unknown(other),
        }
    }
}

impl From<IpProtocol> for u8 {
    fn from(value: IpProtocol) -> u8 {
        match value {
            IpProtocol::Icmp => protocol::ICMP,
            IpProtocol::Ipv4 => protocol::IPV4,
            IpProtocol::Tcp => protocol::TCP,
            IpProtocol::Udp => protocol::UDP,
            IpProtocol::Ipv6 => protocol::IPV6,
            IpProtocol::Unknown(code) => code,
        }
    }
}

impl fmt::Display for IpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpProtocol::Icmp => f.write_str("ICMP"),
            IpProtocol::Ipv4 => f.write_str("IPv4"),
            IpProtocol::Tcp => f.write_str("TCP"),
            IpProtocol::Udp => f.write_str("UDP"),
            IpProtocol::Ipv6 => f.write_str("IPv6"),
            IpProtocol::Unknown(code) => write!(f, "protocol {code}"),
        }
    }
}

/// What every IP version offers to the layer it carries
pub trait IpHeader {
    fn version(&self) -> u8;

    /// Header length in bytes
    fn header_len(&self) -> usize;

    /// Payload length declared by the header
    fn payload_len(&self) -> usize;

    fn next_protocol(&self) -> IpProtocol;

    fn src_addr(&self) -> IpAddr;

    fn dst_addr(&self) -> IpAddr;

    /// Pseudo-header followed by `upper`, padded to whole 16-bit words
    fn pseudo_header(&self, upper: &[u8]) -> Result<Vec<u8>>;
}

/// Sum over the pseudo-header and `segment`, with the segment's checksum
/// field (at `checksum_at..checksum_at + 2`) treated as zero
pub(crate) fn upper_layer_sum<I>(ip: &I, segment: &[u8], checksum_at: usize) -> Result<u16>
where
    I: IpHeader + ?Sized,
{
    let mut scratch = ip.pseudo_header(segment)?;
    let prefix = scratch.len() - segment.len() - segment.len() % 2;
    scratch[prefix + checksum_at..prefix + checksum_at + 2].fill(0);
    Ok(ones_complement_sum(&scratch))
}

/// An IP header of either version, selected by the version nibble
#[derive(Clone)]
pub enum IpHeaderView<B> {
    V4(Ipv4Header<B>),
    V6(Ipv6Header<B>),
}

impl<B: AsRef<[u8]>> IpHeaderView<B> {
    /// Parses an IPv4 or IPv6 header according to the version nibble
    ///
    /// An empty buffer is reported as a short IPv4 header, the smaller of
    /// the two minimums. Any other version is [`Error::UnknownIpVersion`].
    pub fn parse(buffer: B) -> Result<Self> {
        let Some(&first) = buffer.as_ref().first() else {
            return Err(Error::too_short(Protocol::Ipv4, 0, ipv4::IPV4_HEADER_LEN));
        };
        match first >> 4 {
            ipv4::IPV4_VERSION => Ipv4Header::parse(buffer).map(IpHeaderView::V4),
            ipv6::IPV6_VERSION => Ipv6Header::parse(buffer).map(IpHeaderView::V6),
            version => Err(Error::UnknownIpVersion { version }),
        }
    }

    fn inner(&self) -> &dyn IpHeader {
        match self {
            IpHeaderView::V4(header) => header,
            IpHeaderView::V6(header) => header,
        }
    }

    /// Payload bytes, bounded by the version's length field
    pub fn payload(&self) -> &[u8] {
        match self {
            IpHeaderView::V4(header) => header.payload(),
            IpHeaderView::V6(header) => header.payload(),
        }
    }
}

impl<B: AsRef<[u8]>> fmt::Debug for IpHeaderView<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpHeaderView::V4(header) => f.debug_tuple("V4").field(header).finish(),
            IpHeaderView::V6(header) => f.debug_tuple("V6").field(header).finish(),
        }
    }
}

impl<B: AsRef<[u8]>> IpHeader for IpHeaderView<B> {
    fn version(&self) -> u8 {
        self.inner().version()
    }

    fn header_len(&self) -> usize {
        self.inner().header_len()
    }

    fn payload_len(&self) -> usize {
        self.inner().payload_len()
    }

    fn next_protocol(&self) -> IpProtocol {
        self.inner().next_protocol()
    }

    fn src_addr(&self) -> IpAddr {
        self.inner().src_addr()
    }

    fn dst_addr(&self) -> IpAddr {
        self.inner().dst_addr()
    }

    fn pseudo_header(&self, upper: &[u8]) -> Result<Vec<u8>> {
        self.inner().pseudo_header(upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn protocol_codes_round_trip() {
        for code in 0..=u8::MAX {
            assert_eq!(u8::from(IpProtocol::from(code)), code);
        }
        assert_eq!(IpProtocol::from(6), IpProtocol::Tcp);
        assert_eq!(IpProtocol::from(99).to_string(), "protocol 99");
    }

    #[test]
    fn view_selects_version() {
        let v4 = Ipv4Header::build(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2));
        let view = IpHeaderView::parse(v4.buffer()).unwrap();
        assert!(matches!(view, IpHeaderView::V4(_)));
        assert_eq!(view.version(), 4);
        assert_eq!(view.header_len(), 20);
        assert_eq!(view.src_addr(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));

        let v6 = Ipv6Header::build(Ipv6Addr::LOCALHOST, Ipv6Addr::LOCALHOST);
        let view = IpHeaderView::parse(v6.buffer()).unwrap();
        assert!(matches!(view, IpHeaderView::V6(_)));
        assert_eq!(view.header_len(), 40);
        assert_eq!(view.pseudo_header(&[]).unwrap().len(), 40);
    }

    #[test]
    fn unknown_version_names_no_protocol() {
        let err = IpHeaderView::parse(&[0x50u8; 40][..]).unwrap_err();
        assert_eq!(err, Error::UnknownIpVersion { version: 5 });
        assert_eq!(err.protocol(), None);
        assert_eq!(err.to_string(), "unsupported IP version 5");

        let err = IpHeaderView::parse(&[0u8; 0][..]).unwrap_err();
        assert_eq!(err, Error::too_short(Protocol::Ipv4, 0, 20));
    }

    #[test]
    fn debug_forwards_to_the_version_view() {
        let v4 = Ipv4Header::build(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2));
        let view = IpHeaderView::parse(v4.buffer()).unwrap();
        let text = format!("{view:?}");
        assert!(text.starts_with("V4(Ipv4Header {"), "{text}");
        assert!(text.contains("10.0.0.2"), "{text}");
    }

    #[test]
    fn pseudo_header_dispatches_per_version() {
        let mut v4 = Ipv4Header::build(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2));
        v4.set_protocol(IpProtocol::Tcp);
        let bytes = v4.pseudo_header(&[0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
        assert_eq!(
            bytes,
            [10, 0, 0, 1, 10, 0, 0, 2, 0, 6, 0, 4, 0xAA, 0xBB, 0xCC, 0xDD]
        );
    }
}
