//! Protocol dispatch: which parser handles a next-header code, and what one
//! layer of that parser yields.

use tracing::trace;

use crate::decode::{NextHeader, Protocol};
use crate::error::Result;
use crate::link::{EtherType, EthernetHeader};
use crate::network::{IcmpHeader, IpProtocol, Ipv4Header, Ipv6Header};
use crate::transport::{TcpHeader, UdpHeader};
use crate::window::Window;

/// Maps a next-header code to the protocol parsed for it
///
/// `None` means the payload stays opaque.
pub fn resolve(next: NextHeader) -> Option<Protocol> {
    match next {
        NextHeader::EtherType(EtherType::Ipv4) => Some(Protocol::Ipv4),
        NextHeader::EtherType(EtherType::Ipv6) => Some(Protocol::Ipv6),
        NextHeader::Ip(IpProtocol::Icmp) => Some(Protocol::Icmp),
        NextHeader::Ip(IpProtocol::Ipv4) => Some(Protocol::Ipv4),
        NextHeader::Ip(IpProtocol::Tcp) => Some(Protocol::Tcp),
        NextHeader::Ip(IpProtocol::Udp) => Some(Protocol::Udp),
        NextHeader::Ip(IpProtocol::Ipv6) => Some(Protocol::Ipv6),
        NextHeader::EtherType(_) | NextHeader::Ip(_) => None,
    }
}

/// One parsed layer, with windows relative to the start of its segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Parsed {
    pub header: Window,
    pub payload: Window,
    pub next: Option<NextHeader>,
}

impl Parsed {
    fn new(header_len: usize, payload_end: usize, next: Option<NextHeader>) -> Self {
        Parsed {
            header: Window::new(0, header_len),
            payload: Window::from_bounds(header_len, payload_end),
            next,
        }
    }
}

/// Parses the header of `protocol` at the start of `segment`
pub(crate) fn parse_layer(protocol: Protocol, segment: &[u8], clamp: bool) -> Result<Parsed> {
    let end = segment.len();
    let parsed = match protocol {
        Protocol::Ethernet => {
            let eth = EthernetHeader::parse(segment)?;
            let next = NextHeader::EtherType(eth.ethertype());
            Parsed::new(crate::link::ethernet::ETHERNET_HEADER_LEN, end, Some(next))
        }
        Protocol::Ipv4 => {
            let ip = Ipv4Header::parse(segment)?;
            let payload_end = if clamp { ip.payload_end() } else { end };
            // Later fragments carry no upper-layer header.
            let next = if ip.fragment_offset() == 0 {
                Some(NextHeader::Ip(ip.protocol()))
            } else {
                trace!(
                    fragment_offset = ip.fragment_offset(),
                    "non-initial fragment, payload left opaque"
                );
                None
            };
            Parsed::new(ip.header_len(), payload_end, next)
        }
        Protocol::Ipv6 => {
            let ip = Ipv6Header::parse(segment)?;
            let payload_end = if clamp { ip.payload_end() } else { end };
            let next = NextHeader::Ip(ip.next_header());
            Parsed::new(crate::network::ipv6::IPV6_HEADER_LEN, payload_end, Some(next))
        }
        Protocol::Tcp => {
            let tcp = TcpHeader::parse(segment)?;
            Parsed::new(tcp.header_len(), end, None)
        }
        Protocol::Udp => {
            let udp = UdpHeader::parse(segment)?;
            let payload_end = if clamp { udp.datagram_end() } else { end };
            Parsed::new(crate::transport::udp::UDP_HEADER_LEN, payload_end, None)
        }
        Protocol::Icmp => {
            IcmpHeader::parse(segment)?;
            Parsed::new(crate::network::icmp::ICMP_HEADER_LEN, end, None)
        }
    };
    Ok(parsed)
}
