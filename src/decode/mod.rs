//! Encapsulation decoding
//!
//! [`decode`] walks a packet from a starting protocol inward, one header at a
//! time, and records each layer as a pair of [`Window`]s into the caller's
//! buffer. The chain borrows nothing, so it can be kept next to the buffer
//! and turned back into typed views, shared or mutable, on demand.

mod options;
mod resolver;

use std::fmt;

use thiserror::Error;
use tracing::{debug, trace};

use crate::error::{Error, Malformed};
use crate::link::{EtherType, EthernetHeader};
use crate::network::{IcmpHeader, IpProtocol, Ipv4Header, Ipv6Header};
use crate::transport::{TcpHeader, UdpHeader};
use crate::window::Window;

pub use options::DecodeOptions;
pub use resolver::resolve;

/// Protocols the decoder can parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Ethernet,
    Ipv4,
    Ipv6,
    Icmp,
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Ethernet => "Ethernet",
            Protocol::Ipv4 => "IPv4",
            Protocol::Ipv6 => "IPv6",
            Protocol::Icmp => "ICMP",
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        };
        f.write_str(name)
    }
}

/// The code a header uses to name what it carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NextHeader {
    EtherType(EtherType),
    Ip(IpProtocol),
}

impl fmt::Display for NextHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextHeader::EtherType(ethertype) => fmt::Display::fmt(ethertype, f),
            NextHeader::Ip(protocol) => fmt::Display::fmt(protocol, f),
        }
    }
}

/// One decoded header and the bytes it encloses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layer {
    protocol: Protocol,
    header: Window,
    payload: Window,
    next: Option<NextHeader>,
}

macro_rules! layer_view {
    ($name:ident, $name_mut:ident, $protocol:ident, $view:ident) => {
        #[doc = concat!("The layer as a [`", stringify!($view), "`] over `buffer`")]
        ///
        /// `None` when the layer holds another protocol or `buffer` is not
        /// the one it was decoded from.
        pub fn $name<'b>(&self, buffer: &'b [u8]) -> Option<$view<&'b [u8]>> {
            if self.protocol != Protocol::$protocol {
                return None;
            }
            $view::parse(self.segment().slice(buffer)?).ok()
        }

        #[doc = concat!("The layer as a mutable [`", stringify!($view), "`] over `buffer`")]
        pub fn $name_mut<'b>(&self, buffer: &'b mut [u8]) -> Option<$view<&'b mut [u8]>> {
            if self.protocol != Protocol::$protocol {
                return None;
            }
            $view::parse(self.segment().slice_mut(buffer)?).ok()
        }
    };
}

impl Layer {
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Header bytes, options included
    pub fn header(&self) -> Window {
        self.header
    }

    /// Bytes enclosed by the header, bounded by its length fields
    pub fn payload(&self) -> Window {
        self.payload
    }

    /// The next-header code this layer announced, if it has one
    pub fn next(&self) -> Option<NextHeader> {
        self.next
    }

    /// Header and payload together
    pub fn segment(&self) -> Window {
        Window::from_bounds(self.header.offset(), self.payload.end())
    }

    pub fn header_bytes<'b>(&self, buffer: &'b [u8]) -> Option<&'b [u8]> {
        self.header.slice(buffer)
    }

    pub fn payload_bytes<'b>(&self, buffer: &'b [u8]) -> Option<&'b [u8]> {
        self.payload.slice(buffer)
    }

    layer_view!(ethernet, ethernet_mut, Ethernet, EthernetHeader);
    layer_view!(ipv4, ipv4_mut, Ipv4, Ipv4Header);
    layer_view!(ipv6, ipv6_mut, Ipv6, Ipv6Header);
    layer_view!(icmp, icmp_mut, Icmp, IcmpHeader);
    layer_view!(tcp, tcp_mut, Tcp, TcpHeader);
    layer_view!(udp, udp_mut, Udp, UdpHeader);
}

/// Every layer decoded from one packet, outermost first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain<T> {
    timestamp: T,
    layers: Vec<Layer>,
    payload: Window,
}

impl<T> Chain<T> {
    /// Capture timestamp, passed through untouched
    pub fn timestamp(&self) -> &T {
        &self.timestamp
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Outermost layer
    pub fn first(&self) -> Option<&Layer> {
        self.layers.first()
    }

    /// Innermost layer
    pub fn innermost(&self) -> Option<&Layer> {
        self.layers.last()
    }

    /// The layer directly inside the one at `index`
    pub fn next(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index.checked_add(1)?)
    }

    /// Outermost layer of `protocol`
    pub fn find(&self, protocol: Protocol) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.protocol == protocol)
    }

    /// Bytes no decoder claimed: the innermost layer's payload, or the whole
    /// input when nothing decoded
    pub fn payload(&self) -> Window {
        self.payload
    }

    pub fn payload_bytes<'b>(&self, buffer: &'b [u8]) -> Option<&'b [u8]> {
        self.payload.slice(buffer)
    }

    pub fn into_timestamp(self) -> T {
        self.timestamp
    }
}

impl<'c, T> IntoIterator for &'c Chain<T> {
    type Item = &'c Layer;
    type IntoIter = std::slice::Iter<'c, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

/// The header that stopped decoding
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{protocol} layer at offset {offset}: {error}")]
pub struct LayerError {
    pub protocol: Protocol,
    /// Offset of the failed header in the decoded buffer
    pub offset: usize,
    #[source]
    pub error: Error,
}

/// Decoding failed part way; `chain` holds every layer that parsed, and its
/// payload is the unparsed remainder starting at the failed header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialChain<T> {
    pub chain: Chain<T>,
    pub error: LayerError,
}

impl<T> PartialChain<T> {
    pub fn into_chain(self) -> Chain<T> {
        self.chain
    }
}

impl<T> fmt::Display for PartialChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "decoding stopped after {} layers: {}",
            self.chain.len(),
            self.error
        )
    }
}

impl<T: fmt::Debug> std::error::Error for PartialChain<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Decodes `buffer[offset..]` as `first` and everything it encapsulates,
/// with default options
pub fn decode<T>(
    buffer: &[u8],
    offset: usize,
    first: Protocol,
    timestamp: T,
) -> Result<Chain<T>, PartialChain<T>> {
    decode_with(DecodeOptions::default(), buffer, offset, first, timestamp)
}

/// Decodes `buffer[offset..]` as `first` and everything it encapsulates
///
/// Decoding stops without error at a terminal protocol, an unknown or
/// opaque next-header code, an empty payload, or after
/// `options.max_depth` layers. A header that fails to parse ends decoding
/// with a [`PartialChain`].
pub fn decode_with<T>(
    options: DecodeOptions,
    buffer: &[u8],
    offset: usize,
    first: Protocol,
    timestamp: T,
) -> Result<Chain<T>, PartialChain<T>> {
    let mut chain = Chain {
        timestamp,
        layers: Vec::new(),
        payload: Window::from_bounds(offset, buffer.len()),
    };

    if !chain.payload.fits(buffer.len()) {
        let error = Error::MalformedHeader {
            protocol: first,
            reason: Malformed::OffsetOutOfBounds {
                offset,
                len: buffer.len(),
            },
        };
        chain.payload = Window::new(buffer.len(), 0);
        return Err(PartialChain {
            chain,
            error: LayerError {
                protocol: first,
                offset,
                error,
            },
        });
    }

    let mut protocol = first;
    loop {
        if chain.layers.len() >= options.max_depth {
            debug!(depth = chain.layers.len(), "depth limit reached, rest left opaque");
            break;
        }

        let remaining = chain.payload;
        let segment = match remaining.slice(buffer) {
            Some(segment) => segment,
            None => break,
        };

        let parsed = match resolver::parse_layer(protocol, segment, options.clamp_to_length_fields)
        {
            Ok(parsed) => parsed,
            Err(error) => {
                debug!(%protocol, offset = remaining.offset(), %error, "layer failed to parse");
                return Err(PartialChain {
                    chain,
                    error: LayerError {
                        protocol,
                        offset: remaining.offset(),
                        error,
                    },
                });
            }
        };

        let layer = Layer {
            protocol,
            header: parsed.header.offset_by(remaining.offset()),
            payload: parsed.payload.offset_by(remaining.offset()),
            next: parsed.next,
        };
        debug!(
            %protocol,
            offset = layer.header.offset(),
            header_len = layer.header.len(),
            payload_len = layer.payload.len(),
            "decoded layer"
        );
        chain.layers.push(layer);
        chain.payload = layer.payload;

        let Some(next) = layer.next else { break };
        let Some(inner) = resolve(next) else {
            trace!(%next, "no decoder, payload left opaque");
            break;
        };
        if layer.payload.is_empty() {
            break;
        }
        protocol = inner;
    }

    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Ipv4Builder;
    use std::net::Ipv4Addr;

    fn ipv4_udp() -> Vec<u8> {
        let src = Ipv4Addr::new(10, 0, 0, 1);
        let dst = Ipv4Addr::new(10, 0, 0, 2);
        let udp = UdpHeader::build(5000, 53, b"query").unwrap().into_inner();
        Ipv4Builder::new(src, dst)
            .protocol(IpProtocol::Udp)
            .build(&udp)
            .unwrap()
    }

    #[test]
    fn protocol_names() {
        assert_eq!(Protocol::Ipv6.to_string(), "IPv6");
        assert_eq!(Protocol::Icmp.to_string(), "ICMP");
    }

    #[test]
    fn decodes_ipv4_udp() {
        let packet = ipv4_udp();
        let chain = decode(&packet, 0, Protocol::Ipv4, ()).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.layers()[0].header(), Window::new(0, 20));
        assert_eq!(chain.layers()[1].header(), Window::new(20, 8));
        assert_eq!(chain.payload_bytes(&packet), Some(&b"query"[..]));
        assert_eq!(chain.next(0).map(Layer::protocol), Some(Protocol::Udp));
        assert!(chain.next(1).is_none());
    }

    #[test]
    fn views_match_protocol() {
        let packet = ipv4_udp();
        let chain = decode(&packet, 0, Protocol::Ipv4, ()).unwrap();
        let ip = chain.first().unwrap();
        assert!(ip.ipv4(&packet).is_some());
        assert!(ip.udp(&packet).is_none());
        assert_eq!(chain.innermost().unwrap().udp(&packet).unwrap().dst_port(), 53);
    }

    #[test]
    fn offset_past_end() {
        let partial = decode(&[0u8; 4], 5, Protocol::Ipv4, ()).unwrap_err();
        assert!(partial.chain.is_empty());
        assert_eq!(partial.error.offset, 5);
        assert!(matches!(
            partial.error.error,
            Error::MalformedHeader {
                reason: Malformed::OffsetOutOfBounds { offset: 5, len: 4 },
                ..
            }
        ));
    }

    #[test]
    fn offset_at_end_is_in_bounds() {
        let partial = decode(&[0u8; 4], 4, Protocol::Ipv4, ()).unwrap_err();
        assert_eq!(partial.chain.payload(), Window::new(4, 0));
        assert!(matches!(
            partial.error.error,
            Error::MalformedHeader {
                reason: Malformed::BufferTooShort { available: 0, .. },
                ..
            }
        ));
    }

    #[test]
    fn zero_depth_decodes_nothing() {
        let packet = ipv4_udp();
        let chain = decode_with(DecodeOptions::new().max_depth(0), &packet, 0, Protocol::Ipv4, ())
            .unwrap();
        assert!(chain.is_empty());
        assert_eq!(chain.payload(), Window::new(0, packet.len()));
    }
}
