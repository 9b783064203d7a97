//! Zero-copy packet header views for Rust
//!
//! This library reads and edits layered network headers in place, including:
//! - IPv4 and IPv6 header views with bit-exact field access
//! - The Internet checksum and upper-layer pseudo-headers
//! - TCP, UDP, ICMP and Ethernet views over the same buffers
//! - Encapsulation decoding into a chain of layer windows
//!
//! Views are generic over their buffer: `&[u8]` for reading, `&mut [u8]`
//! or `Vec<u8>` for editing.

pub mod decode;
pub mod error;
pub(crate) mod field;
pub mod link;
pub mod network;
pub mod transport;
pub mod window;

// Re-export commonly used types
pub use decode::{
    decode, decode_with, Chain, DecodeOptions, Layer, LayerError, NextHeader, PartialChain,
    Protocol,
};
pub use error::{Error, Malformed, Result};
pub use link::{EtherType, EthernetHeader};
pub use network::icmp::{IcmpHeader, ICMP_TYPE_ECHO_REPLY, ICMP_TYPE_ECHO_REQUEST};
pub use network::ipv4::{Ipv4Builder, Ipv4Header};
pub use network::ipv6::Ipv6Header;
pub use network::{IpHeader, IpHeaderView, IpProtocol};
pub use transport::{TcpHeader, UdpHeader};
pub use window::Window;
