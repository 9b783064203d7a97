//! Transport layer headers
//!
//! This module contains views for the transport layer protocols an IP
//! header can carry:
//! - TCP: Transmission Control Protocol
//! - UDP: User Datagram Protocol
//!
//! Both checksum over the pseudo-header of the IP header that carries them.

pub mod tcp;
pub mod udp;

// Re-export commonly used items
pub use tcp::TcpHeader;
pub use udp::UdpHeader;
