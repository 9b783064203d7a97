//! Link layer headers
//!
//! Captured frames usually start with a link-layer header; decoding a chain
//! from [`Protocol::Ethernet`](crate::decode::Protocol::Ethernet) strips it
//! and dispatches on the EtherType.

pub mod ethernet;

pub use ethernet::{EtherType, EthernetHeader};
