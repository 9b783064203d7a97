//! Ethernet II header view

use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use crate::decode::Protocol;
use crate::error::{Error, Result};

pub const ETHERNET_HEADER_LEN: usize = 14;

pub const ETH_P_IP: u16 = 0x0800;
pub const ETH_P_ARP: u16 = 0x0806;
pub const ETH_P_IPV6: u16 = 0x86DD;

mod layout {
    use std::ops::Range;

    pub const DST: Range<usize> = 0..6;
    pub const SRC: Range<usize> = 6..12;
    pub const ETHERTYPE: Range<usize> = 12..14;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EtherType {
    Ipv4,
    Arp,
    Ipv6,
    Unknown(u16),
}

impl From<u16> for EtherType {
    fn from(value: u16) -> Self {
        match value {
            ETH_P_IP => EtherType::Ipv4,
            ETH_P_ARP => EtherType::Arp,
            ETH_P_IPV6 => EtherType::Ipv6,
            other => EtherType::Unknown(other),
        }
    }
}

impl From<EtherType> for u16 {
    fn from(value: EtherType) -> u16 {
        match value {
            EtherType::Ipv4 => ETH_P_IP,
            EtherType::Arp => ETH_P_ARP,
            EtherType::Ipv6 => ETH_P_IPV6,
            EtherType::Unknown(other) => other,
        }
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtherType::Ipv4 => f.write_str("IPv4"),
            EtherType::Arp => f.write_str("ARP"),
            EtherType::Ipv6 => f.write_str("IPv6"),
            EtherType::Unknown(value) => write!(f, "ethertype {value:#06x}"),
        }
    }
}

#[derive(Clone)]
pub struct EthernetHeader<B> {
    buffer: B,
}

impl<B: AsRef<[u8]>> EthernetHeader<B> {
    /// Wraps `buffer` without validating it
    pub fn new_unchecked(buffer: B) -> Self {
        EthernetHeader { buffer }
    }

    /// Checks the buffer holds the 14 byte header and wraps it
    pub fn parse(buffer: B) -> Result<Self> {
        let available = buffer.as_ref().len();
        if available < ETHERNET_HEADER_LEN {
            return Err(Error::too_short(
                Protocol::Ethernet,
                available,
                ETHERNET_HEADER_LEN,
            ));
        }
        Ok(EthernetHeader::new_unchecked(buffer))
    }

    /// Gives back the backing buffer
    pub fn into_inner(self) -> B {
        self.buffer
    }

    /// Destination MAC address
    pub fn dst(&self) -> [u8; 6] {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.buffer.as_ref()[layout::DST]);
        mac
    }

    /// Source MAC address
    pub fn src(&self) -> [u8; 6] {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.buffer.as_ref()[layout::SRC]);
        mac
    }

    /// EtherType of the payload
    pub fn ethertype(&self) -> EtherType {
        EtherType::from(BigEndian::read_u16(&self.buffer.as_ref()[layout::ETHERTYPE]))
    }

    /// Everything after the header
    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[ETHERNET_HEADER_LEN..]
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> EthernetHeader<B> {
    /// Sets the destination MAC address
    pub fn set_dst(&mut self, mac: [u8; 6]) {
        self.buffer.as_mut()[layout::DST].copy_from_slice(&mac);
    }

    /// Sets the source MAC address
    pub fn set_src(&mut self, mac: [u8; 6]) {
        self.buffer.as_mut()[layout::SRC].copy_from_slice(&mac);
    }

    /// Sets the EtherType
    pub fn set_ethertype(&mut self, ethertype: EtherType) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[layout::ETHERTYPE], ethertype.into());
    }
}

impl<B: AsRef<[u8]>> fmt::Debug for EthernetHeader<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EthernetHeader")
            .field("dst", &self.dst())
            .field("src", &self.src())
            .field("ethertype", &self.ethertype())
            .finish()
    }
}
