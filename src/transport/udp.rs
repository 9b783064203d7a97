//! UDP (User Datagram Protocol) header view
//!
//! The length field bounds the datagram when it is consistent with the
//! buffer; otherwise the datagram runs to the end of the buffer.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use crate::decode::Protocol;
use crate::error::{Error, Result};
use crate::network::checksum::ones_complement_add;
use crate::network::{upper_layer_sum, IpHeader};

/// UDP header length in bytes
pub const UDP_HEADER_LEN: usize = 8;

mod layout {
    use std::ops::Range;

    pub const SRC_PORT: Range<usize> = 0..2;
    pub const DST_PORT: Range<usize> = 2..4;
    pub const LENGTH: Range<usize> = 4..6;
    pub const CHECKSUM: usize = 6;
}

/// A view of a UDP datagram at the start of `buffer`
#[derive(Clone)]
pub struct UdpHeader<B> {
    buffer: B,
}

impl<B: AsRef<[u8]>> UdpHeader<B> {
    /// Wraps `buffer` without validating it
    pub fn new_unchecked(buffer: B) -> Self {
        UdpHeader { buffer }
    }

    /// Checks the buffer holds the 8 byte header and wraps it
    pub fn parse(buffer: B) -> Result<Self> {
        let available = buffer.as_ref().len();
        if available < UDP_HEADER_LEN {
            return Err(Error::too_short(Protocol::Udp, available, UDP_HEADER_LEN));
        }
        Ok(UdpHeader::new_unchecked(buffer))
    }

    /// Gives back the backing buffer
    pub fn into_inner(self) -> B {
        self.buffer
    }

    /// Source port
    pub fn src_port(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[layout::SRC_PORT])
    }

    /// Destination port
    pub fn dst_port(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[layout::DST_PORT])
    }

    /// Length of UDP header and data
    pub fn length(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[layout::LENGTH])
    }

    /// The checksum field as stored; zero means none was sent
    pub fn checksum(&self) -> u16 {
        let at = layout::CHECKSUM;
        BigEndian::read_u16(&self.buffer.as_ref()[at..at + 2])
    }

    /// End of the datagram within the buffer
    pub fn datagram_end(&self) -> usize {
        let available = self.buffer.as_ref().len();
        let declared = self.length() as usize;
        if (UDP_HEADER_LEN..=available).contains(&declared) {
            declared
        } else {
            available
        }
    }

    /// Datagram bytes after the header, bounded by the length field
    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[UDP_HEADER_LEN..self.datagram_end()]
    }

    fn datagram(&self) -> &[u8] {
        &self.buffer.as_ref()[..self.datagram_end()]
    }

    /// Checksum over the pseudo-header of `ip` and the datagram
    ///
    /// A computed zero is returned as 0xFFFF, since zero on the wire means
    /// "no checksum" over IPv4.
    pub fn compute_checksum<I: IpHeader + ?Sized>(&self, ip: &I) -> Result<u16> {
        let value = !upper_layer_sum(ip, self.datagram(), layout::CHECKSUM)?;
        Ok(if value == 0 { 0xFFFF } else { value })
    }

    /// A zero checksum field is valid over IPv4 (checksum unused) and
    /// invalid over IPv6, where the checksum is mandatory.
    pub fn valid_checksum<I: IpHeader + ?Sized>(&self, ip: &I) -> bool {
        let stored = self.checksum();
        if stored == 0 {
            return ip.version() == 4;
        }
        match upper_layer_sum(ip, self.datagram(), layout::CHECKSUM) {
            Ok(sum) => ones_complement_add(sum, stored) == 0xFFFF,
            Err(_) => false,
        }
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> UdpHeader<B> {
    /// Sets the source port
    pub fn set_src_port(&mut self, port: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[layout::SRC_PORT], port);
    }

    /// Sets the destination port
    pub fn set_dst_port(&mut self, port: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[layout::DST_PORT], port);
    }

    /// Sets the length field as given, header included
    pub fn set_length(&mut self, length: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[layout::LENGTH], length);
    }

    pub fn set_checksum(&mut self, checksum: u16) {
        let at = layout::CHECKSUM;
        BigEndian::write_u16(&mut self.buffer.as_mut()[at..at + 2], checksum);
    }

    /// Computes the checksum against `ip` and stores it
    pub fn fill_checksum<I: IpHeader + ?Sized>(&mut self, ip: &I) -> Result<()> {
        let value = self.compute_checksum(ip)?;
        self.set_checksum(value);
        Ok(())
    }
}

impl UdpHeader<Vec<u8>> {
    /// Allocates a datagram around `payload` with the length set and no checksum
    pub fn build(src_port: u16, dst_port: u16, payload: &[u8]) -> Result<Self> {
        let total = UDP_HEADER_LEN + payload.len();
        let length = u16::try_from(total).map_err(|_| Error::FieldRange {
            field: "udp length",
            value: total,
        })?;

        let mut datagram = Vec::with_capacity(total);
        datagram.resize(UDP_HEADER_LEN, 0);
        datagram.extend_from_slice(payload);

        let mut header = UdpHeader::new_unchecked(datagram);
        header.set_src_port(src_port);
        header.set_dst_port(dst_port);
        header.set_length(length);
        Ok(header)
    }
}

impl<B: AsRef<[u8]>> fmt::Debug for UdpHeader<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UdpHeader")
            .field("src_port", &self.src_port())
            .field("dst_port", &self.dst_port())
            .field("length", &self.length())
            .field("checksum", &format_args!("{:#06x}", self.checksum()))
            .finish()
    }
}
