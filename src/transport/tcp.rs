//! TCP (Transmission Control Protocol) header view
//!
//! Only the header-length and type contract plus the fields a caller needs
//! to locate and checksum a segment are interpreted here; connection state
//! belongs to whatever consumes these headers.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use crate::decode::Protocol;
use crate::error::{Error, Result};
use crate::field::{read_bits16, read_bits8, write_bits16, write_bits8};
use crate::network::checksum::ones_complement_add;
use crate::network::{upper_layer_sum, IpHeader};

pub const TCP_HEADER_LEN: usize = 20;
pub const TCP_MAX_HEADER_LEN: usize = 60;
const MIN_DATA_OFFSET: u8 = 5;
const MAX_DATA_OFFSET: u8 = 15;

mod layout {
    use std::ops::Range;

    pub const SRC_PORT: Range<usize> = 0..2;
    pub const DST_PORT: Range<usize> = 2..4;
    pub const SEQ: Range<usize> = 4..8;
    pub const ACK: Range<usize> = 8..12;
    pub const OFFSET_FLAGS: usize = 12;
    pub const WINDOW: Range<usize> = 14..16;
    pub const CHECKSUM: usize = 16;
    pub const URGENT: Range<usize> = 18..20;
}

/// TCP control bits, as they appear in the low 9 bits of bytes 12..14
pub mod flags {
    pub const FIN: u16 = 0x001;
    pub const SYN: u16 = 0x002;
    pub const RST: u16 = 0x004;
    pub const PSH: u16 = 0x008;
    pub const ACK: u16 = 0x010;
    pub const URG: u16 = 0x020;
    pub const ECE: u16 = 0x040;
    pub const CWR: u16 = 0x080;
    pub const NS: u16 = 0x100;
    pub const MASK: u16 = 0x1FF;
}

/// A view of a TCP segment: header at the start of `buffer`, payload to its end
#[derive(Clone)]
pub struct TcpHeader<B> {
    buffer: B,
}

impl<B: AsRef<[u8]>> TcpHeader<B> {
    /// Wraps `buffer` without checking the data offset
    pub fn new_unchecked(buffer: B) -> Self {
        TcpHeader { buffer }
    }

    /// Validates the data offset against the buffer and wraps it
    pub fn parse(buffer: B) -> Result<Self> {
        let available = buffer.as_ref().len();
        if available < TCP_HEADER_LEN {
            return Err(Error::too_short(Protocol::Tcp, available, TCP_HEADER_LEN));
        }

        let header = TcpHeader::new_unchecked(buffer);
        let declared = header.header_len();
        if declared < TCP_HEADER_LEN {
            return Err(Error::length_too_small(Protocol::Tcp, declared, TCP_HEADER_LEN));
        }
        if declared > available {
            return Err(Error::truncated(Protocol::Tcp, declared, available));
        }

        Ok(header)
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

    /// Sequence number
    pub fn seq_number(&self) -> u32 {
        BigEndian::read_u32(&self.buffer.as_ref()[layout::SEQ])
    }

    /// Acknowledgment number, meaningful when ACK is set
    pub fn ack_number(&self) -> u32 {
        BigEndian::read_u32(&self.buffer.as_ref()[layout::ACK])
    }

    /// Header length in 32-bit words
    pub fn data_offset(&self) -> u8 {
        read_bits8(self.buffer.as_ref(), layout::OFFSET_FLAGS, 0xF0, 4)
    }

    /// Header length in bytes, options included
    pub fn header_len(&self) -> usize {
        self.data_offset() as usize * 4
    }

    /// The 9 control bits, see [`flags`]
    pub fn flags(&self) -> u16 {
        read_bits16(self.buffer.as_ref(), layout::OFFSET_FLAGS, flags::MASK, 0)
    }

    /// Is SYN set
    pub fn is_syn(&self) -> bool {
        self.flags() & flags::SYN != 0
    }

    /// Is ACK set
    pub fn is_ack(&self) -> bool {
        self.flags() & flags::ACK != 0
    }

    pub fn is_fin(&self) -> bool {
        self.flags() & flags::FIN != 0
    }

    /// Is RST set
    pub fn is_rst(&self) -> bool {
        self.flags() & flags::RST != 0
    }

    /// Receive window
    pub fn window_size(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[layout::WINDOW])
    }

    /// The checksum field as stored
    pub fn checksum(&self) -> u16 {
        let at = layout::CHECKSUM;
        BigEndian::read_u16(&self.buffer.as_ref()[at..at + 2])
    }

    /// Urgent pointer
    pub fn urgent_ptr(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[layout::URGENT])
    }

    /// Option bytes after the fixed 20 byte header
    pub fn options(&self) -> &[u8] {
        &self.buffer.as_ref()[TCP_HEADER_LEN..self.header_len()]
    }

    /// Everything after the header
    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[self.header_len()..]
    }

    /// Checksum over the pseudo-header of `ip` and the whole segment
    pub fn compute_checksum<I: IpHeader + ?Sized>(&self, ip: &I) -> Result<u16> {
        upper_layer_sum(ip, self.buffer.as_ref(), layout::CHECKSUM).map(|sum| !sum)
    }

    /// Does the stored checksum match, pseudo-header included
    pub fn valid_checksum<I: IpHeader + ?Sized>(&self, ip: &I) -> bool {
        match upper_layer_sum(ip, self.buffer.as_ref(), layout::CHECKSUM) {
            Ok(sum) => ones_complement_add(sum, self.checksum()) == 0xFFFF,
            Err(_) => false,
        }
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> TcpHeader<B> {
    /// Sets the source port
    pub fn set_src_port(&mut self, port: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[layout::SRC_PORT], port);
    }

    /// Sets the destination port
    pub fn set_dst_port(&mut self, port: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[layout::DST_PORT], port);
    }

    /// Sets the sequence number
    pub fn set_seq_number(&mut self, seq: u32) {
        BigEndian::write_u32(&mut self.buffer.as_mut()[layout::SEQ], seq);
    }

    pub fn set_ack_number(&mut self, ack: u32) {
        BigEndian::write_u32(&mut self.buffer.as_mut()[layout::ACK], ack);
    }

    /// Sets the header length in words, leaving the flags untouched
    pub fn set_data_offset(&mut self, words: u8) -> Result<()> {
        if !(MIN_DATA_OFFSET..=MAX_DATA_OFFSET).contains(&words) {
            return Err(Error::FieldRange {
                field: "tcp data offset",
                value: words as usize,
            });
        }
        let declared = words as usize * 4;
        let available = self.buffer.as_ref().len();
        if declared > available {
            return Err(Error::truncated(Protocol::Tcp, declared, available));
        }
        write_bits8(self.buffer.as_mut(), layout::OFFSET_FLAGS, 0xF0, 4, words);
        Ok(())
    }

    /// Replaces the control bits, leaving the data offset untouched
    pub fn set_flags(&mut self, value: u16) {
        write_bits16(self.buffer.as_mut(), layout::OFFSET_FLAGS, flags::MASK, 0, value);
    }

    /// Sets the receive window
    pub fn set_window_size(&mut self, window: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[layout::WINDOW], window);
    }

    /// Stores `checksum` verbatim
    pub fn set_checksum(&mut self, checksum: u16) {
        let at = layout::CHECKSUM;
        BigEndian::write_u16(&mut self.buffer.as_mut()[at..at + 2], checksum);
    }

    pub fn set_urgent_ptr(&mut self, ptr: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[layout::URGENT], ptr);
    }

    /// Computes the checksum against `ip` and stores it
    pub fn fill_checksum<I: IpHeader + ?Sized>(&mut self, ip: &I) -> Result<()> {
        let value = self.compute_checksum(ip)?;
        self.set_checksum(value);
        Ok(())
    }
}

impl<B: AsRef<[u8]>> fmt::Debug for TcpHeader<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpHeader")
            .field("src_port", &self.src_port())
            .field("dst_port", &self.dst_port())
            .field("seq", &self.seq_number())
            .field("ack", &self.ack_number())
            .field("data_offset", &self.data_offset())
            .field("flags", &format_args!("{:#05x}", self.flags()))
            .field("window", &self.window_size())
            .field("checksum", &format_args!("{:#06x}", self.checksum()))
            .finish()
    }
}
