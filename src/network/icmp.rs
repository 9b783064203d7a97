//! ICMP (Internet Control Message Protocol) header view
//!
//! The view covers the 8-byte header of an ICMPv4 message (RFC 792). Its
//! buffer is expected to end where the message ends, since the checksum
//! covers the whole message and no pseudo-header.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use crate::decode::Protocol;
use crate::error::{Error, Result};
use crate::network::checksum::{ones_complement_add, ones_complement_sum};

/// Minimum ICMP header length in bytes
pub const ICMP_HEADER_LEN: usize = 8;

/// ICMP message types
pub const ICMP_TYPE_ECHO_REPLY: u8 = 0;
pub const ICMP_TYPE_DEST_UNREACHABLE: u8 = 3;
pub const ICMP_TYPE_ECHO_REQUEST: u8 = 8;
pub const ICMP_TYPE_TIME_EXCEEDED: u8 = 11;

mod layout {
    use std::ops::Range;

    pub const TYPE: usize = 0;
    pub const CODE: usize = 1;
    pub const CHECKSUM: Range<usize> = 2..4;
    pub const IDENT: Range<usize> = 4..6;
    pub const SEQUENCE: Range<usize> = 6..8;
    pub const REST: Range<usize> = 4..8;
}

#[derive(Clone)]
pub struct IcmpHeader<B> {
    buffer: B,
}

impl<B: AsRef<[u8]>> IcmpHeader<B> {
    /// Wraps `buffer` without validating it
    pub fn new_unchecked(buffer: B) -> Self {
        IcmpHeader { buffer }
    }

    /// Checks the buffer holds the 8 byte header and wraps it
    pub fn parse(buffer: B) -> Result<Self> {
        let available = buffer.as_ref().len();
        if available < ICMP_HEADER_LEN {
            return Err(Error::too_short(Protocol::Icmp, available, ICMP_HEADER_LEN));
        }
        Ok(IcmpHeader::new_unchecked(buffer))
    }

    /// Gives back the backing buffer
    pub fn into_inner(self) -> B {
        self.buffer
    }

    /// Message type
    pub fn msg_type(&self) -> u8 {
        self.buffer.as_ref()[layout::TYPE]
    }

    /// Message code, qualifying the type
    pub fn msg_code(&self) -> u8 {
        self.buffer.as_ref()[layout::CODE]
    }

    /// The checksum field as stored
    pub fn checksum(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[layout::CHECKSUM])
    }

    /// Type-specific second word of the header
    pub fn rest_of_header(&self) -> &[u8] {
        &self.buffer.as_ref()[layout::REST]
    }

    /// Is this an echo request
    pub fn is_echo_request(&self) -> bool {
        self.msg_type() == ICMP_TYPE_ECHO_REQUEST
    }

    /// Is this an echo reply
    pub fn is_echo_reply(&self) -> bool {
        self.msg_type() == ICMP_TYPE_ECHO_REPLY
    }

    /// Identifier field of Echo Request/Reply messages
    pub fn identifier(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[layout::IDENT])
    }

    /// Sequence number field of Echo Request/Reply messages
    pub fn sequence(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[layout::SEQUENCE])
    }

    /// Bytes after the 8 byte header
    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[ICMP_HEADER_LEN..]
    }

    // The checksum field sits on a word boundary, so summing around it
    // equals summing a copy with the field zeroed.
    fn zeroed_sum(&self) -> u16 {
        let buf = self.buffer.as_ref();
        ones_complement_add(
            ones_complement_sum(&buf[..layout::CHECKSUM.start]),
            ones_complement_sum(&buf[layout::CHECKSUM.end..]),
        )
    }

    /// Checksum over the whole message, for the caller to store
    pub fn compute_checksum(&self) -> u16 {
        !self.zeroed_sum()
    }

    /// Does the stored checksum match the whole message
    pub fn valid_checksum(&self) -> bool {
        ones_complement_add(self.zeroed_sum(), self.checksum()) == 0xFFFF
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> IcmpHeader<B> {
    /// Sets the message type
    pub fn set_msg_type(&mut self, msg_type: u8) {
        self.buffer.as_mut()[layout::TYPE] = msg_type;
    }

    /// Sets the message code
    pub fn set_msg_code(&mut self, code: u8) {
        self.buffer.as_mut()[layout::CODE] = code;
    }

    /// Stores `checksum` verbatim
    pub fn set_checksum(&mut self, checksum: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[layout::CHECKSUM], checksum);
    }

    /// Computes the message checksum and stores it
    pub fn fill_checksum(&mut self) {
        let value = self.compute_checksum();
        self.set_checksum(value);
    }

    /// Sets the echo identifier
    pub fn set_identifier(&mut self, id: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[layout::IDENT], id);
    }

    /// Sets the echo sequence number
    pub fn set_sequence(&mut self, seq: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[layout::SEQUENCE], seq);
    }
}

impl<B: AsRef<[u8]>> fmt::Debug for IcmpHeader<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IcmpHeader")
            .field("type", &self.msg_type())
            .field("code", &self.msg_code())
            .field("checksum", &format_args!("{:#06x}", self.checksum()))
            .field("rest", &self.rest_of_header())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_request_fields_and_checksum() {
        let mut data = [0u8; 12];
        let mut icmp = IcmpHeader::parse(&mut data[..]).unwrap();
        icmp.set_msg_type(ICMP_TYPE_ECHO_REQUEST);
        icmp.set_identifier(0x1234);
        icmp.set_sequence(1);
        icmp.fill_checksum();

        assert!(icmp.is_echo_request());
        assert_eq!(icmp.identifier(), 0x1234);
        assert_eq!(icmp.sequence(), 1);
        assert!(icmp.valid_checksum());
        assert_eq!(icmp.payload(), &[0, 0, 0, 0]);

        icmp.set_msg_type(ICMP_TYPE_ECHO_REPLY);
        assert!(!icmp.valid_checksum());
    }

    #[test]
    fn odd_length_messages_checksum() {
        let mut data = [8u8, 0, 0, 0, 0, 1, 0, 2, 0xAB];
        let mut icmp = IcmpHeader::parse(&mut data[..]).unwrap();
        icmp.fill_checksum();
        assert!(icmp.valid_checksum());
        assert_eq!(ones_complement_sum(&data), 0xFFFF);
    }

    #[test]
    fn short_message_is_malformed() {
        let err = IcmpHeader::parse(&[8u8, 0, 0, 0][..]).unwrap_err();
        assert_eq!(err, Error::too_short(Protocol::Icmp, 4, 8));
    }
}
