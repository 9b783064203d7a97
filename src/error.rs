//! Error types shared by every header view and the encapsulation resolver.
//!
//! Checksum mismatches are deliberately absent: a bad checksum is an
//! ordinary property of traffic and is reported as a `bool` by the views.

use thiserror::Error;

use crate::decode::Protocol;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while parsing or editing a header
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The bytes cannot hold a header of this protocol at all
    #[error("malformed {protocol} header: {reason}")]
    MalformedHeader {
        protocol: Protocol,
        reason: Malformed,
    },

    /// The header declares more bytes than the buffer holds
    #[error("truncated {protocol} header: declares {declared} bytes, {available} available")]
    TruncatedPacket {
        protocol: Protocol,
        declared: usize,
        available: usize,
    },

    /// The version nibble names neither IPv4 nor IPv6
    #[error("unsupported IP version {version}")]
    UnknownIpVersion { version: u8 },

    /// A value does not fit the wire field it is written to
    #[error("value {value} out of range for field {field}")]
    FieldRange { field: &'static str, value: usize },
}

/// Why a header was rejected as malformed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformed {
    #[error("buffer holds {available} bytes, minimum header is {minimum}")]
    BufferTooShort { available: usize, minimum: usize },

    #[error("declared header length {declared} is below minimum {minimum}")]
    HeaderLengthTooSmall { declared: usize, minimum: usize },

    #[error("offset {offset} lies past the end of a {len} byte buffer")]
    OffsetOutOfBounds { offset: usize, len: usize },
}

impl Error {
    pub(crate) fn too_short(protocol: Protocol, available: usize, minimum: usize) -> Self {
        Error::MalformedHeader {
            protocol,
            reason: Malformed::BufferTooShort { available, minimum },
        }
    }

    pub(crate) fn length_too_small(protocol: Protocol, declared: usize, minimum: usize) -> Self {
        Error::MalformedHeader {
            protocol,
            reason: Malformed::HeaderLengthTooSmall { declared, minimum },
        }
    }

    pub(crate) fn truncated(protocol: Protocol, declared: usize, available: usize) -> Self {
        Error::TruncatedPacket {
            protocol,
            declared,
            available,
        }
    }

    /// The protocol whose header raised the error, if any
    pub fn protocol(&self) -> Option<Protocol> {
        match self {
            Error::MalformedHeader { protocol, .. } | Error::TruncatedPacket { protocol, .. } => {
                Some(*protocol)
            }
            Error::UnknownIpVersion { .. } | Error::FieldRange { .. } => None,
        }
    }
}
