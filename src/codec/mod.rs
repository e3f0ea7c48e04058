//! # DNS Wire Codec Module
//!
//! Parses and serializes mDNS messages in the RFC 1035 wire format.
//!
//! ## Key Types
//!
//! - [`Message`] - A full DNS message with queries and records
//! - [`Record`] / [`RecordData`] - A resource record and its typed payload
//! - [`Query`] - A question entry
//! - [`WireError`] - Typed failure for malformed or truncated packets
//!
//! ## Example
//!
//! ```ignore
//! use lanherald::codec::Message;
//!
//! let message = Message::from_packet(&datagram, Some(src))?;
//! let bytes = message.to_packet();
//! ```

pub mod bitmap;
pub mod message;
pub mod name;
pub mod query;
pub mod record;

pub use bitmap::Bitmap;
pub use message::Message;
pub use query::Query;
pub use record::{Record, RecordData};

mod tests;

use thiserror::Error;

pub const TYPE_A: u16 = 1;
pub const TYPE_PTR: u16 = 12;
pub const TYPE_TXT: u16 = 16;
pub const TYPE_AAAA: u16 = 28;
pub const TYPE_SRV: u16 = 33;
pub const TYPE_NSEC: u16 = 47;
pub const TYPE_ANY: u16 = 255;

// The "flags" field is 16 bits (RFC 1035 section 4.1.1):
//
//   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
// |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
//
// A message counts as a response iff QR or AA is set.
pub const FLAGS_RESPONSE_MASK: u16 = 0x8400;

/// Low 15 bits of the class field (always Internet class here).
pub const CLASS_IN: u16 = 0x0001;
/// Top bit of the class field: unicast-response on queries, cache-flush
/// on records.
pub const CLASS_TOP_BIT: u16 = 0x8000;

/// Failure while decoding or encoding a DNS packet.
///
/// A decode failure always discards the whole message; partial parses
/// are never exposed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("read past end of packet at offset {0}")]
    UnexpectedEnd(usize),
    #[error("compression pointer at offset {0} does not point backwards")]
    PointerLoop(usize),
    #[error("unsupported label type {0:#04x}")]
    BadLabelType(u8),
    #[error("TXT attribute without '=' separator")]
    MalformedTxt,
    #[error("NSEC window block {0} is not block 0")]
    BadNsecWindow(u8),
    #[error("NSEC bitmap longer than 32 bytes")]
    BitmapTooLong,
    #[error("TXT attribute longer than 255 bytes")]
    TxtTooLong,
    #[error("label longer than 63 bytes")]
    LabelTooLong,
    #[error("name offset {0} exceeds the 14-bit pointer range")]
    NameOffsetTooLarge(usize),
}

pub(crate) fn read_u8(packet: &[u8], offset: &mut usize) -> Result<u8, WireError> {
    let value = *packet
        .get(*offset)
        .ok_or(WireError::UnexpectedEnd(*offset))?;
    *offset += 1;
    Ok(value)
}

pub(crate) fn read_u16(packet: &[u8], offset: &mut usize) -> Result<u16, WireError> {
    let bytes = packet
        .get(*offset..*offset + 2)
        .ok_or(WireError::UnexpectedEnd(*offset))?;
    *offset += 2;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

pub(crate) fn read_u32(packet: &[u8], offset: &mut usize) -> Result<u32, WireError> {
    let bytes = packet
        .get(*offset..*offset + 4)
        .ok_or(WireError::UnexpectedEnd(*offset))?;
    *offset += 4;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub(crate) fn read_bytes<'a>(
    packet: &'a [u8],
    offset: &mut usize,
    len: usize,
) -> Result<&'a [u8], WireError> {
    let bytes = packet
        .get(*offset..*offset + len)
        .ok_or(WireError::UnexpectedEnd(*offset))?;
    *offset += len;
    Ok(bytes)
}
