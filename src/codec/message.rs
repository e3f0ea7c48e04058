use std::collections::HashMap;
use std::net::SocketAddr;

use crate::mdns::MDNS_PORT;

use super::query::Query;
use super::record::Record;
use super::{FLAGS_RESPONSE_MASK, WireError, read_u16};

/// A full DNS message.
///
/// Inbound messages carry the datagram's source in `address`; outbound
/// messages use `address` as an explicit destination, with `None`
/// meaning the multicast group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub transaction_id: u16,
    pub response: bool,
    pub queries: Vec<Query>,
    pub records: Vec<Record>,
    pub address: Option<SocketAddr>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a reply to `message`: same transaction id, response flag
    /// set. A query that arrived from the mDNS port is answered over
    /// multicast; any other source gets a directed reply.
    pub fn reply_to(message: &Message) -> Self {
        let address = match message.address {
            Some(addr) if addr.port() != MDNS_PORT => Some(addr),
            _ => None,
        };
        Message {
            transaction_id: message.transaction_id,
            response: true,
            queries: Vec::new(),
            records: Vec::new(),
            address,
        }
    }

    /// Decode a datagram. Any malformed or truncated field discards
    /// the whole message.
    pub fn from_packet(packet: &[u8], address: Option<SocketAddr>) -> Result<Self, WireError> {
        let mut offset = 0;
        let transaction_id = read_u16(packet, &mut offset)?;
        let flags = read_u16(packet, &mut offset)?;
        let n_question = read_u16(packet, &mut offset)?;
        let n_answer = read_u16(packet, &mut offset)?;
        let n_authority = read_u16(packet, &mut offset)?;
        let n_additional = read_u16(packet, &mut offset)?;

        let mut queries = Vec::with_capacity(n_question as usize);
        for _ in 0..n_question {
            queries.push(Query::parse(packet, &mut offset)?);
        }

        // Answer, authority and additional records are treated as one
        // run; the engine does not distinguish the sections.
        let n_record = n_answer as usize + n_authority as usize + n_additional as usize;
        let mut records = Vec::with_capacity(n_record);
        for _ in 0..n_record {
            records.push(Record::parse(packet, &mut offset)?);
        }

        Ok(Message {
            transaction_id,
            response: flags & FLAGS_RESPONSE_MASK != 0,
            queries,
            records,
            address,
        })
    }

    /// Encode the message, compressing repeated names.
    pub fn to_packet(&self) -> Result<Vec<u8>, WireError> {
        let mut packet = Vec::with_capacity(512);
        let mut name_map = HashMap::new();

        packet.extend_from_slice(&self.transaction_id.to_be_bytes());
        let flags: u16 = if self.response { FLAGS_RESPONSE_MASK } else { 0 };
        packet.extend_from_slice(&flags.to_be_bytes());
        packet.extend_from_slice(&(self.queries.len() as u16).to_be_bytes());
        packet.extend_from_slice(&(self.records.len() as u16).to_be_bytes());
        packet.extend_from_slice(&0u16.to_be_bytes()); // authority
        packet.extend_from_slice(&0u16.to_be_bytes()); // additional

        for query in &self.queries {
            query.write(&mut packet, &mut name_map)?;
        }
        for record in &self.records {
            record.write(&mut packet, &mut name_map)?;
        }
        Ok(packet)
    }
}
