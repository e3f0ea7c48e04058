//! One-shot host name resolution.

use std::net::IpAddr;

use log::warn;

use crate::codec::{Message, Query, TYPE_A, TYPE_AAAA};
use crate::transport::Transport;

/// Resolves a host name to its addresses by querying both address
/// families and collecting matching response records.
pub struct Resolver {
    name: Vec<u8>,
}

impl Resolver {
    pub fn new(name: impl Into<Vec<u8>>) -> Self {
        Resolver { name: name.into() }
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Broadcast A and AAAA queries for the name.
    pub fn query<T: Transport>(&self, transport: &T) {
        let mut message = Message::new();
        message.queries.push(Query::new(self.name.clone(), TYPE_A));
        message
            .queries
            .push(Query::new(self.name.clone(), TYPE_AAAA));
        if let Err(err) = transport.send_to_all(&message) {
            warn!("resolve query failed: {err}");
        }
    }

    /// Addresses for the name carried by a response message.
    pub fn handle_message(&self, message: &Message) -> Vec<IpAddr> {
        if !message.response {
            return Vec::new();
        }
        message
            .records
            .iter()
            .filter(|r| r.name == self.name)
            .filter_map(|r| r.address())
            .collect()
    }
}
