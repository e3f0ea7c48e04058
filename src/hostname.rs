//! Host name self-registration.
//!
//! Claims `<machine>.local.` by broadcasting A/AAAA queries for the
//! candidate and listening for anyone answering; a taken name gets a
//! numeric suffix and another try. Once registered, address queries
//! for the owned name are answered from the configured address set.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::codec::{Message, Query, Record, RecordData, TYPE_A, TYPE_AAAA};
use crate::probe::DEFAULT_PROBE_WINDOW;
use crate::transport::Transport;

const DEFAULT_ADDRESS_TTL: u32 = 3600;

pub struct Hostname {
    /// Base name without suffix, dot-terminated (`mybox.local.`).
    base: Vec<u8>,
    /// Current candidate or registered name.
    hostname: Vec<u8>,
    suffix: u32,
    registered: bool,
    deadline: Option<Instant>,
    window: Duration,
    addresses: Vec<IpAddr>,
}

impl Hostname {
    /// Register the machine's own host name under `.local.`.
    pub fn new(addresses: Vec<IpAddr>) -> Self {
        let machine = hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| String::from("localhost"));
        // A bare label; dots would split it into bogus DNS labels
        let mut base: Vec<u8> = machine
            .bytes()
            .map(|b| if b == b'.' { b'-' } else { b })
            .collect();
        base.extend_from_slice(b".local.");
        Self::with_base(base, addresses)
    }

    pub fn with_base(base: impl Into<Vec<u8>>, addresses: Vec<IpAddr>) -> Self {
        Hostname {
            base: base.into(),
            hostname: Vec::new(),
            suffix: 1,
            registered: false,
            deadline: None,
            window: DEFAULT_PROBE_WINDOW,
            addresses,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// The current candidate or registered name.
    pub fn hostname(&self) -> &[u8] {
        &self.hostname
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn set_probe_window(&mut self, window: Duration) {
        self.window = window;
    }

    /// Begin (or start over) asserting the base name.
    pub fn assert_hostname<T: Transport>(&mut self, now: Instant, transport: &T) {
        self.registered = false;
        self.suffix = 1;
        self.broadcast_hostname(now, transport);
    }

    /// Replace the answer address set. The name is re-asserted since a
    /// new address may sit on a segment where the name is taken.
    pub fn set_addresses<T: Transport>(
        &mut self,
        addresses: Vec<IpAddr>,
        now: Instant,
        transport: &T,
    ) {
        if self.addresses == addresses {
            return;
        }
        self.addresses = addresses;
        self.assert_hostname(now, transport);
    }

    fn broadcast_hostname<T: Transport>(&mut self, now: Instant, transport: &T) {
        self.hostname = if self.suffix == 1 {
            self.base.clone()
        } else {
            let split = self
                .base
                .iter()
                .position(|&b| b == b'.')
                .unwrap_or(self.base.len());
            let mut named = self.base[..split].to_vec();
            named.push(b'-');
            named.extend_from_slice(self.suffix.to_string().as_bytes());
            named.extend_from_slice(&self.base[split..]);
            named
        };

        let mut message = Message::new();
        message
            .queries
            .push(Query::new(self.hostname.clone(), TYPE_A));
        message
            .queries
            .push(Query::new(self.hostname.clone(), TYPE_AAAA));
        if let Err(err) = transport.send_to_all(&message) {
            warn!("hostname query failed: {err}");
        }
        // No reply within the window means the name is ours
        self.deadline = Some(now + self.window);
    }

    /// Responses are conflict checks; queries are answered once the
    /// name is registered.
    pub fn handle_message<T: Transport>(&mut self, message: &Message, now: Instant, transport: &T) {
        if message.response {
            // Replies only count as conflicts while the silence window
            // is armed; afterwards we answer for the name ourselves and
            // would otherwise trip over our own looped-back responses
            if self.deadline.is_none() {
                return;
            }
            let conflict = message.records.iter().any(|r| {
                (r.rtype() == TYPE_A || r.rtype() == TYPE_AAAA) && r.name == self.hostname
            });
            if conflict {
                self.suffix += 1;
                debug!(
                    "hostname {:?} in use, trying suffix {}",
                    String::from_utf8_lossy(&self.hostname),
                    self.suffix
                );
                self.broadcast_hostname(now, transport);
            }
            return;
        }

        if !self.registered {
            return;
        }
        let mut reply = Message::reply_to(message);
        for query in &message.queries {
            if query.name != self.hostname {
                continue;
            }
            for address in &self.addresses {
                let data = match (query.rtype, address) {
                    (TYPE_A, IpAddr::V4(v4)) => RecordData::A(*v4),
                    (TYPE_AAAA, IpAddr::V6(v6)) => RecordData::Aaaa(*v6),
                    _ => continue,
                };
                reply
                    .records
                    .push(Record::new(self.hostname.clone(), DEFAULT_ADDRESS_TTL, data));
            }
        }
        if !reply.records.is_empty() {
            if let Err(err) = transport.send(&reply) {
                warn!("failed to answer address query: {err}");
            }
        }
    }

    /// Registration completes after a silent window; returns the owned
    /// name once.
    pub fn poll(&mut self, now: Instant) -> Option<Vec<u8>> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.registered = true;
                info!(
                    "hostname registered as {:?}",
                    String::from_utf8_lossy(&self.hostname)
                );
                Some(self.hostname.clone())
            }
            _ => None,
        }
    }
}
