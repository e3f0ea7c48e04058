//! Name-conflict resolution by probing.
//!
//! A record's name must be confirmed unique before it is answered
//! authoritatively. The probe broadcasts a query carrying the proposed
//! record and waits out a silence window; any response claiming the
//! same (name, type) forces a rename and a fresh window.

use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::codec::{Message, Query, Record};
use crate::transport::Transport;

pub const DEFAULT_PROBE_WINDOW: Duration = Duration::from_secs(2);

/// A single record's in-flight claim on a name.
///
/// Short-lived: once [`Probe::poll`] yields the confirmed record the
/// value has served its purpose and should be dropped.
pub struct Probe {
    root: Vec<u8>,
    tail: Vec<u8>,
    suffix: u32,
    proposed: Record,
    deadline: Option<Instant>,
    window: Duration,
    confirmed: bool,
}

impl Probe {
    pub fn new(record: Record) -> Self {
        Self::with_window(record, DEFAULT_PROBE_WINDOW)
    }

    pub fn with_window(record: Record, window: Duration) -> Self {
        // A fully-qualified name has at least one dot; the suffix is
        // spliced in front of it when renaming
        let split = record
            .name
            .iter()
            .position(|&b| b == b'.')
            .unwrap_or(record.name.len());
        Probe {
            root: record.name[..split].to_vec(),
            tail: record.name[split..].to_vec(),
            suffix: 1,
            proposed: record,
            deadline: None,
            window,
            confirmed: false,
        }
    }

    /// The record as currently proposed (renamed by past conflicts).
    pub fn proposed(&self) -> &Record {
        &self.proposed
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Broadcast the current candidate and arm the silence window.
    /// Any previously armed window is replaced.
    pub fn start<T: Transport>(&mut self, now: Instant, transport: &T) {
        let mut name = self.root.clone();
        if self.suffix > 1 {
            name.push(b'-');
            name.extend_from_slice(self.suffix.to_string().as_bytes());
        }
        name.extend_from_slice(&self.tail);
        self.proposed.name = name;

        let mut message = Message::new();
        message
            .queries
            .push(Query::new(self.proposed.name.clone(), self.proposed.rtype()));
        message.records.push(self.proposed.clone());
        if let Err(err) = transport.send_to_all(&message) {
            warn!("probe broadcast failed: {err}");
        }
        self.deadline = Some(now + self.window);
    }

    /// Check an inbound message for a competing claim. A conflict
    /// bumps the suffix and restarts the probe with the renamed
    /// candidate.
    pub fn handle_message<T: Transport>(&mut self, message: &Message, now: Instant, transport: &T) {
        if self.confirmed || self.deadline.is_none() || !message.response {
            return;
        }
        let conflict = message
            .records
            .iter()
            .any(|r| r.name == self.proposed.name && r.rtype() == self.proposed.rtype());
        if conflict {
            self.suffix += 1;
            debug!(
                "probe conflict for {:?}, retrying with suffix {}",
                String::from_utf8_lossy(&self.proposed.name),
                self.suffix
            );
            self.start(now, transport);
        }
    }

    /// Yield the confirmed record after a full window of silence.
    /// Returns `Some` exactly once.
    pub fn poll(&mut self, now: Instant) -> Option<Record> {
        match self.deadline {
            Some(deadline) if deadline <= now && !self.confirmed => {
                self.confirmed = true;
                self.deadline = None;
                Some(self.proposed.clone())
            }
            _ => None,
        }
    }
}
