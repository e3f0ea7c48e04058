//! Authoritative record store and query answering.
//!
//! Records claim their name through a [`Probe`] before entering the
//! active set; records queued behind the probe are renamed along with
//! it, and queries using the original name keep working through the
//! rename map.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::codec::{Message, Record, TYPE_ANY};
use crate::probe::{DEFAULT_PROBE_WINDOW, Probe};
use crate::transport::Transport;

pub struct Responder {
    /// Active records keyed by their (possibly renamed) name.
    records: HashMap<Vec<u8>, Vec<Record>>,
    /// Records queued until the probe for their name confirms.
    pending: HashMap<Vec<u8>, Vec<Record>>,
    /// In-flight probes, at most one per name.
    probes: HashMap<Vec<u8>, Probe>,
    /// Original name to confirmed name.
    renames: HashMap<Vec<u8>, Vec<u8>>,
    probe_window: Duration,
}

impl Responder {
    pub fn new() -> Self {
        Self::with_probe_window(DEFAULT_PROBE_WINDOW)
    }

    pub fn with_probe_window(probe_window: Duration) -> Self {
        Responder {
            records: HashMap::new(),
            pending: HashMap::new(),
            probes: HashMap::new(),
            renames: HashMap::new(),
            probe_window,
        }
    }

    fn translate(&self, name: &[u8]) -> Vec<u8> {
        self.renames
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_vec())
    }

    /// Publish a record.
    ///
    /// With `probe` unset the record joins the active set directly
    /// when its (translated) name is already owned; an unowned name is
    /// first claimed through a probe, queueing the record until
    /// confirmation. With `probe` set the record always goes through
    /// the pending path, forcing a fresh confirmation of the name.
    pub fn add_record<T: Transport>(
        &mut self,
        record: Record,
        probe: bool,
        now: Instant,
        transport: &T,
    ) {
        let name = self.translate(&record.name);

        if !probe && self.records.contains_key(&name) {
            let mut renamed = record;
            renamed.name = name.clone();
            self.records.entry(name).or_default().push(renamed);
            return;
        }

        // Concurrent publications for one name coalesce behind a
        // single probe
        if !self.probes.contains_key(&name) {
            let mut candidate = record.clone();
            candidate.name = name.clone();
            let mut probe_machine = Probe::with_window(candidate, self.probe_window);
            probe_machine.start(now, transport);
            self.probes.insert(name.clone(), probe_machine);
        }
        self.pending.entry(name).or_default().push(record);
    }

    /// Withdraw a record from the active and pending sets. The rename
    /// mapping is dropped once nothing uses the translated name.
    pub fn remove_record(&mut self, record: &Record) {
        let name = self.translate(&record.name);

        if let Some(active) = self.records.get_mut(&name) {
            let mut translated = record.clone();
            translated.name = name.clone();
            active.retain(|r| !r.matches(&translated));
            if active.is_empty() {
                self.records.remove(&name);
                self.renames.remove(&record.name);
            }
        }

        if let Some(queued) = self.pending.get_mut(&name) {
            queued.retain(|r| !r.matches(record));
            if queued.is_empty() {
                self.pending.remove(&name);
            }
        }
    }

    /// All active records for a (translated) name.
    pub fn lookup(&self, name: &[u8]) -> Vec<&Record> {
        let name = self.translate(name);
        self.records
            .get(&name)
            .map(|list| list.iter().collect())
            .unwrap_or_default()
    }

    /// Drive pending probes; confirmed names promote their queued
    /// records into the active set.
    pub fn poll(&mut self, now: Instant) {
        let confirmed: Vec<(Vec<u8>, Record)> = self
            .probes
            .iter_mut()
            .filter_map(|(name, probe)| probe.poll(now).map(|r| (name.clone(), r)))
            .collect();

        for (old_name, record) in confirmed {
            self.probes.remove(&old_name);
            self.promote(&old_name, record.name);
        }
    }

    /// Earliest probe deadline, for scheduling.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.probes.values().filter_map(|p| p.next_deadline()).min()
    }

    /// Feed an inbound message: responses go to the probes, queries
    /// are answered from the active set.
    pub fn handle_message<T: Transport>(&mut self, message: &Message, now: Instant, transport: &T) {
        if message.response {
            for probe in self.probes.values_mut() {
                probe.handle_message(message, now, transport);
            }
            return;
        }

        let mut reply = Message::reply_to(message);
        for query in &message.queries {
            let name = self.translate(&query.name);
            if let Some(active) = self.records.get(&name) {
                for record in active {
                    if query.rtype == record.rtype() || query.rtype == TYPE_ANY {
                        reply.records.push(record.clone());
                    }
                }
            }
        }
        if !reply.records.is_empty() {
            if let Err(err) = transport.send(&reply) {
                warn!("failed to answer query: {err}");
            }
        }
    }

    fn promote(&mut self, old_name: &[u8], new_name: Vec<u8>) {
        debug!(
            "name {:?} confirmed as {:?}",
            String::from_utf8_lossy(old_name),
            String::from_utf8_lossy(&new_name)
        );
        if let Some(queued) = self.pending.remove(old_name) {
            let active = self.records.entry(new_name.clone()).or_default();
            for mut record in queued {
                record.name = new_name.clone();
                if !active.iter().any(|r| r.matches(&record)) {
                    active.push(record);
                }
            }
        }
        self.renames.insert(old_name.to_vec(), new_name);
    }
}
