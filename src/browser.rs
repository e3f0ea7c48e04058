//! DNS-SD service browsing.
//!
//! The browser correlates raw PTR, SRV and TXT records from its cache
//! into logical services: an instance exists once a PTR of the browsed
//! type points at it and an SRV announces its host and port. TXT
//! attributes are merged in when present.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

use log::warn;

use crate::cache::{CacheEvent, DEFAULT_JITTER_MS, RecordCache};
use crate::codec::{Message, Query, Record, RecordData, TYPE_PTR, TYPE_SRV, TYPE_TXT};
use crate::transport::Transport;

pub const DEFAULT_BROWSE_INTERVAL: Duration = Duration::from_secs(60);

/// A discovered service instance. Derived from cached records, never
/// transmitted itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Instance name, e.g. `web._http._tcp.local.`
    pub name: Vec<u8>,
    /// Service type, e.g. `_http._tcp.local.`
    pub stype: Vec<u8>,
    pub port: u16,
    pub attributes: BTreeMap<Vec<u8>, Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    Added(Service),
    Updated(Service),
    Removed(Service),
}

pub struct Browser {
    stype: Vec<u8>,
    cache: RecordCache,
    services: HashMap<Vec<u8>, Service>,
    next_query: Option<Instant>,
    interval: Duration,
}

impl Browser {
    /// Browse for instances of `stype` (dot-terminated, e.g.
    /// `_http._tcp.local.`). The first PTR query goes out on the first
    /// call to [`Browser::poll`].
    pub fn new(stype: impl Into<Vec<u8>>) -> Self {
        Self::with_interval(stype, DEFAULT_BROWSE_INTERVAL)
    }

    pub fn with_interval(stype: impl Into<Vec<u8>>, interval: Duration) -> Self {
        Self::with_timing(stype, interval, DEFAULT_JITTER_MS)
    }

    pub fn with_timing(
        stype: impl Into<Vec<u8>>,
        interval: Duration,
        cache_jitter_ms: u64,
    ) -> Self {
        Browser {
            stype: stype.into(),
            cache: RecordCache::with_jitter(cache_jitter_ms),
            services: HashMap::new(),
            next_query: None,
            interval,
        }
    }

    pub fn service_type(&self) -> &[u8] {
        &self.stype
    }

    /// Currently known services.
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    /// Periodic work: the repeating PTR query with known-answer
    /// suppression, cache refreshes and expiries.
    pub fn poll<T: Transport>(&mut self, now: Instant, transport: &T) -> Vec<ServiceEvent> {
        let mut events = Vec::new();

        if self.next_query.is_none_or(|t| t <= now) {
            let mut message = Message::new();
            message
                .queries
                .push(Query::new(self.stype.clone(), TYPE_PTR));
            // Known answers suppress redundant replies from peers
            for record in self.cache.records_of_type(TYPE_PTR) {
                message.records.push(record.clone());
            }
            if let Err(err) = transport.send_to_all(&message) {
                warn!("browse query failed: {err}");
            }
            self.next_query = Some(now + self.interval);
        }

        for event in self.cache.poll(now) {
            match event {
                CacheEvent::ShouldRefresh(record) => {
                    // Assume cached records are still wanted and renew
                    // them before they lapse
                    let mut message = Message::new();
                    message
                        .queries
                        .push(Query::new(record.name.clone(), record.rtype()));
                    if let Err(err) = transport.send_to_all(&message) {
                        warn!("refresh query failed: {err}");
                    }
                }
                CacheEvent::Expired(record) => {
                    if let Some(name) = Self::instance_of(&record) {
                        self.update_service(&name, &mut events);
                    }
                }
            }
        }
        events
    }

    /// Earliest deadline the browser needs to be polled at.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.next_query, self.cache.next_trigger()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Absorb a response message, caching records of the browsed type
    /// and reconciling every touched instance exactly once.
    pub fn handle_message(&mut self, message: &Message, now: Instant) -> Vec<ServiceEvent> {
        let mut events = Vec::new();
        if !message.response {
            return events;
        }

        let mut touched: HashSet<Vec<u8>> = HashSet::new();
        for record in &message.records {
            if !self.wants(record) {
                continue;
            }
            self.cache.add_record(record.clone(), now);
            if let Some(name) = Self::instance_of(record) {
                touched.insert(name);
            }
        }
        for name in touched {
            self.update_service(&name, &mut events);
        }
        events
    }

    /// Whether a record belongs to the browsed service type: the PTR
    /// for the type itself, or an SRV/TXT under one of its instances.
    fn wants(&self, record: &Record) -> bool {
        match record.rtype() {
            TYPE_PTR => record.name == self.stype,
            TYPE_SRV | TYPE_TXT => {
                record.name.len() > self.stype.len() + 1
                    && record.name.ends_with(&self.stype)
                    && record.name[record.name.len() - self.stype.len() - 1] == b'.'
            }
            _ => false,
        }
    }

    /// The instance name a record contributes to.
    fn instance_of(record: &Record) -> Option<Vec<u8>> {
        match &record.data {
            RecordData::Ptr { target } => Some(target.clone()),
            RecordData::Srv { .. } | RecordData::Txt { .. } => Some(record.name.clone()),
            _ => None,
        }
    }

    /// Reconcile one instance against the cache, emitting the
    /// appropriate event when its visibility changed.
    fn update_service(&mut self, name: &[u8], events: &mut Vec<ServiceEvent>) {
        let existed = self.services.contains_key(name);

        // The service type starts after the instance label
        let stype = name
            .iter()
            .position(|&b| b == b'.')
            .map(|i| &name[i + 1..])
            .unwrap_or_default();

        let ptr_present = self
            .cache
            .lookup_all(stype, TYPE_PTR)
            .iter()
            .any(|r| r.target() == Some(name));
        let port = match self.cache.lookup_one(name, TYPE_SRV).map(|r| &r.data) {
            Some(RecordData::Srv { port, .. }) => Some(*port),
            _ => None,
        };

        match port {
            Some(port) if ptr_present => {
                let mut attributes = BTreeMap::new();
                for txt in self.cache.lookup_all(name, TYPE_TXT) {
                    if let RecordData::Txt { attributes: map } = &txt.data {
                        attributes.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                }
                let service = Service {
                    name: name.to_vec(),
                    stype: self.stype.clone(),
                    port,
                    attributes,
                };
                if existed {
                    events.push(ServiceEvent::Updated(service.clone()));
                } else {
                    events.push(ServiceEvent::Added(service.clone()));
                }
                self.services.insert(name.to_vec(), service);
            }
            _ => {
                if let Some(old) = self.services.remove(name) {
                    events.push(ServiceEvent::Removed(old));
                }
            }
        }
    }
}
