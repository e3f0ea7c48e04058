//! TTL record cache with scheduled refresh and expiry.
//!
//! Each stored record carries a list of absolute trigger timestamps at
//! 50%, 85%, 90%, 95% and 100% of its TTL. A single global deadline
//! tracks the earliest pending trigger; callers drive the cache by
//! calling [`RecordCache::poll`] when that deadline passes.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::codec::{Record, TYPE_ANY};

/// Default spread added to the early triggers so peers that cached the
/// same record do not refresh in lockstep.
pub const DEFAULT_JITTER_MS: u64 = 20;

/// Notification produced by the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    /// A trigger short of expiry fired; the record should be
    /// re-queried before it lapses.
    ShouldRefresh(Record),
    /// The record reached the end of its TTL, or a goodbye purged it.
    Expired(Record),
}

struct CacheEntry {
    record: Record,
    /// Pending triggers, ascending; the last one is the 100% expiry.
    triggers: Vec<Instant>,
}

pub struct RecordCache {
    entries: Vec<CacheEntry>,
    next_trigger: Option<Instant>,
    jitter_ms: u64,
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordCache {
    pub fn new() -> Self {
        Self::with_jitter(DEFAULT_JITTER_MS)
    }

    pub fn with_jitter(jitter_ms: u64) -> Self {
        RecordCache {
            entries: Vec::new(),
            next_trigger: None,
            jitter_ms,
        }
    }

    /// Store a record, honoring cache-flush and goodbye semantics.
    ///
    /// A flush-flagged record first removes every entry sharing its
    /// (name, type). A zero TTL removes exact matches and reports the
    /// expiry without storing anything. Otherwise the record is
    /// inserted, replacing in place the entry with the same
    /// (name, type, rdata) identity.
    pub fn add_record(&mut self, record: Record, now: Instant) -> Vec<CacheEvent> {
        let mut events = Vec::new();

        if record.flush_cache {
            self.entries
                .retain(|e| e.record.name != record.name || e.record.rtype() != record.rtype());
        }

        if record.ttl == 0 {
            self.entries.retain(|e| !e.record.matches(&record));
            self.rearm();
            events.push(CacheEvent::Expired(record));
            return events;
        }

        let triggers = self.triggers_for(&record, now);
        match self.entries.iter_mut().find(|e| e.record.matches(&record)) {
            Some(entry) => {
                entry.record = record;
                entry.triggers = triggers;
            }
            None => self.entries.push(CacheEntry { record, triggers }),
        }
        self.rearm();
        events
    }

    /// Consume every trigger that has elapsed, emitting refresh and
    /// expiry notifications, and re-arm the global deadline.
    pub fn poll(&mut self, now: Instant) -> Vec<CacheEvent> {
        match self.next_trigger {
            Some(deadline) if deadline <= now => {}
            _ => return Vec::new(),
        }

        let mut events = Vec::new();
        self.entries.retain_mut(|entry| {
            let mut fired = false;
            while entry.triggers.first().is_some_and(|&t| t <= now) {
                entry.triggers.remove(0);
                fired = true;
            }
            if entry.triggers.is_empty() {
                events.push(CacheEvent::Expired(entry.record.clone()));
                false
            } else {
                if fired {
                    events.push(CacheEvent::ShouldRefresh(entry.record.clone()));
                }
                true
            }
        });
        self.rearm();
        events
    }

    /// The earliest pending trigger across all entries.
    pub fn next_trigger(&self) -> Option<Instant> {
        self.next_trigger
    }

    /// First cached record matching name and type (`TYPE_ANY` matches
    /// every type).
    pub fn lookup_one(&self, name: &[u8], rtype: u16) -> Option<&Record> {
        self.entries
            .iter()
            .map(|e| &e.record)
            .find(|r| r.name == name && (rtype == TYPE_ANY || r.rtype() == rtype))
    }

    /// All cached records matching name and type.
    pub fn lookup_all(&self, name: &[u8], rtype: u16) -> Vec<&Record> {
        self.entries
            .iter()
            .map(|e| &e.record)
            .filter(|r| r.name == name && (rtype == TYPE_ANY || r.rtype() == rtype))
            .collect()
    }

    /// All cached records of a type, regardless of name.
    pub fn records_of_type(&self, rtype: u16) -> Vec<&Record> {
        self.entries
            .iter()
            .map(|e| &e.record)
            .filter(|r| r.rtype() == rtype)
            .collect()
    }

    fn triggers_for(&self, record: &Record, now: Instant) -> Vec<Instant> {
        let random = if self.jitter_ms == 0 {
            0
        } else {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .subsec_nanos() as u64;
            nanos % self.jitter_ms
        };
        let ttl = record.ttl as u64;
        vec![
            now + Duration::from_millis(ttl * 500 + random),
            now + Duration::from_millis(ttl * 850 + random),
            now + Duration::from_millis(ttl * 900 + random),
            now + Duration::from_millis(ttl * 950 + random),
            now + Duration::from_secs(ttl),
        ]
    }

    fn rearm(&mut self) {
        self.next_trigger = self
            .entries
            .iter()
            .filter_map(|e| e.triggers.first().copied())
            .min();
    }
}
