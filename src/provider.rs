//! Publication of one service's record set.
//!
//! A provider owns the PTR/SRV/TXT trio for a single service instance
//! plus the enumeration PTR under `_services._dns-sd._udp.local.`. The
//! SRV name is confirmed through a [`Probe`] before anything is
//! announced; every re-publication of an already announced set is
//! preceded by a TTL 0 goodbye for the old records.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::codec::{Message, Record, RecordData, TYPE_PTR, TYPE_SRV, TYPE_TXT};
use crate::mdns::BROWSE_TYPE;
use crate::probe::{DEFAULT_PROBE_WINDOW, Probe};
use crate::transport::Transport;

const DEFAULT_RECORD_TTL: u32 = 3600;

/// What a service looks like to the application publishing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDefinition {
    /// Instance name, without the type (`my printer`).
    pub name: Vec<u8>,
    /// Service type (`_http._tcp.local.`).
    pub stype: Vec<u8>,
    pub port: u16,
    pub attributes: BTreeMap<Vec<u8>, Vec<u8>>,
}

struct PublishedSet {
    browse_ptr: Record,
    ptr: Record,
    srv: Record,
    txt: Record,
}

pub struct Provider {
    definition: Option<ServiceDefinition>,
    /// Registered host name the SRV record targets.
    host_target: Option<Vec<u8>>,
    probe: Option<Probe>,
    published: Option<PublishedSet>,
    confirmed: bool,
    probe_window: Duration,
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider {
    pub fn new() -> Self {
        Self::with_probe_window(DEFAULT_PROBE_WINDOW)
    }

    pub fn with_probe_window(probe_window: Duration) -> Self {
        Provider {
            definition: None,
            host_target: None,
            probe: None,
            published: None,
            confirmed: false,
            probe_window,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.probe.as_ref().and_then(|p| p.next_deadline())
    }

    /// Set or change the published service. Publication waits until a
    /// host name is registered; a changed instance name goes back
    /// through probing.
    pub fn update<T: Transport>(
        &mut self,
        service: ServiceDefinition,
        now: Instant,
        transport: &T,
    ) {
        let mut service = service;
        // Dots inside the instance label would corrupt the name
        for byte in &mut service.name {
            if *byte == b'.' {
                *byte = b'-';
            }
        }
        let fq_name = Self::fq_name(&service);
        self.definition = Some(service);

        if self.host_target.is_none() {
            return;
        }
        let unchanged = self
            .published
            .as_ref()
            .is_some_and(|set| set.srv.name == fq_name);
        if self.confirmed && unchanged {
            self.publish(transport);
        } else {
            self.confirm(now, transport);
        }
    }

    /// Adopt a newly registered or renamed host name.
    pub fn on_hostname_changed<T: Transport>(
        &mut self,
        hostname: &[u8],
        now: Instant,
        transport: &T,
    ) {
        self.host_target = Some(hostname.to_vec());
        if self.definition.is_some() {
            self.confirm(now, transport);
        }
    }

    /// Withdraw the announced records with a TTL 0 goodbye.
    pub fn farewell<T: Transport>(&self, transport: &T) {
        let Some(set) = &self.published else {
            return;
        };
        let mut message = Message::new();
        message.response = true;
        for record in [&set.ptr, &set.srv, &set.txt] {
            let mut goodbye = record.clone();
            goodbye.ttl = 0;
            message.records.push(goodbye);
        }
        if let Err(err) = transport.send_to_all(&message) {
            warn!("goodbye announcement failed: {err}");
        }
    }

    /// Feed an inbound message: responses drive the probe, queries are
    /// answered with known-answer suppression.
    pub fn handle_message<T: Transport>(&mut self, message: &Message, now: Instant, transport: &T) {
        if message.response {
            if let Some(probe) = &mut self.probe {
                probe.handle_message(message, now, transport);
            }
            return;
        }
        if !self.confirmed {
            return;
        }
        let Some(set) = &self.published else {
            return;
        };

        let mut send_browse_ptr = false;
        let mut send_ptr = false;
        let mut send_srv = false;
        let mut send_txt = false;

        for query in &message.queries {
            if query.rtype == TYPE_PTR && query.name == BROWSE_TYPE {
                send_browse_ptr = true;
            } else if query.rtype == TYPE_PTR && query.name == set.ptr.name {
                send_ptr = true;
            } else if query.rtype == TYPE_SRV && query.name == set.srv.name {
                send_srv = true;
            } else if query.rtype == TYPE_TXT && query.name == set.txt.name {
                send_txt = true;
            }
        }

        // Known-answer suppression: skip records the asker already has
        for record in &message.records {
            if *record == set.ptr {
                send_ptr = false;
            } else if *record == set.srv {
                send_srv = false;
            } else if *record == set.txt {
                send_txt = false;
            }
        }

        // A browser learning the instance needs the whole set
        if send_ptr {
            send_srv = true;
            send_txt = true;
        }

        if send_browse_ptr || send_ptr || send_srv || send_txt {
            let mut reply = Message::reply_to(message);
            if send_browse_ptr {
                reply.records.push(set.browse_ptr.clone());
            }
            if send_ptr {
                reply.records.push(set.ptr.clone());
            }
            if send_srv {
                reply.records.push(set.srv.clone());
            }
            if send_txt {
                reply.records.push(set.txt.clone());
            }
            if let Err(err) = transport.send(&reply) {
                warn!("failed to answer service query: {err}");
            }
        }
    }

    /// Drive the pending probe; confirmation publishes the record set,
    /// saying goodbye to a previously announced one first.
    pub fn poll<T: Transport>(&mut self, now: Instant, transport: &T) {
        let Some(probe) = &mut self.probe else {
            return;
        };
        let Some(confirmed_srv) = probe.poll(now) else {
            return;
        };
        self.probe = None;

        if self.confirmed {
            self.farewell(transport);
        } else {
            self.confirmed = true;
        }
        self.publish_as(confirmed_srv.name, transport);
    }

    fn fq_name(service: &ServiceDefinition) -> Vec<u8> {
        let mut name = service.name.clone();
        name.push(b'.');
        name.extend_from_slice(&service.stype);
        name
    }

    /// Start confirming the (possibly changed) instance name. Replaces
    /// any probe already in flight.
    fn confirm<T: Transport>(&mut self, now: Instant, transport: &T) {
        let (Some(service), Some(host)) = (&self.definition, &self.host_target) else {
            return;
        };
        let srv_proposed = Record::new(
            Self::fq_name(service),
            DEFAULT_RECORD_TTL,
            RecordData::Srv {
                priority: 0,
                weight: 0,
                port: service.port,
                target: host.clone(),
            },
        );
        debug!(
            "confirming service name {:?}",
            String::from_utf8_lossy(&srv_proposed.name)
        );
        let mut probe = Probe::with_window(srv_proposed, self.probe_window);
        probe.start(now, transport);
        self.probe = Some(probe);
    }

    /// Re-announce the current set under its already confirmed name.
    fn publish<T: Transport>(&mut self, transport: &T) {
        if let Some(name) = self.published.as_ref().map(|set| set.srv.name.clone()) {
            self.publish_as(name, transport);
        }
    }

    fn publish_as<T: Transport>(&mut self, fq_name: Vec<u8>, transport: &T) {
        let (Some(service), Some(host)) = (&self.definition, &self.host_target) else {
            return;
        };
        let set = PublishedSet {
            browse_ptr: Record::new(
                BROWSE_TYPE,
                DEFAULT_RECORD_TTL,
                RecordData::Ptr {
                    target: service.stype.clone(),
                },
            ),
            ptr: Record::new(
                service.stype.clone(),
                DEFAULT_RECORD_TTL,
                RecordData::Ptr {
                    target: fq_name.clone(),
                },
            ),
            srv: Record::new(
                fq_name.clone(),
                DEFAULT_RECORD_TTL,
                RecordData::Srv {
                    priority: 0,
                    weight: 0,
                    port: service.port,
                    target: host.clone(),
                },
            ),
            txt: Record::new(
                fq_name,
                DEFAULT_RECORD_TTL,
                RecordData::Txt {
                    attributes: service.attributes.clone(),
                },
            ),
        };

        let mut message = Message::new();
        message.response = true;
        message.records.push(set.ptr.clone());
        message.records.push(set.srv.clone());
        message.records.push(set.txt.clone());
        if let Err(err) = transport.send_to_all(&message) {
            warn!("service announcement failed: {err}");
        }
        self.published = Some(set);
    }
}
