//! # Runtime Module
//!
//! Single-threaded poll loop tying the protocol engine to a real UDP
//! transport.
//!
//! ## Lifecycle
//!
//! 1. Load configuration: `MdnsRuntime::from_config(config)`
//! 2. Register interests: `runtime.publish(service)`, `runtime.browse(type)`
//! 3. Start the loop: `runtime.run()`
//! 4. Stop gracefully: `runtime.shutdown()`
//!
//! Every inbound datagram is decoded once and dispatched to all
//! components as one atomic unit of work; timers are deadlines checked
//! on each pass, so no component ever blocks the loop.

pub mod config;

pub use config::{RuntimeConfig, ServiceConfig, TimingConfig};

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};

use crate::browser::{Browser, ServiceEvent};
use crate::codec::Message;
use crate::hostname::Hostname;
use crate::provider::{Provider, ServiceDefinition};
use crate::resolver::Resolver;
use crate::responder::Responder;
use crate::transport::{Transport, UdpTransport};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const RECV_BUFFER_SIZE: usize = 9000;

struct BrowserSlot {
    browser: Browser,
    /// Dropped receivers downgrade the slot to log-only delivery.
    sender: Option<mpsc::UnboundedSender<ServiceEvent>>,
}

impl BrowserSlot {
    fn deliver(&mut self, event: ServiceEvent) {
        if let Some(sender) = &self.sender {
            if sender.send(event).is_ok() {
                return;
            }
            self.sender = None;
            return;
        }
        match &event {
            ServiceEvent::Added(s) => {
                info!("service added: {}", String::from_utf8_lossy(&s.name))
            }
            ServiceEvent::Updated(s) => {
                debug!("service updated: {}", String::from_utf8_lossy(&s.name))
            }
            ServiceEvent::Removed(s) => {
                info!("service removed: {}", String::from_utf8_lossy(&s.name))
            }
        }
    }
}

struct Engine {
    hostname: Hostname,
    responder: Responder,
    providers: Vec<Provider>,
    browsers: Vec<BrowserSlot>,
    registered_hostname: Option<Vec<u8>>,
}

impl Engine {
    fn poll<T: Transport>(&mut self, now: Instant, transport: &T) {
        if let Some(name) = self.hostname.poll(now) {
            self.registered_hostname = Some(name.clone());
            for provider in &mut self.providers {
                provider.on_hostname_changed(&name, now, transport);
            }
        }
        self.responder.poll(now);
        for provider in &mut self.providers {
            provider.poll(now, transport);
        }
        for slot in &mut self.browsers {
            for event in slot.browser.poll(now, transport) {
                slot.deliver(event);
            }
        }
    }

    fn handle_message<T: Transport>(&mut self, message: &Message, now: Instant, transport: &T) {
        self.hostname.handle_message(message, now, transport);
        self.responder.handle_message(message, now, transport);
        for provider in &mut self.providers {
            provider.handle_message(message, now, transport);
        }
        for slot in &mut self.browsers {
            for event in slot.browser.handle_message(message, now) {
                slot.deliver(event);
            }
        }
    }
}

pub struct MdnsRuntime {
    transport: Arc<UdpTransport>,
    engine: Arc<Mutex<Engine>>,
    running: Arc<AtomicBool>,
    pending_lookups: Arc<Mutex<HashMap<Vec<u8>, Vec<oneshot::Sender<IpAddr>>>>>,
    timing: TimingConfig,
}

impl MdnsRuntime {
    /// Build a runtime from configuration, binding the multicast
    /// sockets immediately.
    pub fn from_config(config: RuntimeConfig) -> std::io::Result<Arc<Self>> {
        let interface = config
            .interface
            .as_deref()
            .and_then(|s| s.parse::<Ipv4Addr>().ok())
            .unwrap_or(Ipv4Addr::UNSPECIFIED);
        let transport = UdpTransport::with_interface(interface)?;

        let mut addresses = Vec::new();
        for raw in &config.addresses {
            match raw.parse::<IpAddr>() {
                Ok(address) => addresses.push(address),
                Err(_) => warn!("ignoring unparseable address {raw:?}"),
            }
        }

        let probe_window = Duration::from_millis(config.timing.probe_window_ms);
        let mut hostname = Hostname::new(addresses);
        hostname.set_probe_window(probe_window);

        let runtime = Arc::new(MdnsRuntime {
            transport: Arc::new(transport),
            engine: Arc::new(Mutex::new(Engine {
                hostname,
                responder: Responder::with_probe_window(probe_window),
                providers: Vec::new(),
                browsers: Vec::new(),
                registered_hostname: None,
            })),
            running: Arc::new(AtomicBool::new(true)),
            pending_lookups: Arc::new(Mutex::new(HashMap::new())),
            timing: config.timing.clone(),
        });

        for stype in &config.browse {
            // Log-only browsing for configured types
            let _ = runtime.attach_browser(stype.as_bytes().to_vec(), false);
        }
        for service in &config.services {
            let mut attributes = BTreeMap::new();
            for (key, value) in &service.attributes {
                attributes.insert(key.as_bytes().to_vec(), value.as_bytes().to_vec());
            }
            runtime.publish(ServiceDefinition {
                name: service.name.as_bytes().to_vec(),
                stype: ensure_fqdn(service.service_type.as_bytes().to_vec()),
                port: service.port,
                attributes,
            });
        }
        Ok(runtime)
    }

    /// Publish a service. The announcement happens once the host name
    /// is registered and the instance name survives probing.
    pub fn publish(&self, definition: ServiceDefinition) {
        let now = Instant::now();
        let mut engine = self.engine.lock().unwrap();
        let mut provider = Provider::with_probe_window(Duration::from_millis(
            self.timing.probe_window_ms,
        ));
        if let Some(hostname) = engine.registered_hostname.clone() {
            provider.on_hostname_changed(&hostname, now, &*self.transport);
        }
        provider.update(definition, now, &*self.transport);
        engine.providers.push(provider);
    }

    /// Publish a standalone record through the responder, claiming its
    /// name through probing when requested.
    pub fn register_record(&self, record: crate::Record, probe: bool) {
        let mut engine = self.engine.lock().unwrap();
        engine
            .responder
            .add_record(record, probe, Instant::now(), &*self.transport);
    }

    /// Withdraw a record registered through the responder.
    pub fn unregister_record(&self, record: &crate::Record) {
        self.engine.lock().unwrap().responder.remove_record(record);
    }

    /// Browse for a service type; events arrive on the returned
    /// channel.
    pub fn browse(&self, stype: impl Into<Vec<u8>>) -> mpsc::UnboundedReceiver<ServiceEvent> {
        self.attach_browser(stype.into(), true)
            .expect("channel requested")
    }

    fn attach_browser(
        &self,
        stype: Vec<u8>,
        with_channel: bool,
    ) -> Option<mpsc::UnboundedReceiver<ServiceEvent>> {
        let browser = Browser::with_timing(
            ensure_fqdn(stype),
            Duration::from_millis(self.timing.browse_interval_ms),
            self.timing.cache_jitter_ms,
        );
        let (sender, receiver) = if with_channel {
            let (tx, rx) = mpsc::unbounded_channel();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };
        self.engine
            .lock()
            .unwrap()
            .browsers
            .push(BrowserSlot { browser, sender });
        receiver
    }

    /// Resolve a host name to one of its addresses, waiting at most
    /// the configured lookup timeout.
    pub async fn lookup_address(&self, name: impl Into<Vec<u8>>) -> Option<IpAddr> {
        let name = ensure_fqdn(name.into());
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending_lookups.lock().unwrap();
            pending.entry(name.clone()).or_default().push(tx);
        }

        Resolver::new(name.clone()).query(&*self.transport);

        let timeout = Duration::from_millis(self.timing.lookup_timeout_ms);
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(address)) => Some(address),
            _ => {
                let mut pending = self.pending_lookups.lock().unwrap();
                if let Some(waiters) = pending.get_mut(&name) {
                    waiters.retain(|tx| !tx.is_closed());
                    if waiters.is_empty() {
                        pending.remove(&name);
                    }
                }
                None
            }
        }
    }

    /// The poll loop. Blocks the calling thread until
    /// [`MdnsRuntime::shutdown`] or [`MdnsRuntime::stop`].
    pub fn run(&self) {
        info!("mDNS event loop started");
        {
            let mut engine = self.engine.lock().unwrap();
            engine
                .hostname
                .assert_hostname(Instant::now(), &*self.transport);
        }

        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        while self.running.load(Ordering::Relaxed) {
            {
                let mut engine = self.engine.lock().unwrap();
                engine.poll(Instant::now(), &*self.transport);
            }

            loop {
                match self.transport.receive(&mut buffer) {
                    Ok((len, src)) => {
                        #[cfg(feature = "packet-dump")]
                        dump_packet(&buffer[..len], &src);
                        match Message::from_packet(&buffer[..len], Some(src)) {
                            Ok(message) => {
                                let mut engine = self.engine.lock().unwrap();
                                engine.handle_message(
                                    &message,
                                    Instant::now(),
                                    &*self.transport,
                                );
                                drop(engine);
                                self.complete_lookups(&message);
                            }
                            Err(err) => {
                                debug!("discarding malformed packet from {src}: {err}")
                            }
                        }
                    }
                    Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                    Err(e) => {
                        warn!("receive error: {e}");
                        break;
                    }
                }
            }

            thread::sleep(POLL_INTERVAL);
        }
        info!("mDNS event loop stopped");
    }

    /// Stop the loop without saying goodbye.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Withdraw every published service, then stop the loop.
    pub fn shutdown(&self) {
        {
            let engine = self.engine.lock().unwrap();
            for provider in &engine.providers {
                provider.farewell(&*self.transport);
            }
        }
        self.stop();
    }

    fn complete_lookups(&self, message: &Message) {
        if !message.response {
            return;
        }
        let mut pending = self.pending_lookups.lock().unwrap();
        if pending.is_empty() {
            return;
        }
        let names: Vec<Vec<u8>> = pending.keys().cloned().collect();
        for name in names {
            let addresses = Resolver::new(name.clone()).handle_message(message);
            let Some(address) = addresses.into_iter().next() else {
                continue;
            };
            if let Some(waiters) = pending.remove(&name) {
                for waiter in waiters {
                    let _ = waiter.send(address);
                }
            }
        }
    }
}

fn ensure_fqdn(mut name: Vec<u8>) -> Vec<u8> {
    if !name.ends_with(b".") {
        name.push(b'.');
    }
    name
}

#[cfg(feature = "packet-dump")]
fn dump_packet(data: &[u8], src: &std::net::SocketAddr) {
    let hex: Vec<String> = data.iter().map(|b| format!("{b:02x}")).collect();
    log::trace!("{} -> {}", src, hex.join(" "));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_fqdn_appends_single_dot() {
        assert_eq!(ensure_fqdn(b"_http._tcp.local".to_vec()), b"_http._tcp.local.");
        assert_eq!(ensure_fqdn(b"_http._tcp.local.".to_vec()), b"_http._tcp.local.");
    }
}
