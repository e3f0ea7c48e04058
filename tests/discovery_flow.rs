mod common;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use common::TestServer;
use lanherald::codec::TYPE_SRV;
use lanherald::{
    Browser, Hostname, Message, Provider, Record, RecordData, ServiceDefinition, ServiceEvent,
};

const STYPE: &[u8] = b"_http._tcp.local.";

fn definition() -> ServiceDefinition {
    let mut attributes = BTreeMap::new();
    attributes.insert(b"path".to_vec(), b"/docs".to_vec());
    ServiceDefinition {
        name: b"web".to_vec(),
        stype: STYPE.to_vec(),
        port: 8080,
        attributes,
    }
}

/// Register a hostname and publish a service through it, delivering
/// the announcer's traffic to a browser on "another machine".
#[test]
fn test_published_service_is_discovered() {
    let announcer = TestServer::new();
    let observer = TestServer::new();
    let t0 = Instant::now();

    // The publishing side: hostname, then the service
    let mut hostname = Hostname::with_base(&b"mybox.local."[..], vec!["192.168.1.5".parse().unwrap()]);
    let mut provider = Provider::new();
    hostname.assert_hostname(t0, &announcer);

    let registered = hostname.poll(t0 + Duration::from_secs(2)).unwrap();
    provider.on_hostname_changed(&registered, t0 + Duration::from_secs(2), &announcer);
    provider.update(definition(), t0 + Duration::from_secs(2), &announcer);
    provider.poll(t0 + Duration::from_secs(4), &announcer);

    // The browsing side consumes everything the announcer put on the
    // wire
    let mut browser = Browser::new(STYPE);
    let mut events = Vec::new();
    for message in announcer.received_messages() {
        events.extend(browser.handle_message(&message, t0 + Duration::from_secs(4)));
    }

    assert_eq!(events.len(), 1);
    match &events[0] {
        ServiceEvent::Added(service) => {
            assert_eq!(service.name, b"web._http._tcp.local.");
            assert_eq!(service.port, 8080);
            assert_eq!(
                service.attributes.get(&b"path".to_vec()),
                Some(&b"/docs".to_vec())
            );
        }
        other => panic!("expected Added, got {other:?}"),
    }

    // The browser answers its own periodic queries with known answers
    browser.poll(t0 + Duration::from_secs(5), &observer);
    let query = &observer.received_messages()[0];
    assert!(!query.response);
    assert!(!query.records.is_empty());
}

/// A goodbye for the record set removes the service on the browser.
#[test]
fn test_goodbye_removes_discovered_service() {
    let announcer = TestServer::new();
    let t0 = Instant::now();

    let mut hostname = Hostname::with_base(&b"mybox.local."[..], vec!["192.168.1.5".parse().unwrap()]);
    let mut provider = Provider::new();
    hostname.assert_hostname(t0, &announcer);
    let registered = hostname.poll(t0 + Duration::from_secs(2)).unwrap();
    provider.on_hostname_changed(&registered, t0 + Duration::from_secs(2), &announcer);
    provider.update(definition(), t0 + Duration::from_secs(2), &announcer);
    provider.poll(t0 + Duration::from_secs(4), &announcer);

    let mut browser = Browser::new(STYPE);
    for message in announcer.received_messages() {
        browser.handle_message(&message, t0 + Duration::from_secs(4));
    }
    assert_eq!(browser.services().count(), 1);

    announcer.clear();
    provider.farewell(&announcer);

    let mut events = Vec::new();
    for message in announcer.received_messages() {
        events.extend(browser.handle_message(&message, t0 + Duration::from_secs(5)));
    }
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ServiceEvent::Removed(_)));
    assert_eq!(browser.services().count(), 0);
}

/// A competing claim during the probe window renames the instance
/// before anything is announced.
#[test]
fn test_probe_conflict_renames_before_announcement() {
    let announcer = TestServer::new();
    let t0 = Instant::now();

    let mut hostname = Hostname::with_base(&b"mybox.local."[..], vec!["192.168.1.5".parse().unwrap()]);
    let mut provider = Provider::new();
    hostname.assert_hostname(t0, &announcer);
    let registered = hostname.poll(t0 + Duration::from_secs(2)).unwrap();
    provider.on_hostname_changed(&registered, t0 + Duration::from_secs(2), &announcer);
    provider.update(definition(), t0 + Duration::from_secs(2), &announcer);

    // A peer already owns web._http._tcp.local.
    let mut conflict = Message::new();
    conflict.response = true;
    conflict.records.push(Record::new(
        &b"web._http._tcp.local."[..],
        3600,
        RecordData::Srv {
            priority: 0,
            weight: 0,
            port: 9,
            target: b"peer.local.".to_vec(),
        },
    ));
    provider.handle_message(&conflict, t0 + Duration::from_secs(3), &announcer);
    provider.poll(t0 + Duration::from_secs(6), &announcer);

    let mut browser = Browser::new(STYPE);
    let mut events = Vec::new();
    for message in announcer.received_messages() {
        events.extend(browser.handle_message(&message, t0 + Duration::from_secs(6)));
    }

    assert_eq!(events.len(), 1);
    match &events[0] {
        ServiceEvent::Added(service) => {
            assert_eq!(service.name, b"web-2._http._tcp.local.");
        }
        other => panic!("expected Added, got {other:?}"),
    }
}

/// A directed SRV query against the announcer is answered from the
/// published set.
#[test]
fn test_browser_query_is_answered_by_provider() {
    let announcer = TestServer::new();
    let t0 = Instant::now();

    let mut hostname = Hostname::with_base(&b"mybox.local."[..], vec!["192.168.1.5".parse().unwrap()]);
    let mut provider = Provider::new();
    hostname.assert_hostname(t0, &announcer);
    let registered = hostname.poll(t0 + Duration::from_secs(2)).unwrap();
    provider.on_hostname_changed(&registered, t0 + Duration::from_secs(2), &announcer);
    provider.update(definition(), t0 + Duration::from_secs(2), &announcer);
    provider.poll(t0 + Duration::from_secs(4), &announcer);
    announcer.clear();

    let mut query = Message::new();
    query
        .queries
        .push(lanherald::Query::new(&b"web._http._tcp.local."[..], TYPE_SRV));
    query.address = Some("192.168.1.9:49152".parse().unwrap());
    provider.handle_message(&query, t0 + Duration::from_secs(5), &announcer);

    let replies = announcer.received_messages();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].response);
    assert_eq!(replies[0].records.len(), 1);
    assert_eq!(replies[0].records[0].rtype(), TYPE_SRV);
    assert_eq!(replies[0].records[0].target(), Some(&b"mybox.local."[..]));
}
