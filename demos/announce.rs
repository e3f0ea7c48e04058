//! Publish a service on the local network.
//!
//! Usage: announce [config.json]
//!
//! Without a config file, announces a demo HTTP service on port 8080.

use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;

use lanherald::ServiceDefinition;
use lanherald::runtime::{MdnsRuntime, RuntimeConfig};

fn main() {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => RuntimeConfig::load(&path).expect("failed to load config"),
        None => RuntimeConfig::default(),
    };
    let configured_services = !config.services.is_empty();

    let runtime = MdnsRuntime::from_config(config).expect("failed to bind mDNS sockets");

    if !configured_services {
        let mut attributes = BTreeMap::new();
        attributes.insert(b"path".to_vec(), b"/".to_vec());
        runtime.publish(ServiceDefinition {
            name: b"lanherald demo".to_vec(),
            stype: b"_http._tcp.local.".to_vec(),
            port: 8080,
            attributes,
        });
        println!("Announcing 'lanherald demo' on _http._tcp.local. port 8080 (Ctrl+C to quit)");
    }

    let handle = Arc::clone(&runtime);
    ctrlc::set_handler(move || {
        // Withdraw our records before going down
        handle.shutdown();
    })
    .expect("failed to install Ctrl+C handler");

    runtime.run();
}
