//! Browse the local network for a service type.
//!
//! Usage: browse [service-type]   (default: _http._tcp.local.)

use std::env;
use std::sync::Arc;
use std::thread;

use lanherald::ServiceEvent;
use lanherald::runtime::{MdnsRuntime, RuntimeConfig};

fn main() {
    env_logger::init();

    let stype = env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("_http._tcp.local."));
    println!("Browsing for {stype} (Ctrl+C to quit)");

    let runtime =
        MdnsRuntime::from_config(RuntimeConfig::default()).expect("failed to bind mDNS sockets");
    let mut events = runtime.browse(stype.into_bytes());

    let handle = Arc::clone(&runtime);
    ctrlc::set_handler(move || handle.stop()).expect("failed to install Ctrl+C handler");

    thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("failed to build tokio runtime");
        rt.block_on(async {
            while let Some(event) = events.recv().await {
                match event {
                    ServiceEvent::Added(s) => {
                        println!("+ {} port {}", String::from_utf8_lossy(&s.name), s.port)
                    }
                    ServiceEvent::Updated(s) => {
                        println!("~ {}", String::from_utf8_lossy(&s.name))
                    }
                    ServiceEvent::Removed(s) => {
                        println!("- {}", String::from_utf8_lossy(&s.name))
                    }
                }
            }
        });
    });

    // Blocks until Ctrl+C flips the running flag
    runtime.run();
}
