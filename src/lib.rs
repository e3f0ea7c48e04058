pub mod browser;
pub mod cache;
pub mod codec;
pub mod hostname;
pub mod mdns;
pub mod probe;
pub mod provider;
pub mod resolver;
pub mod responder;
pub mod runtime;
pub mod transport;

pub use browser::{Browser, Service, ServiceEvent};
pub use cache::{CacheEvent, RecordCache};
pub use codec::{Message, Query, Record, RecordData, WireError};
pub use hostname::Hostname;
pub use probe::Probe;
pub use provider::{Provider, ServiceDefinition};
pub use resolver::Resolver;
pub use responder::Responder;
pub use runtime::{MdnsRuntime, RuntimeConfig};
pub use transport::{Transport, UdpTransport};
