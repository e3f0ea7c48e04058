//! Well-known mDNS addresses and names.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

/// UDP port used by mDNS.
pub const MDNS_PORT: u16 = 5353;

/// IPv4 multicast group for mDNS queries and responses.
pub const MDNS_IPV4_ADDR: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// IPv6 multicast group for mDNS queries and responses.
pub const MDNS_IPV6_ADDR: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb);

/// Meta-query name that enumerates every advertised service type.
pub const BROWSE_TYPE: &[u8] = b"_services._dns-sd._udp.local.";

pub fn mdns_ipv4_target() -> SocketAddr {
    SocketAddr::from((MDNS_IPV4_ADDR, MDNS_PORT))
}

pub fn mdns_ipv6_target() -> SocketAddr {
    SocketAddr::from((MDNS_IPV6_ADDR, MDNS_PORT))
}
