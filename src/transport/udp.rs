use std::io::{Error, ErrorKind, Result};
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};

use crate::codec::Message;
use crate::mdns::{MDNS_IPV4_ADDR, MDNS_IPV6_ADDR, MDNS_PORT, mdns_ipv4_target, mdns_ipv6_target};

use super::traits::Transport;

/// Multicast UDP transport bound to the mDNS port.
///
/// The IPv4 socket is required; the IPv6 socket is best-effort and
/// skipped on hosts without IPv6 connectivity. Both are non-blocking;
/// `receive` is meant to be drained until `WouldBlock`.
pub struct UdpTransport {
    v4: UdpSocket,
    v6: Option<UdpSocket>,
}

impl UdpTransport {
    pub fn new() -> Result<Self> {
        Self::with_interface(Ipv4Addr::UNSPECIFIED)
    }

    /// Bind to the mDNS port and join the multicast groups, sending
    /// IPv4 multicast out through `interface`.
    pub fn with_interface(interface: Ipv4Addr) -> Result<Self> {
        let v4 = Self::bind_v4(interface)?;
        let v6 = Self::bind_v6().ok();
        if v6.is_none() {
            log::debug!("IPv6 mDNS socket unavailable, continuing with IPv4 only");
        }
        Ok(UdpTransport { v4, v6 })
    }

    fn bind_v4(interface: Ipv4Addr) -> Result<UdpSocket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        // Port sharing with other mDNS stacks on the host
        socket.set_reuse_address(true)?;
        let bind: SocketAddr = (Ipv4Addr::UNSPECIFIED, MDNS_PORT).into();
        socket.bind(&bind.into())?;
        socket.set_nonblocking(true)?;
        socket.set_multicast_if_v4(&interface)?;
        let socket: UdpSocket = socket.into();
        socket.join_multicast_v4(&MDNS_IPV4_ADDR, &interface)?;
        socket.set_multicast_loop_v4(true)?;
        Ok(socket)
    }

    fn bind_v6() -> Result<UdpSocket> {
        let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_only_v6(true)?;
        let bind: SocketAddr = (std::net::Ipv6Addr::UNSPECIFIED, MDNS_PORT).into();
        socket.bind(&bind.into())?;
        socket.set_nonblocking(true)?;
        let socket: UdpSocket = socket.into();
        socket.join_multicast_v6(&MDNS_IPV6_ADDR, 0)?;
        socket.set_multicast_loop_v6(true)?;
        Ok(socket)
    }

    /// Receive one pending datagram from either socket.
    pub fn receive(&self, buffer: &mut [u8]) -> Result<(usize, SocketAddr)> {
        match self.v4.recv_from(buffer) {
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => {}
            other => return other,
        }
        if let Some(v6) = &self.v6 {
            return v6.recv_from(buffer);
        }
        Err(Error::from(ErrorKind::WouldBlock))
    }

    fn send_packet(&self, packet: &[u8], destination: SocketAddr) -> Result<()> {
        let socket = match destination {
            SocketAddr::V4(_) => &self.v4,
            SocketAddr::V6(_) => self
                .v6
                .as_ref()
                .ok_or_else(|| Error::new(ErrorKind::Unsupported, "no IPv6 socket bound"))?,
        };
        socket.send_to(packet, destination)?;
        Ok(())
    }

    fn encode(message: &Message) -> Result<Vec<u8>> {
        message
            .to_packet()
            .map_err(|e| Error::new(ErrorKind::InvalidData, e))
    }
}

impl Transport for UdpTransport {
    fn send(&self, message: &Message) -> Result<()> {
        let packet = Self::encode(message)?;
        match message.address {
            Some(destination) => self.send_packet(&packet, destination),
            None => {
                self.send_packet(&packet, mdns_ipv4_target())?;
                if self.v6.is_some() {
                    self.send_packet(&packet, mdns_ipv6_target())?;
                }
                Ok(())
            }
        }
    }

    fn send_to_all(&self, message: &Message) -> Result<()> {
        let packet = Self::encode(message)?;
        self.send_packet(&packet, mdns_ipv4_target())?;
        if self.v6.is_some() {
            self.send_packet(&packet, mdns_ipv6_target())?;
        }
        Ok(())
    }
}
