use std::io::Result;

use crate::codec::Message;

/// A channel able to deliver DNS messages to the local network.
///
/// Implementations own the sockets; the engine hands them fully formed
/// messages and never touches raw datagrams itself. Designed to be
/// pluggable (e.g. for mocking in tests).
pub trait Transport {
    /// Send to the message's destination address, or over the
    /// multicast groups when it carries none.
    fn send(&self, message: &Message) -> Result<()>;

    /// Send over the standard multicast groups on every active
    /// interface.
    fn send_to_all(&self, message: &Message) -> Result<()>;
}
