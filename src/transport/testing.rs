use std::cell::RefCell;
use std::io::Result;

use crate::codec::Message;

use super::Transport;

/// Records every message a component sends, for unit tests.
#[derive(Default)]
pub(crate) struct RecordingTransport {
    pub sent: RefCell<Vec<Message>>,
    pub broadcast: RefCell<Vec<Message>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, message: &Message) -> Result<()> {
        self.sent.borrow_mut().push(message.clone());
        Ok(())
    }

    fn send_to_all(&self, message: &Message) -> Result<()> {
        self.broadcast.borrow_mut().push(message.clone());
        Ok(())
    }
}
