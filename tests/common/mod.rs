use std::io::Result;
use std::sync::Mutex;

use lanherald::Message;
use lanherald::Transport;

/// In-memory transport that records everything the engine sends, so a
/// test can inspect outgoing traffic and feed replies back in.
#[derive(Default)]
pub struct TestServer {
    messages: Mutex<Vec<Message>>,
}

impl TestServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message sent so far, oldest first.
    pub fn received_messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }
}

impl Transport for TestServer {
    fn send(&self, message: &Message) -> Result<()> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn send_to_all(&self, message: &Message) -> Result<()> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}
