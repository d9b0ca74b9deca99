//! Single-slot rendezvous between a blocked worker and the transport layer.
//!
//! Every session owns one [`Mailbox`]. The worker blocks in [`Mailbox::wait`] after
//! publishing a question; whoever clears that question (an answer, `mark_done` or
//! `mark_error`) makes exactly one [`Mailbox::deposit`]. Deposits never block.

use flume::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::time::Duration;
use tracing::warn;

/// What a blocked `ask` receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The candidate's answer to the pending question
    Answer(String),
    /// The session finished before an answer arrived
    Released,
}

impl Delivery {
    /// The answer text; a release yields an empty answer.
    pub fn into_text(self) -> String {
        match self {
            Delivery::Answer(text) => text,
            Delivery::Released => String::new(),
        }
    }
}

/// One-element mailbox backed by a bounded flume channel
#[derive(Debug, Clone)]
pub struct Mailbox {
    sender: Sender<Delivery>,
    receiver: Receiver<Delivery>,
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailbox {
    pub fn new() -> Self {
        let (sender, receiver) = flume::bounded(1);
        Self { sender, receiver }
    }

    /// Place a delivery in the slot without blocking.
    ///
    /// Returns `false` and drops the delivery if the slot is already occupied.
    pub fn deposit(&self, delivery: Delivery) -> bool {
        match self.sender.try_send(delivery) {
            Ok(()) => true,
            Err(TrySendError::Full(delivery)) => {
                warn!("Mailbox already holds a delivery, dropping {:?}", delivery);
                false
            }
            // Unreachable while `self` holds the receiver
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Block until a delivery arrives.
    pub fn wait(&self) -> Delivery {
        self.receiver.recv().unwrap_or(Delivery::Released)
    }

    /// Block until a delivery arrives or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Delivery> {
        match self.receiver.recv_timeout(timeout) {
            Ok(delivery) => Some(delivery),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Delivery::Released),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
