//! `open_pub` (C7.1): a scoped publisher.
//!
//! Grounded on `mqclient/queue.py::Queue.send` for the serialize-then-send
//! call shape, generalized into an explicit handle since this corpus's
//! `open_pub` closes its `Producer` unconditionally on block exit rather than
//! caching it at the `Queue` level (see `DESIGN.md` for why the two diverge).

use serde_json::Value;

use crate::adapter::Producer;
use crate::error::Error;
use crate::message::{Headers, Message};

/// The object yielded inside an `open_pub` block.
pub struct PubHandle<'a> {
    producer: &'a mut dyn Producer,
}

impl<'a> PubHandle<'a> {
    pub(crate) fn new(producer: &'a mut dyn Producer) -> Self {
        Self { producer }
    }

    /// Serializes `data` (with optional `headers`) into an envelope and
    /// sends it, matching `Queue.send`'s `Message.serialize` + `send_message`
    /// sequence.
    pub async fn send(&mut self, data: Value, headers: Option<Headers>) -> Result<(), Error> {
        let payload = Message::serialize(data, headers)?;
        self.producer
            .send_message(payload)
            .await
            .map_err(Error::Adapter)
    }
}
