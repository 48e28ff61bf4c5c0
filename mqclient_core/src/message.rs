use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A map of free-form headers carried alongside a message's `data`, used to
/// thread tracing context (or any other out-of-band metadata) from a producer
/// to a consumer without it leaking into the user payload.
pub type Headers = BTreeMap<String, Value>;

/// Broker-assigned identifier of a delivered message.
///
/// Opaque to the core; not stable across redeliveries, and therefore
/// deliberately excluded from [`Message`]'s [`PartialEq`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// An integer identifier (e.g. a delivery tag).
    Int(i64),
    /// A string identifier (e.g. a UUID or an opaque broker token).
    Str(String),
    /// A raw byte identifier.
    Bytes(Vec<u8>),
}

impl From<i64> for MessageId {
    fn from(value: i64) -> Self {
        MessageId::Int(value)
    }
}

impl From<u64> for MessageId {
    fn from(value: u64) -> Self {
        MessageId::Int(value as i64)
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        MessageId::Str(value)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        MessageId::Str(value.to_string())
    }
}

impl From<Vec<u8>> for MessageId {
    fn from(value: Vec<u8>) -> Self {
        MessageId::Bytes(value)
    }
}

/// The envelope's two-field wire shape: `{ headers, data }`.
#[derive(Debug, Serialize, Deserialize)]
struct EnvelopeBody {
    #[serde(default)]
    headers: Headers,
    data: Value,
}

/// Failure to encode or decode a [`Message`]'s payload.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The user's `data` could not be serialized into the envelope.
    #[error("failed to serialize message data: {0}")]
    Encode(#[source] serde_json::Error),
    /// The envelope's bytes could not be parsed back into `{headers, data}`.
    #[error("failed to deserialize message envelope: {0}")]
    Decode(#[source] serde_json::Error),
}

/// One of the three states an incoming [`Message`] can be in with respect to
/// acknowledgement. Monotonically advances `None -> {Acked, Nacked}`; see
/// [`crate::ack`] for the legal transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AckStatus {
    /// Neither acked nor nacked yet.
    None = 0,
    /// Positively acknowledged.
    Acked = 1,
    /// Negatively acknowledged (rejected).
    Nacked = 2,
}

impl AckStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => AckStatus::Acked,
            2 => AckStatus::Nacked,
            _ => AckStatus::None,
        }
    }
}

/// Interior-mutable, atomically-readable holder of an [`AckStatus`].
///
/// Kept separate from `std::sync::Mutex` because the only mutations are
/// single-step monotonic transitions guarded by [`crate::ack`], which needs
/// to read-then-conditionally-write without blocking readers elsewhere.
#[derive(Debug)]
pub(crate) struct AckCell(AtomicU8);

impl AckCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(AckStatus::None as u8))
    }

    pub(crate) fn get(&self) -> AckStatus {
        AckStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, status: AckStatus) {
        self.0.store(status as u8, Ordering::Release);
    }
}

/// Represents a delivered message: its broker-assigned [`MessageId`], its raw
/// envelope bytes, and its current [`AckStatus`].
///
/// Two messages are equal iff their deserialized `data` values are equal;
/// `msg_id` is explicitly excluded, since redelivery yields a new id for
/// otherwise-identical content.
#[derive(Debug)]
pub struct Message {
    msg_id: MessageId,
    payload: Vec<u8>,
    ack_status: AckCell,
}

impl Message {
    /// Constructs a new, unacknowledged [`Message`] from a broker-assigned id
    /// and the raw envelope bytes.
    pub fn new(msg_id: impl Into<MessageId>, payload: Vec<u8>) -> Self {
        Self {
            msg_id: msg_id.into(),
            payload,
            ack_status: AckCell::new(),
        }
    }

    /// Exposes this message's broker-assigned identifier.
    pub fn msg_id(&self) -> &MessageId {
        &self.msg_id
    }

    /// Exposes the raw envelope bytes of this message.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Reports the current acknowledgement status of this message.
    pub fn ack_status(&self) -> AckStatus {
        self.ack_status.get()
    }

    pub(crate) fn ack_cell(&self) -> &AckCell {
        &self.ack_status
    }

    /// Decodes and returns this message's `headers` map.
    pub fn headers(&self) -> Result<Headers, CodecError> {
        let body: EnvelopeBody = serde_json::from_slice(&self.payload).map_err(CodecError::Decode)?;
        Ok(body.headers)
    }

    /// Decodes and returns this message's user `data` value.
    pub fn deserialize_data(&self) -> Result<Value, CodecError> {
        let body: EnvelopeBody = serde_json::from_slice(&self.payload).map_err(CodecError::Decode)?;
        Ok(body.data)
    }

    /// Serializes `data` (and optional `headers`) into the envelope's wire
    /// bytes: a two-key map of `{headers, data}`. Round-tripping through
    /// [`Message::deserialize_data`] yields the original `data` back,
    /// byte-for-byte equivalent once re-encoded.
    pub fn serialize(data: Value, headers: Option<Headers>) -> Result<Vec<u8>, CodecError> {
        let body = EnvelopeBody {
            headers: headers.unwrap_or_default(),
            data,
        };

        serde_json::to_vec(&body).map_err(CodecError::Encode)
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        match (self.deserialize_data(), other.deserialize_data()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}
