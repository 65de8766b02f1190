//! # Event Envelope
//!
//! Fixed-layout, `Copy` message record. The bus never interprets the
//! payload; producer and consumer agree on it by event type (see
//! [`crate::payload`]).

use crate::events::EventType;
use crate::payload::{PayloadCodec, PayloadError};
use crate::EVENT_PAYLOAD_SIZE;
use shared_types::{CorrelationId, Tick};

/// Source id used when the producer does not identify itself.
pub const SOURCE_UNKNOWN: u8 = 0;

/// An immutable event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    pub kind: EventType,
    /// Publish tick. Zero is replaced by the bus clock on publish.
    pub timestamp: Tick,
    pub correlation_id: CorrelationId,
    pub source: u8,
    payload_len: u8,
    payload: [u8; EVENT_PAYLOAD_SIZE],
}

impl Envelope {
    /// An envelope with no payload.
    #[must_use]
    pub const fn new(kind: EventType) -> Self {
        Self {
            kind,
            timestamp: 0,
            correlation_id: CorrelationId::NONE,
            source: SOURCE_UNKNOWN,
            payload_len: 0,
            payload: [0; EVENT_PAYLOAD_SIZE],
        }
    }

    /// Builds an envelope from raw bytes. Bytes beyond the payload maximum
    /// are discarded.
    #[must_use]
    pub fn with_bytes(kind: EventType, bytes: &[u8]) -> Self {
        let mut envelope = Self::new(kind);
        let len = bytes.len().min(EVENT_PAYLOAD_SIZE);
        envelope.payload[..len].copy_from_slice(&bytes[..len]);
        envelope.payload_len = len as u8;
        envelope
    }

    /// Builds an envelope from a typed payload.
    #[must_use]
    pub fn with_payload<P: PayloadCodec>(kind: EventType, payload: &P) -> Self {
        let mut envelope = Self::new(kind);
        let len = payload.encode(&mut envelope.payload);
        envelope.payload_len = len.min(EVENT_PAYLOAD_SIZE) as u8;
        envelope
    }

    #[must_use]
    pub const fn correlated(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    #[must_use]
    pub const fn from_source(mut self, source: u8) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub const fn at(mut self, timestamp: Tick) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The valid payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.payload_len as usize]
    }

    #[must_use]
    pub const fn payload_len(&self) -> usize {
        self.payload_len as usize
    }

    /// Decodes the payload as `P`.
    pub fn decode<P: PayloadCodec>(&self) -> Result<P, PayloadError> {
        P::decode(self.payload())
    }
}
