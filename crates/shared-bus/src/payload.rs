//! # Typed Payloads
//!
//! Fixed little-endian layouts for the events that cross the adapter
//! boundary. Each layout fits in the 32-byte envelope payload.
//!
//! | Event                        | Layout                                            |
//! |------------------------------|---------------------------------------------------|
//! | `DeviceJoined`/`Announced`   | identity u64, net_addr u16                        |
//! | `DeviceLeft`                 | identity u64                                      |
//! | `AttributeReport`            | identity u64, ep u8, cluster u16, attr u16, type u8, value[..18] |
//! | `CommandConfirmed`           | correlation u32, status u16                       |
//! | `CommandFailed`              | correlation u32, error u16                        |
//! | `PermitJoinChanged`          | seconds u8 (0 = closed)                           |
//! | `PersistFlushed`             | count u16                                         |

use crate::EVENT_PAYLOAD_SIZE;
use heapless::Vec as HeaplessVec;
use shared_types::limits::ATTR_VALUE_MAX;
use shared_types::{AttributeId, ClusterId, CorrelationId, Endpoint, Eui64, NetAddr};
use thiserror::Error;

/// Payload bytes did not match the expected layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("payload too short: expected {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
}

/// Encode/decode for a fixed payload layout.
pub trait PayloadCodec: Sized {
    /// Writes the payload into `out`, returning the number of bytes used.
    fn encode(&self, out: &mut [u8; EVENT_PAYLOAD_SIZE]) -> usize;

    fn decode(bytes: &[u8]) -> Result<Self, PayloadError>;
}

fn require(bytes: &[u8], expected: usize) -> Result<(), PayloadError> {
    if bytes.len() < expected {
        return Err(PayloadError::TooShort {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

fn u16_at(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn u64_at(bytes: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(raw)
}

/// `DeviceJoined` / `DeviceAnnounced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceAddress {
    pub identity: Eui64,
    pub net_addr: NetAddr,
}

impl PayloadCodec for DeviceAddress {
    fn encode(&self, out: &mut [u8; EVENT_PAYLOAD_SIZE]) -> usize {
        out[0..8].copy_from_slice(&self.identity.to_le_bytes());
        out[8..10].copy_from_slice(&self.net_addr.0.to_le_bytes());
        10
    }

    fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        require(bytes, 10)?;
        Ok(Self {
            identity: Eui64(u64_at(bytes, 0)),
            net_addr: NetAddr(u16_at(bytes, 8)),
        })
    }
}

/// `DeviceLeft`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLeft {
    pub identity: Eui64,
}

impl PayloadCodec for DeviceLeft {
    fn encode(&self, out: &mut [u8; EVENT_PAYLOAD_SIZE]) -> usize {
        out[0..8].copy_from_slice(&self.identity.to_le_bytes());
        8
    }

    fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        require(bytes, 8)?;
        Ok(Self {
            identity: Eui64(u64_at(bytes, 0)),
        })
    }
}

/// `AttributeReport`. The value length is implied by the payload length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeReport {
    pub identity: Eui64,
    pub endpoint: Endpoint,
    pub cluster: ClusterId,
    pub attribute: AttributeId,
    /// ZCL data type of `value`.
    pub data_type: u8,
    pub value: HeaplessVec<u8, ATTR_VALUE_MAX>,
}

impl AttributeReport {
    const HEADER_LEN: usize = 14;

    /// Builds a report; values longer than 18 bytes are truncated.
    #[must_use]
    pub fn new(
        identity: Eui64,
        endpoint: Endpoint,
        cluster: ClusterId,
        attribute: AttributeId,
        data_type: u8,
        value: &[u8],
    ) -> Self {
        let len = value.len().min(ATTR_VALUE_MAX);
        let mut stored = HeaplessVec::new();
        // Cannot fail: len <= capacity.
        let _ = stored.extend_from_slice(&value[..len]);
        Self {
            identity,
            endpoint,
            cluster,
            attribute,
            data_type,
            value: stored,
        }
    }
}

impl PayloadCodec for AttributeReport {
    fn encode(&self, out: &mut [u8; EVENT_PAYLOAD_SIZE]) -> usize {
        out[0..8].copy_from_slice(&self.identity.to_le_bytes());
        out[8] = self.endpoint;
        out[9..11].copy_from_slice(&self.cluster.to_le_bytes());
        out[11..13].copy_from_slice(&self.attribute.to_le_bytes());
        out[13] = self.data_type;
        let len = self.value.len();
        out[Self::HEADER_LEN..Self::HEADER_LEN + len].copy_from_slice(&self.value);
        Self::HEADER_LEN + len
    }

    fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        require(bytes, Self::HEADER_LEN)?;
        Ok(Self::new(
            Eui64(u64_at(bytes, 0)),
            bytes[8],
            u16_at(bytes, 9),
            u16_at(bytes, 11),
            bytes[13],
            &bytes[Self::HEADER_LEN..],
        ))
    }
}

/// `CommandConfirmed`. `status` has the radio status width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandConfirmed {
    pub correlation_id: CorrelationId,
    pub status: u16,
}

impl PayloadCodec for CommandConfirmed {
    fn encode(&self, out: &mut [u8; EVENT_PAYLOAD_SIZE]) -> usize {
        out[0..4].copy_from_slice(&self.correlation_id.0.to_le_bytes());
        out[4..6].copy_from_slice(&self.status.to_le_bytes());
        6
    }

    fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        require(bytes, 6)?;
        Ok(Self {
            correlation_id: CorrelationId(u32_at(bytes, 0)),
            status: u16_at(bytes, 4),
        })
    }
}

/// `CommandFailed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFailed {
    pub correlation_id: CorrelationId,
    pub error_code: u16,
}

impl CommandFailed {
    /// Error code of a command expired by the timeout sweep.
    pub const TIMEOUT: u16 = 0xFFFF;

    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        self.error_code == Self::TIMEOUT
    }
}

impl PayloadCodec for CommandFailed {
    fn encode(&self, out: &mut [u8; EVENT_PAYLOAD_SIZE]) -> usize {
        out[0..4].copy_from_slice(&self.correlation_id.0.to_le_bytes());
        out[4..6].copy_from_slice(&self.error_code.to_le_bytes());
        6
    }

    fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        require(bytes, 6)?;
        Ok(Self {
            correlation_id: CorrelationId(u32_at(bytes, 0)),
            error_code: u16_at(bytes, 4),
        })
    }
}

/// `PermitJoinChanged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermitJoinChanged {
    pub seconds: u8,
}

impl PermitJoinChanged {
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.seconds > 0
    }
}

impl PayloadCodec for PermitJoinChanged {
    fn encode(&self, out: &mut [u8; EVENT_PAYLOAD_SIZE]) -> usize {
        out[0] = self.seconds;
        1
    }

    fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        require(bytes, 1)?;
        Ok(Self { seconds: bytes[0] })
    }
}

/// `PersistFlushed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistFlushed {
    pub count: u16,
}

impl PayloadCodec for PersistFlushed {
    fn encode(&self, out: &mut [u8; EVENT_PAYLOAD_SIZE]) -> usize {
        out[0..2].copy_from_slice(&self.count.to_le_bytes());
        2
    }

    fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        require(bytes, 2)?;
        Ok(Self {
            count: u16_at(bytes, 0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Envelope, EventType};

    #[test]
    fn test_device_address_layout() {
        let payload = DeviceAddress {
            identity: Eui64(0x0011_2233_4455_6677),
            net_addr: NetAddr(0x1234),
        };
        let envelope = Envelope::with_payload(EventType::DEVICE_JOINED, &payload);
        assert_eq!(
            envelope.payload(),
            &[0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11, 0x00, 0x34, 0x12]
        );
        assert_eq!(envelope.decode::<DeviceAddress>().unwrap(), payload);
    }

    #[test]
    fn test_attribute_report_fills_payload_exactly() {
        let value = [7u8; ATTR_VALUE_MAX];
        let report = AttributeReport::new(Eui64(1), 1, 0x0402, 0x0000, 0x29, &value);
        let envelope = Envelope::with_payload(EventType::ATTRIBUTE_REPORT, &report);
        assert_eq!(envelope.payload_len(), EVENT_PAYLOAD_SIZE);
        assert_eq!(envelope.decode::<AttributeReport>().unwrap(), report);
    }

    #[test]
    fn test_attribute_report_truncates_long_value() {
        let report = AttributeReport::new(Eui64(1), 1, 6, 0, 0x42, &[1u8; 30]);
        assert_eq!(report.value.len(), ATTR_VALUE_MAX);
    }

    #[test]
    fn test_short_value_length_recovered() {
        let report = AttributeReport::new(Eui64(5), 2, 6, 0, 0x10, &[1]);
        let envelope = Envelope::with_payload(EventType::ATTRIBUTE_REPORT, &report);
        let decoded = envelope.decode::<AttributeReport>().unwrap();
        assert_eq!(decoded.value.as_slice(), &[1]);
    }

    #[test]
    fn test_command_failed_timeout_code() {
        let failed = CommandFailed {
            correlation_id: CorrelationId(42),
            error_code: CommandFailed::TIMEOUT,
        };
        let envelope = Envelope::with_payload(EventType::COMMAND_FAILED, &failed);
        let decoded = envelope.decode::<CommandFailed>().unwrap();
        assert!(decoded.is_timeout());
        assert_eq!(decoded.correlation_id, CorrelationId(42));
    }

    #[test]
    fn test_decode_rejects_short_payload() {
        let envelope = Envelope::with_bytes(EventType::COMMAND_CONFIRMED, &[1, 2]);
        assert_eq!(
            envelope.decode::<CommandConfirmed>(),
            Err(PayloadError::TooShort {
                expected: 6,
                actual: 2
            })
        );
    }

    #[test]
    fn test_confirmed_status_keeps_radio_width() {
        let confirmed = CommandConfirmed {
            correlation_id: CorrelationId(9),
            status: 0x0102,
        };
        let envelope = Envelope::with_payload(EventType::COMMAND_CONFIRMED, &confirmed);
        assert_eq!(envelope.payload(), &[9, 0, 0, 0, 0x02, 0x01]);
        assert_eq!(envelope.decode::<CommandConfirmed>().unwrap(), confirmed);
    }
}
