//! Compile-time capacity bounds.
//!
//! Runtime configuration may lower the soft limits (fibre count, timeouts)
//! but never raise a bound that sizes a fixed table.

/// Maximum number of fibres, the idle fibre included.
pub const MAX_FIBRES: usize = 16;
/// Stack size used when a fibre is created with `stack_size == 0`.
pub const DEFAULT_STACK_SIZE: u32 = 2048;
/// Stack size of the reserved idle fibre.
pub const IDLE_STACK_SIZE: u32 = 512;
/// Fibre names are truncated to this many bytes.
pub const NAME_MAX_LEN: usize = 15;

/// Ring-buffer capacity of the event bus.
pub const EVENT_QUEUE_SIZE: usize = 256;
/// Maximum concurrent bus subscriptions.
pub const MAX_SUBSCRIBERS: usize = 32;
/// Maximum envelope payload length in bytes.
pub const EVENT_PAYLOAD_SIZE: usize = 32;

/// Address-cache capacity.
pub const MAX_DEVICES: usize = 64;
/// Pending-command table capacity.
pub const MAX_PENDING: usize = 16;
/// Default pending-command timeout.
pub const CMD_TIMEOUT_MS: u32 = 10_000;
/// Largest attribute list accepted by a read-attributes request.
pub const MAX_READ_ATTRIBUTES: usize = 8;
/// Largest permit-join window in seconds.
pub const MAX_PERMIT_JOIN_S: u8 = 254;
/// Largest attribute value carried by an attribute report.
pub const ATTR_VALUE_MAX: usize = 18;

/// Longest persistence key in bytes.
pub const PERSIST_KEY_MAX: usize = 32;
/// Largest persisted value in bytes.
pub const PERSIST_VALUE_MAX: usize = 512;
/// Buffered writes held before a forced flush.
pub const PERSIST_WRITE_BUFFER: usize = 16;
/// Default period of the persistence flush fibre.
pub const PERSIST_FLUSH_MS: u32 = 5_000;

/// Registry bounds: nodes, endpoints per node, clusters per endpoint,
/// attributes per cluster.
pub const REG_MAX_NODES: usize = 32;
pub const REG_MAX_ENDPOINTS: usize = 8;
pub const REG_MAX_CLUSTERS: usize = 16;
pub const REG_MAX_ATTRIBUTES: usize = 32;
/// Longest registry metadata string (manufacturer, model, friendly name).
pub const REG_NAME_MAX_LEN: usize = 32;
