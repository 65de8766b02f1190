//! # Shared Bus - Event Bus for Inter-Task Communication
//!
//! The only legal channel out of hardware-callback context. Producers copy a
//! fixed-layout [`Envelope`] into a bounded ring buffer; consumers receive it
//! later, from ordinary fibre context, when the dispatch fibre drains the
//! queue.
//!
//! ## Architecture Rules
//!
//! - **Publish never blocks, allocates or dispatches.** It copies the
//!   envelope into a ring slot and advances the tail.
//! - **Dispatch is the only place handlers run.**
//! - **Drop newest on full.** A full queue rejects the incoming envelope and
//!   counts it; existing envelopes are never overwritten.
//!
//! ```text
//! ┌──────────────┐  publish()   ┌───────────────────────┐  dispatch(n)  ┌───────────┐
//! │ radio        │ ───────────▶ │ ring buffer (256)     │ ────────────▶ │ handler A │
//! │ callback     │              │ head ▶ [E][E][E] ◀tail │      │        └───────────┘
//! └──────────────┘              └───────────────────────┘      │        ┌───────────┐
//! ┌──────────────┐  emit()              ▲                       └──────▶ │ handler B │
//! │ any fibre    │ ─────────────────────┘                                └───────────┘
//! └──────────────┘
//! ```
//!
//! ## Filtering
//!
//! A subscription matches every envelope whose type lies in its inclusive
//! `[min, max]` range. One envelope may reach many handlers; handlers run in
//! subscription-table order.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod envelope;
pub mod events;
pub mod payload;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use envelope::Envelope;
pub use events::{EventFilter, EventType};
pub use payload::{
    AttributeReport, CommandConfirmed, CommandFailed, DeviceAddress, DeviceLeft, PayloadCodec,
    PayloadError, PermitJoinChanged, PersistFlushed,
};
pub use publisher::{BusStats, EventBus, EventPublisher};
pub use subscriber::{BusError, EventHandler};

/// Capacity of the ring buffer. Must be a power of two.
pub const EVENT_QUEUE_SIZE: usize = shared_types::limits::EVENT_QUEUE_SIZE;

/// Maximum number of concurrent subscriptions.
pub const MAX_SUBSCRIBERS: usize = shared_types::limits::MAX_SUBSCRIBERS;

/// Maximum envelope payload length.
pub const EVENT_PAYLOAD_SIZE: usize = shared_types::limits::EVENT_PAYLOAD_SIZE;
