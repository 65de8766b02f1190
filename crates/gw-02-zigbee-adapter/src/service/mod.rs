//! # Adapter Service
//!
//! The public face of the adapter. A [`ZigbeeAdapter`] owns the process-wide
//! adapter state and the exclusive lock around the radio stack.
//!
//! ```text
//!   fibres ──send_*()──▶ [state check] ─▶ [cache] ─▶ [pending] ─▶ radio lock ─▶ RadioStack::send
//!                                                                     │
//!   radio thread ──poll()──▶ RadioCallbacks (AdapterCore) ──publish──▶ EventBus
//! ```
//!
//! Lock order is always radio, then cache or pending. Callbacks run inside
//! `poll` with the radio lock held and only take the table locks.

mod adapter;
mod callbacks;
mod commands;
mod maintenance;
mod worker;

pub use adapter::{AdapterStats, ZigbeeAdapter, ADAPTER_SOURCE_ID};
