//! # Shared Types Crate
//!
//! This crate contains the values every gateway crate agrees on: the
//! monotonic tick, device identities, correlation ids, the clock port and
//! the error-kind taxonomy.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Wraparound-safe time**: Ticks are `u32` and are only ever compared
//!   through [`tick_reached`] / [`ticks_elapsed`].
//! - **Stable identity**: A device is keyed by its [`Eui64`]; its
//!   [`NetAddr`] is volatile and never used as a primary key.

pub mod clock;
pub mod entities;
pub mod errors;
pub mod limits;

pub use clock::{Clock, ManualClock};
pub use entities::*;
pub use errors::ErrorKind;
