//! # GW-01 Fibre Scheduler
//!
//! Cooperative round-robin executor for the gateway's services. Every
//! service (event dispatch, command expiry, persistence flush, the
//! northbound services) runs as a named fibre that suspends only at
//! `yield_now` and `sleep`.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): fibre records, the bounded fibre table
//!   and its round-robin selection, configuration, errors
//! - **Context** (`context`): the suspension points handed to fibre bodies
//! - **Backends** (`backend/`): saved continuations
//!   - `Polled`: the body is a future polled on the scheduler stack
//!   - `Threaded`: the body runs on its own parked native thread
//! - **Service** (`scheduler`): the `Scheduler` handle and the pass loop
//! - **Tick** (`tick`): the wrapping tick counter and the timer thread
//!
//! ## Invariants
//!
//! - At most one fibre is Running at any instant.
//! - A Dead fibre is never rescheduled; its slot is retained.
//! - The idle fibre (slot 0) runs only when no other fibre is Ready.
//! - Sleep deadlines are compared with wraparound-safe tick arithmetic.
//!
//! ## Usage Example
//!
//! ```ignore
//! use gw_01_fibre_scheduler::{Scheduler, SchedulerConfig};
//!
//! let scheduler = Scheduler::new(SchedulerConfig::default())?;
//! scheduler.create("heartbeat", 0, |ctx| async move {
//!     loop {
//!         tracing::info!("alive");
//!         ctx.sleep(std::time::Duration::from_secs(1)).await;
//!     }
//! })?;
//! let _ticker = TickSource::spawn(scheduler.clone(), Duration::from_millis(1))?;
//! scheduler.start()?;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod backend;
pub mod context;
pub mod domain;
pub mod scheduler;
pub mod tick;

pub use context::{FibreContext, Suspend};
pub use domain::{
    FibreBackend, FibreError, FibreId, FibreInfo, FibreName, FibreState, SchedulerConfig,
    SchedulerStats,
};
pub use scheduler::{Scheduler, IDLE_FIBRE_NAME};
pub use tick::TickSource;
