//! # Zigbee Gateway Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── scenarios.rs   # end-to-end flows, crate by crate
//!     ├── properties.rs  # cross-crate property checks
//!     └── gateway.rs     # the wired runtime driven tick by tick
//! tests/benches/
//! └── gateway_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p gw-tests
//! cargo test -p gw-tests integration::gateway::
//! cargo bench -p gw-tests
//! ```

pub mod integration;
