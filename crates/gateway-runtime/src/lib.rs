//! # Zigbee Gateway Runtime
//!
//! Wires the gateway services onto one cooperative scheduler.
//!
//! ## Modular Structure
//!
//! - `config` - layered configuration (defaults, JSON file, environment)
//! - `container` - builds the services in dependency order
//! - `services` - the fibre bodies
//! - `runtime` - startup, run and shutdown
//!
//! ## Event Flow
//!
//! ```text
//! radio thread ──callbacks──▶ ZigbeeAdapter ──publish──▶ EventBus ring
//!                                                            │ dispatch fibre
//!                               ┌────────────────────────────┼──────────────┐
//!                               ▼                            ▼              ▼
//!                         RegistrySync                 NetworkWatch    northbound
//!                               │ registry fibre             │ zb-start
//!                               ▼                            ▼
//!                         BufferedStore ◀── persist     set_permit_join
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod container;
pub mod runtime;
pub mod services;

pub use config::{BusConfig, ConfigError, GatewayConfig, ServiceConfig};
pub use container::{GatewayContainer, GatewayStore};
pub use runtime::{GatewayRuntime, RuntimeError};
pub use services::NetworkWatch;
