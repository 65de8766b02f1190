//! # Device Registry
//!
//! The gateway's view of the network: every joined node with its
//! endpoints, clusters and the latest reported attribute values.
//!
//! | Module | Role |
//! |--------|------|
//! | [`domain`] | bounded node graph and typed attribute values |
//! | [`service`] | bus synchronisation, persistence |
//!
//! The registry is keyed by [`Eui64`](shared_types::Eui64). The network
//! address is stored for display and lookups only; it changes on rejoin.
//!
//! ```text
//!  EventBus ──ZIGBEE──▶ RegistrySync ──lock──▶ Registry ──persist──▶ KeyBlobStore
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod service;

pub use domain::{
    zcl_types, AttrValue, Attribute, Cluster, ClusterDirection, Endpoint, Node, NodeState,
    PowerSource, Registry, RegistryError,
};
pub use service::{node_key, RegistrySync, SharedRegistry, DEFAULT_PROFILE_ID, INDEX_KEY};
