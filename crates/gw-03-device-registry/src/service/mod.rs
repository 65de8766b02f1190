//! Service layer: bus synchronisation and persistence of the registry.

mod persist;
mod sync;

pub use persist::{node_key, INDEX_KEY, NODE_KEY_PREFIX};
pub use sync::{RegistrySync, SharedRegistry, DEFAULT_PROFILE_ID};
