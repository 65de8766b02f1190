//! Domain layer: the bounded device graph.

pub mod errors;
pub mod model;
pub mod registry;
pub mod value;

pub use errors::RegistryError;
pub use model::{Attribute, Cluster, ClusterDirection, Endpoint, Node, NodeState, PowerSource};
pub use registry::Registry;
pub use value::{zcl_types, AttrValue};
