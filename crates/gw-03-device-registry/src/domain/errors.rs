use gw_04_persistence::PersistError;
use shared_types::{Endpoint as EndpointId, ErrorKind, Eui64};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A bounded table (nodes, endpoints, clusters, attributes) is full.
    #[error("{table} table full ({capacity} entries)")]
    Full { table: &'static str, capacity: usize },

    #[error("node {0} not registered")]
    NodeNotFound(Eui64),

    #[error("endpoint {endpoint} not registered on {identity}")]
    EndpointNotFound { identity: Eui64, endpoint: EndpointId },

    #[error("persistence: {0}")]
    Persist(#[from] PersistError),

    #[error("node record codec: {0}")]
    Codec(String),
}

impl RegistryError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Full { .. } => ErrorKind::ResourceExhausted,
            Self::NodeNotFound(_) | Self::EndpointNotFound { .. } => ErrorKind::NotFound,
            Self::Persist(err) => err.kind(),
            Self::Codec(_) => ErrorKind::InvalidArgument,
        }
    }
}

impl From<bincode::Error> for RegistryError {
    fn from(err: bincode::Error) -> Self {
        Self::Codec(err.to_string())
    }
}
