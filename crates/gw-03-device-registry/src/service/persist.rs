//! # Registry Persistence
//!
//! | Key | Value |
//! |-----|-------|
//! | `reg/index` | bincode `Vec<Eui64>` of persisted nodes |
//! | `node/<EUI64>` | bincode node record |
//!
//! A record keeps identity, addressing, state, metadata and the endpoint /
//! cluster layout. Attribute values are live data and are not stored. A
//! record that does not fit a 512-byte value is skipped with a warning.

use crate::domain::{
    ClusterDirection, Endpoint, Node, NodeState, PowerSource, Registry, RegistryError,
};
use gw_04_persistence::{KeyBlobStore, PersistError};
use serde::{Deserialize, Serialize};
use shared_types::limits::PERSIST_VALUE_MAX;
use shared_types::{ClusterId, Endpoint as EndpointId, Eui64, NetAddr, Tick};
use tracing::{debug, info, warn};

pub const INDEX_KEY: &str = "reg/index";
pub const NODE_KEY_PREFIX: &str = "node/";

/// Storage key of a node.
pub fn node_key(identity: Eui64) -> String {
    format!("{NODE_KEY_PREFIX}{identity}")
}

#[derive(Debug, Serialize, Deserialize)]
struct EndpointRecord {
    id: EndpointId,
    profile_id: u16,
    device_id: u16,
    clusters: Vec<(ClusterId, ClusterDirection)>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    identity: Eui64,
    net_addr: NetAddr,
    state: NodeState,
    manufacturer: String,
    model: String,
    friendly_name: String,
    sw_build: u32,
    power_source: PowerSource,
    join_time: Tick,
    endpoints: Vec<EndpointRecord>,
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            identity: node.identity,
            net_addr: node.net_addr,
            state: node.state,
            manufacturer: node.manufacturer().to_string(),
            model: node.model().to_string(),
            friendly_name: node.friendly_name().to_string(),
            sw_build: node.sw_build,
            power_source: node.power_source,
            join_time: node.join_time,
            endpoints: node
                .endpoints()
                .iter()
                .map(|ep| EndpointRecord {
                    id: ep.id,
                    profile_id: ep.profile_id,
                    device_id: ep.device_id,
                    clusters: ep.clusters().iter().map(|c| (c.id, c.direction)).collect(),
                })
                .collect(),
        }
    }
}

impl NodeRecord {
    fn into_node(self, now: Tick) -> Result<Node, RegistryError> {
        let mut node = Node::new(self.identity, self.net_addr, self.join_time);
        node.state = self.state;
        node.set_manufacturer(&self.manufacturer);
        node.set_model(&self.model);
        node.set_friendly_name(&self.friendly_name);
        node.sw_build = self.sw_build;
        node.power_source = self.power_source;
        node.last_seen = now;
        for record in self.endpoints {
            let endpoint: &mut Endpoint =
                node.add_endpoint(record.id, record.profile_id, record.device_id)?;
            for (cluster, direction) in record.clusters {
                endpoint.add_cluster(cluster, direction)?;
            }
        }
        Ok(node)
    }
}

impl Registry {
    /// Writes every node and the index to `store`, deleting records of
    /// nodes no longer registered. Returns the number of nodes persisted.
    ///
    /// Writes are buffered; call `flush` on the store for durability.
    pub fn persist(&self, store: &dyn KeyBlobStore) -> Result<usize, RegistryError> {
        let previous = read_index(store)?;
        let mut persisted = Vec::with_capacity(self.node_count());
        for node in self.nodes() {
            let bytes = bincode::serialize(&NodeRecord::from(node))?;
            if bytes.len() > PERSIST_VALUE_MAX {
                warn!(
                    identity = %node.identity,
                    bytes = bytes.len(),
                    "Node record too large, skipped"
                );
                continue;
            }
            match store.put(&node_key(node.identity), &bytes) {
                Ok(()) => persisted.push(node.identity),
                Err(err) => warn!(identity = %node.identity, error = %err, "Node not persisted"),
            }
        }
        for stale in previous.iter().filter(|id| !persisted.contains(id)) {
            store.delete(&node_key(*stale))?;
        }
        store.put(INDEX_KEY, &bincode::serialize(&persisted)?)?;
        info!(nodes = persisted.len(), "Persisted registry");
        Ok(persisted.len())
    }

    /// Loads nodes persisted by [`persist`](Self::persist). Returns the
    /// number restored; a store without an index restores nothing.
    pub fn restore(&mut self, store: &dyn KeyBlobStore) -> Result<usize, RegistryError> {
        let index = read_index(store)?;
        if index.is_empty() {
            debug!("No persisted registry found");
            return Ok(0);
        }
        info!(nodes = index.len(), "Restoring registry");
        let now = self.now();
        let mut restored = 0;
        for identity in index {
            let bytes = match store.get(&node_key(identity)) {
                Ok(bytes) => bytes,
                Err(PersistError::NotFound(_)) => {
                    warn!(identity = %identity, "Indexed node record missing");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let record: NodeRecord = match bincode::deserialize(&bytes) {
                Ok(record) => record,
                Err(err) => {
                    warn!(identity = %identity, error = %err, "Corrupt node record skipped");
                    continue;
                }
            };
            self.insert_restored(record.into_node(now)?)?;
            restored += 1;
        }
        Ok(restored)
    }
}

fn read_index(store: &dyn KeyBlobStore) -> Result<Vec<Eui64>, RegistryError> {
    match store.get(INDEX_KEY) {
        Ok(bytes) => Ok(bincode::deserialize(&bytes)?),
        Err(PersistError::NotFound(_)) => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}
