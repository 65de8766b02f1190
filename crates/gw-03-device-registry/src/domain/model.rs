//! # Device Model
//!
//! ```text
//! Node (≤32) ──▶ Endpoint (≤8) ──▶ Cluster (≤16) ──▶ Attribute (≤32)
//! ```
//!
//! Every level is a bounded list. Adding an id that already exists
//! returns the existing entry.

use super::errors::RegistryError;
use super::value::{bounded, AttrValue};
use serde::{Deserialize, Serialize};
use shared_types::limits::{REG_MAX_ATTRIBUTES, REG_MAX_CLUSTERS, REG_MAX_ENDPOINTS};
use shared_types::{AttributeId, ClusterId, Endpoint as EndpointId, Eui64, NetAddr, Tick};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    /// Joined, not interviewed.
    New,
    Interviewing,
    Ready,
    /// Not responding.
    Stale,
    Left,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "NEW",
            Self::Interviewing => "INTERVIEWING",
            Self::Ready => "READY",
            Self::Stale => "STALE",
            Self::Left => "LEFT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerSource {
    #[default]
    Unknown,
    Mains,
    Battery,
    Dc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterDirection {
    #[default]
    Server,
    Client,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub value: AttrValue,
    pub last_updated: Tick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub direction: ClusterDirection,
    attributes: Vec<Attribute>,
}

impl Cluster {
    #[must_use]
    pub fn new(id: ClusterId, direction: ClusterDirection) -> Self {
        Self {
            id,
            direction,
            attributes: Vec::new(),
        }
    }

    pub fn attribute(&self, id: AttributeId) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.id == id)
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Inserts or replaces attribute `id`.
    ///
    /// # Errors
    ///
    /// `Full` when the attribute is new and the cluster holds 32 already.
    pub fn update_attribute(
        &mut self,
        id: AttributeId,
        value: AttrValue,
        now: Tick,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.attributes.iter_mut().find(|a| a.id == id) {
            existing.value = value;
            existing.last_updated = now;
            return Ok(());
        }
        if self.attributes.len() >= REG_MAX_ATTRIBUTES {
            return Err(RegistryError::Full {
                table: "attribute",
                capacity: REG_MAX_ATTRIBUTES,
            });
        }
        self.attributes.push(Attribute {
            id,
            value,
            last_updated: now,
        });
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: EndpointId,
    pub profile_id: u16,
    pub device_id: u16,
    clusters: Vec<Cluster>,
}

impl Endpoint {
    #[must_use]
    pub fn new(id: EndpointId, profile_id: u16, device_id: u16) -> Self {
        Self {
            id,
            profile_id,
            device_id,
            clusters: Vec::new(),
        }
    }

    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id == id)
    }

    pub fn cluster_mut(&mut self, id: ClusterId) -> Option<&mut Cluster> {
        self.clusters.iter_mut().find(|c| c.id == id)
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Returns cluster `id`, adding it if absent.
    ///
    /// # Errors
    ///
    /// `Full` when the endpoint holds 16 clusters already.
    pub fn add_cluster(
        &mut self,
        id: ClusterId,
        direction: ClusterDirection,
    ) -> Result<&mut Cluster, RegistryError> {
        let index = match self.clusters.iter().position(|c| c.id == id) {
            Some(index) => index,
            None => {
                if self.clusters.len() >= REG_MAX_CLUSTERS {
                    return Err(RegistryError::Full {
                        table: "cluster",
                        capacity: REG_MAX_CLUSTERS,
                    });
                }
                self.clusters.push(Cluster::new(id, direction));
                self.clusters.len() - 1
            }
        };
        Ok(&mut self.clusters[index])
    }
}

/// A registered device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub identity: Eui64,
    pub net_addr: NetAddr,
    pub state: NodeState,
    manufacturer: String,
    model: String,
    friendly_name: String,
    pub sw_build: u32,
    pub lqi: u8,
    pub rssi: i8,
    pub power_source: PowerSource,
    endpoints: Vec<Endpoint>,
    pub join_time: Tick,
    pub last_seen: Tick,
    pub interview_stage: u8,
}

impl Node {
    #[must_use]
    pub fn new(identity: Eui64, net_addr: NetAddr, now: Tick) -> Self {
        Self {
            identity,
            net_addr,
            state: NodeState::New,
            manufacturer: String::new(),
            model: String::new(),
            friendly_name: String::new(),
            sw_build: 0,
            lqi: 0,
            rssi: 0,
            power_source: PowerSource::Unknown,
            endpoints: Vec::new(),
            join_time: now,
            last_seen: now,
            interview_stage: 0,
        }
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    /// Strings longer than 32 bytes are truncated.
    pub fn set_manufacturer(&mut self, manufacturer: &str) {
        self.manufacturer = bounded(manufacturer);
    }

    pub fn set_model(&mut self, model: &str) {
        self.model = bounded(model);
    }

    pub fn set_friendly_name(&mut self, name: &str) {
        self.friendly_name = bounded(name);
    }

    pub fn endpoint(&self, id: EndpointId) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.id == id)
    }

    pub fn endpoint_mut(&mut self, id: EndpointId) -> Option<&mut Endpoint> {
        self.endpoints.iter_mut().find(|e| e.id == id)
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Returns endpoint `id`, adding it if absent.
    ///
    /// # Errors
    ///
    /// `Full` when the node holds 8 endpoints already.
    pub fn add_endpoint(
        &mut self,
        id: EndpointId,
        profile_id: u16,
        device_id: u16,
    ) -> Result<&mut Endpoint, RegistryError> {
        let index = match self.endpoints.iter().position(|e| e.id == id) {
            Some(index) => index,
            None => {
                if self.endpoints.len() >= REG_MAX_ENDPOINTS {
                    return Err(RegistryError::Full {
                        table: "endpoint",
                        capacity: REG_MAX_ENDPOINTS,
                    });
                }
                self.endpoints.push(Endpoint::new(id, profile_id, device_id));
                self.endpoints.len() - 1
            }
        };
        Ok(&mut self.endpoints[index])
    }

    /// Latest value of an attribute anywhere on the node.
    pub fn attribute(
        &self,
        endpoint: EndpointId,
        cluster: ClusterId,
        attribute: AttributeId,
    ) -> Option<&Attribute> {
        self.endpoint(endpoint)?
            .cluster(cluster)?
            .attribute(attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::clusters;

    fn node() -> Node {
        Node::new(Eui64(0x0011_2233_4455_6677), NetAddr(0x1234), 5)
    }

    #[test]
    fn test_add_endpoint_is_idempotent() {
        let mut node = node();
        node.add_endpoint(1, 0x0104, 0x0100).unwrap();
        node.add_endpoint(1, 0xFFFF, 0xFFFF).unwrap();
        assert_eq!(node.endpoints().len(), 1);
        assert_eq!(node.endpoint(1).unwrap().profile_id, 0x0104);
    }

    #[test]
    fn test_endpoint_bound() {
        let mut node = node();
        for id in 1..=REG_MAX_ENDPOINTS as u8 {
            node.add_endpoint(id, 0x0104, 0).unwrap();
        }
        let err = node.add_endpoint(200, 0x0104, 0).unwrap_err();
        assert_eq!(
            err,
            RegistryError::Full {
                table: "endpoint",
                capacity: REG_MAX_ENDPOINTS
            }
        );
    }

    #[test]
    fn test_cluster_and_attribute_bounds() {
        let mut endpoint = Endpoint::new(1, 0x0104, 0);
        for id in 0..REG_MAX_CLUSTERS as u16 {
            endpoint.add_cluster(id, ClusterDirection::Server).unwrap();
        }
        assert!(endpoint.add_cluster(0x9999, ClusterDirection::Client).is_err());
        assert!(endpoint.add_cluster(3, ClusterDirection::Client).is_ok());

        let cluster = endpoint.cluster_mut(0).unwrap();
        for id in 0..REG_MAX_ATTRIBUTES as u16 {
            cluster.update_attribute(id, AttrValue::U8(0), 1).unwrap();
        }
        assert!(cluster.update_attribute(999, AttrValue::U8(0), 1).is_err());
        // Updating an existing attribute never needs a slot.
        cluster.update_attribute(0, AttrValue::U8(9), 2).unwrap();
        assert_eq!(cluster.attribute(0).unwrap().value, AttrValue::U8(9));
        assert_eq!(cluster.attribute(0).unwrap().last_updated, 2);
    }

    #[test]
    fn test_attribute_lookup_through_node() {
        let mut node = node();
        node.add_endpoint(1, 0x0104, 0)
            .unwrap()
            .add_cluster(clusters::ON_OFF, ClusterDirection::Server)
            .unwrap()
            .update_attribute(0, AttrValue::Bool(true), 9)
            .unwrap();
        assert_eq!(
            node.attribute(1, clusters::ON_OFF, 0).unwrap().value,
            AttrValue::Bool(true)
        );
        assert!(node.attribute(2, clusters::ON_OFF, 0).is_none());
    }

    #[test]
    fn test_metadata_truncated() {
        let mut node = node();
        node.set_manufacturer(&"M".repeat(40));
        node.set_friendly_name("Kitchen lamp");
        assert_eq!(node.manufacturer().len(), 32);
        assert_eq!(node.friendly_name(), "Kitchen lamp");
        assert_eq!(node.state.to_string(), "NEW");
    }
}
