use super::errors::RegistryError;
use super::model::{Node, NodeState};
use shared_types::limits::REG_MAX_NODES;
use shared_types::{Clock, Eui64, NetAddr, Tick};
use std::sync::Arc;
use tracing::{debug, error, info};

/// The device registry: at most 32 nodes keyed by identity.
pub struct Registry {
    nodes: Vec<Node>,
    clock: Arc<dyn Clock>,
}

impl Registry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        info!(max_nodes = REG_MAX_NODES, "Device registry initialized");
        Self {
            nodes: Vec::with_capacity(REG_MAX_NODES),
            clock,
        }
    }

    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    /// Registers `identity`, or updates the network address of an existing
    /// node and marks it seen.
    ///
    /// # Errors
    ///
    /// `Full` when the identity is new and 32 nodes are registered.
    pub fn add_node(
        &mut self,
        identity: Eui64,
        net_addr: NetAddr,
    ) -> Result<&mut Node, RegistryError> {
        let now = self.now();
        if let Some(index) = self.index_of(identity) {
            let node = &mut self.nodes[index];
            debug!(identity = %identity, net_addr = %net_addr, "Node already registered, updating");
            node.net_addr = net_addr;
            node.last_seen = now;
            return Ok(node);
        }
        if self.nodes.len() >= REG_MAX_NODES {
            error!(identity = %identity, "Registry full, cannot add node");
            return Err(RegistryError::Full {
                table: "node",
                capacity: REG_MAX_NODES,
            });
        }
        info!(identity = %identity, net_addr = %net_addr, "Added node");
        self.nodes.push(Node::new(identity, net_addr, now));
        let last = self.nodes.len() - 1;
        Ok(&mut self.nodes[last])
    }

    pub fn find_node(&self, identity: Eui64) -> Option<&Node> {
        self.nodes.iter().find(|n| n.identity == identity)
    }

    pub fn find_node_mut(&mut self, identity: Eui64) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.identity == identity)
    }

    pub fn find_node_by_net_addr(&self, net_addr: NetAddr) -> Option<&Node> {
        self.nodes.iter().find(|n| n.net_addr == net_addr)
    }

    /// # Errors
    ///
    /// `NodeNotFound` when `identity` is not registered.
    pub fn remove_node(&mut self, identity: Eui64) -> Result<Node, RegistryError> {
        let index = self
            .index_of(identity)
            .ok_or(RegistryError::NodeNotFound(identity))?;
        info!(identity = %identity, "Removing node");
        Ok(self.nodes.remove(index))
    }

    /// Sets the node state and returns the previous one.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` when `identity` is not registered.
    pub fn set_state(
        &mut self,
        identity: Eui64,
        state: NodeState,
    ) -> Result<NodeState, RegistryError> {
        let node = self
            .find_node_mut(identity)
            .ok_or(RegistryError::NodeNotFound(identity))?;
        let previous = node.state;
        if previous != state {
            node.state = state;
            info!(identity = %identity, from = %previous, to = %state, "Node state changed");
        }
        Ok(previous)
    }

    /// Marks the node seen now. Returns `false` for an unknown identity.
    pub fn touch(&mut self, identity: Eui64) -> bool {
        let now = self.now();
        match self.find_node_mut(identity) {
            Some(node) => {
                node.last_seen = now;
                true
            }
            None => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in registration order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Inserts a node loaded from storage, replacing any node with the same
    /// identity.
    pub(crate) fn insert_restored(&mut self, node: Node) -> Result<(), RegistryError> {
        if let Some(index) = self.index_of(node.identity) {
            self.nodes[index] = node;
            return Ok(());
        }
        if self.nodes.len() >= REG_MAX_NODES {
            return Err(RegistryError::Full {
                table: "node",
                capacity: REG_MAX_NODES,
            });
        }
        self.nodes.push(node);
        Ok(())
    }

    fn index_of(&self, identity: Eui64) -> Option<usize> {
        self.nodes.iter().position(|n| n.identity == identity)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("nodes", &self.nodes.len())
            .finish_non_exhaustive()
    }
}
