//! Node table: netlist nodes plus the internal nodes devices create.

use indexmap::IndexMap;
use log::debug;

use crate::error::{Error, Result};
use crate::node::{Node, NodeId};

/// All nodes of a circuit, in creation order.
#[derive(Debug)]
pub struct NodeTable {
    nodes: IndexMap<NodeId, Node>,
    /// Next available node ID.
    next_node_id: u32,
}

impl Default for NodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTable {
    /// Create a table holding only the ground node.
    pub fn new() -> Self {
        let mut nodes = IndexMap::new();
        nodes.insert(NodeId::GROUND, Node::new(NodeId::GROUND));
        Self {
            nodes,
            next_node_id: 1,
        }
    }

    /// Get or create an external node by number.
    pub fn get_or_create(&mut self, id: u32) -> NodeId {
        let node_id = NodeId::new(id);
        if !self.nodes.contains_key(&node_id) {
            self.nodes.insert(node_id, Node::new(node_id));
            if id >= self.next_node_id {
                self.next_node_id = id + 1;
            }
        }
        node_id
    }

    /// Add an external named node.
    pub fn add_named(&mut self, name: impl Into<String>) -> Result<NodeId> {
        self.insert_named(name.into(), false)
    }

    /// Create the internal node `<instance>#<suffix>`.
    ///
    /// Fails if a node of that name already exists.
    pub fn make_internal(&mut self, instance: &str, suffix: &str) -> Result<NodeId> {
        let id = self.insert_named(format!("{instance}#{suffix}"), true)?;
        debug!("created internal node {id} ({instance}#{suffix})");
        Ok(id)
    }

    fn insert_named(&mut self, name: String, internal: bool) -> Result<NodeId> {
        if self.find(&name).is_some() {
            return Err(Error::DuplicateNode(name));
        }
        let id = NodeId::new(self.next_node_id);
        self.next_node_id += 1;
        self.nodes.insert(id, Node::with_name(id, name, internal));
        Ok(id)
    }

    /// Look a node up by name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|n| n.name() == Some(name))
            .map(Node::id)
    }

    /// Remove a node. The ground node cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        if id.is_ground() {
            return Err(Error::NodeNotFound(id.to_string()));
        }
        self.nodes
            .shift_remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Number of nodes, excluding ground.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Length of a solution vector able to hold every node index issued so far.
    pub fn vector_len(&self) -> usize {
        self.next_node_id as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }
}
