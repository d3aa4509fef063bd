//! Node identifiers.

use std::fmt;

/// Unique identifier for a node in the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The ground node (node 0).
    pub const GROUND: NodeId = NodeId(0);

    /// Create a new NodeId from a raw value.
    pub const fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// Get the raw node ID value.
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Position of this node in solution and RHS vectors.
    ///
    /// Ground occupies slot 0, which acts as a sink and is never solved for.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Check if this is the ground node.
    pub fn is_ground(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ground() {
            write!(f, "GND")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A node in the circuit graph.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    name: Option<String>,
    /// Created by a device for a parasitic resistance rather than by the netlist.
    internal: bool,
}

impl Node {
    /// Create a new unnamed external node.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            name: None,
            internal: false,
        }
    }

    /// Create a named node.
    pub fn with_name(id: NodeId, name: impl Into<String>, internal: bool) -> Self {
        Self {
            id,
            name: Some(name.into()),
            internal,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn is_ground(&self) -> bool {
        self.id.is_ground()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ground_node() {
        assert!(NodeId::GROUND.is_ground());
        assert_eq!(NodeId::GROUND.index(), 0);
        assert_eq!(NodeId::GROUND.to_string(), "GND");
    }

    #[test]
    fn test_node_id() {
        let id = NodeId::new(42);
        assert!(!id.is_ground());
        assert_eq!(id.index(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_internal_node() {
        let node = Node::with_name(NodeId::new(7), "Q1#collector", true);
        assert_eq!(node.name(), Some("Q1#collector"));
        assert!(node.is_internal());
    }
}
