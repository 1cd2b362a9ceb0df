//! Graph-local node identifiers

use std::fmt;

/// Identifies a node inside a single material graph.
///
/// Ids are indices into the owning graph's node list. They are only
/// meaningful for the graph that issued them; there is no global counter,
/// so independent conversions never observe each other's ids.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a NodeId from a raw index
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Get the raw index
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// The id as a `usize` index into the node list
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
