//! Nodes are the vertices of the benchmarked graph.

use bytes::Bytes;

/// A graph vertex with an opaque payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    /// Identifier of the node, assigned by the store on creation.
    ///
    /// [`Node::UNASSIGNED`] until the store has assigned one.
    pub id: i64,
    /// Type tag of the node.
    pub node_type: i32,
    /// Version counter maintained by the writer.
    pub version: i64,
    /// Last update time in seconds.
    pub time: i32,
    /// Opaque payload.
    pub data: Bytes,
}

impl Node {
    /// Placeholder id of a node that has not been stored yet.
    pub const UNASSIGNED: i64 = -1;

    /// Creates a node that the store has not assigned an id to yet.
    pub fn unassigned(node_type: i32, data: Bytes) -> Self {
        Self {
            id: Self::UNASSIGNED,
            node_type,
            version: 1,
            time: 1,
            data,
        }
    }
}
