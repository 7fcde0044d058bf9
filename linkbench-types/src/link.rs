//! Links are the directed, typed and timestamped edges of the benchmarked graph.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// The link type used for all links generated by the request engine.
pub const LINK_TYPE: i64 = 123_456_789;

/// The type tag of the source node of generated links, also used for generated nodes.
pub const ID1_TYPE: i32 = 2048;

/// The type tag of the target node of generated links.
pub const ID2_TYPE: i32 = 2048;

/// Whether a link is returned by reads.
///
/// Deleting a link may only hide it, in which case it is retained by the store but no longer
/// counted or listed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// The link is visible to all reads.
    #[default]
    Visible,
    /// The link has been hidden by a soft delete.
    Hidden,
}

/// A directed edge from `id1` to `id2` with an opaque payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Link {
    /// Source node of the link.
    pub id1: i64,
    /// Target node of the link.
    pub id2: i64,
    /// The link type. Links are grouped by `(id1, link_type)` for listing and counting.
    pub link_type: i64,
    /// Type tag of the source node.
    pub id1_type: i32,
    /// Type tag of the target node.
    pub id2_type: i32,
    /// Whether the link is visible to reads.
    pub visibility: Visibility,
    /// Opaque payload.
    pub data: Bytes,
    /// Version counter maintained by the writer.
    pub version: i32,
    /// Timestamp of the link in milliseconds since the Unix epoch.
    ///
    /// Link lists are ordered by this timestamp, newest first.
    pub time: i64,
}

impl Link {
    /// Returns the continuation point for reading links of the same list older than this one.
    pub fn tail_cursor(&self) -> TailCursor {
        TailCursor {
            id1: self.id1,
            link_type: self.link_type,
            time: self.time,
        }
    }
}

/// Marks the oldest link returned by a link-list read that hit the store's range limit.
///
/// More links older than `time` may exist for `(id1, link_type)`; a continuation read picks up
/// from here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TailCursor {
    /// Source node of the truncated list.
    pub id1: i64,
    /// Link type of the truncated list.
    pub link_type: i64,
    /// Timestamp of the oldest returned link.
    pub time: i64,
}
