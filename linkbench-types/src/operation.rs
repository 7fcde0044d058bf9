//! Operation kinds issued by the request engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of an operation issued against a store.
///
/// The first ten variants are selectable by the operation mix, in the fixed order of
/// [`OperationKind::SELECTABLE`]. [`OperationKind::RangeSize`] is only used to report the number
/// of links returned by link-list reads, and [`OperationKind::Unknown`] marks a draw that did not
/// match any operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Insert a link.
    AddLink,
    /// Hide a link.
    DeleteLink,
    /// Overwrite an existing link.
    UpdateLink,
    /// Count the visible links of a list.
    CountLink,
    /// Fetch a set of links by their endpoints.
    MultigetLink,
    /// Read a link list, newest first.
    GetLinksList,
    /// Insert a node.
    AddNode,
    /// Overwrite a node.
    UpdateNode,
    /// Delete a node.
    DeleteNode,
    /// Fetch a node.
    GetNode,
    /// Number of links returned by a link-list read.
    RangeSize,
    /// No operation was selected.
    Unknown,
}

impl OperationKind {
    /// All kinds that the operation mix can select, in threshold order.
    pub const SELECTABLE: [OperationKind; 10] = [
        OperationKind::AddLink,
        OperationKind::DeleteLink,
        OperationKind::UpdateLink,
        OperationKind::CountLink,
        OperationKind::MultigetLink,
        OperationKind::GetLinksList,
        OperationKind::AddNode,
        OperationKind::UpdateNode,
        OperationKind::DeleteNode,
        OperationKind::GetNode,
    ];

    /// The kinds reported in the final statistics summary of a requester.
    pub const REPORTED: [OperationKind; 10] = [
        OperationKind::MultigetLink,
        OperationKind::GetLinksList,
        OperationKind::CountLink,
        OperationKind::UpdateLink,
        OperationKind::AddLink,
        OperationKind::RangeSize,
        OperationKind::AddNode,
        OperationKind::UpdateNode,
        OperationKind::DeleteNode,
        OperationKind::GetNode,
    ];

    /// Returns the human-readable name used in logs and reports.
    pub fn display_name(self) -> &'static str {
        match self {
            OperationKind::AddLink => "ADD_LINK",
            OperationKind::DeleteLink => "DELETE_LINK",
            OperationKind::UpdateLink => "UPDATE_LINK",
            OperationKind::CountLink => "COUNT_LINK",
            OperationKind::MultigetLink => "MULTIGET_LINK",
            OperationKind::GetLinksList => "GET_LINKS_LIST",
            OperationKind::AddNode => "ADD_NODE",
            OperationKind::UpdateNode => "UPDATE_NODE",
            OperationKind::DeleteNode => "DELETE_NODE",
            OperationKind::GetNode => "GET_NODE",
            OperationKind::RangeSize => "RANGE_SIZE",
            OperationKind::Unknown => "UNKNOWN",
        }
    }

    /// Returns `true` for operations on nodes rather than links.
    pub fn is_node_operation(self) -> bool {
        matches!(
            self,
            OperationKind::AddNode
                | OperationKind::UpdateNode
                | OperationKind::DeleteNode
                | OperationKind::GetNode
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The benchmark phase a store is initialized for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Bulk loading of the initial graph.
    Load,
    /// The request phase driven by the request engine.
    Request,
}
