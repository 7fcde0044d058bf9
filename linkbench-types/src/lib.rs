//! Shared data model for the linkbench workload generator.
//!
//! The benchmarked store holds a graph of *nodes* connected by directed, typed *links*. This
//! crate contains the values exchanged between the request engine and store implementations:
//!
//!  - [`Link`] and [`Node`] are the records written to and read from a store
//!  - [`OperationKind`] names every operation the engine can issue or report on
//!  - [`TailCursor`] is a continuation point for a truncated link-list read
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod link;
pub mod node;
pub mod operation;

pub use link::{ID1_TYPE, ID2_TYPE, LINK_TYPE, Link, TailCursor, Visibility};
pub use node::Node;
pub use operation::{OperationKind, Phase};
