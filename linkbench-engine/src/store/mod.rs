//! Store abstractions the request engine drives, and an in-memory implementation.

pub mod common;
pub mod in_memory;

pub use common::{LinkRange, LinkStore, NodeStore, Stores};
pub use in_memory::{InMemoryStore, StoreCall};
