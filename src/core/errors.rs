/*!
 * Error Types
 * Contract violations and consistency anomalies surfaced as error kinds
 */

use super::types::{Address, Count, NodeId, Size};
use thiserror::Error;

/// Result type for heap and arena operations
pub type MemResult<T> = Result<T, MemError>;

/// Errors from the tracked heap and the arena allocator.
///
/// Every variant is a caller bug, not an environmental failure. They are
/// returned rather than aborting so a host can decide to crash loudly; the
/// crate logs each at the point of detection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemError {
    #[error("zero-sized allocation: {count} elements of {elt_size} bytes")]
    ZeroSized { elt_size: Size, count: Count },

    #[error("address {address:#x} is already registered ({type_name} x{count})")]
    DoubleRegister {
        address: Address,
        type_name: &'static str,
        count: Count,
    },

    #[error("address {address:#x} is not registered (double free or foreign pointer)")]
    NotRegistered { address: Address },

    #[error("slot {index} is not live in arena '{arena}'")]
    InvalidSlot { index: u32, arena: &'static str },

    #[error("allocation of {bytes} bytes failed")]
    AllocationFailed { bytes: Size },
}

/// Errors from the object graph.
///
/// Decrementing a reference that was never incremented is a consistency
/// anomaly: it is logged and reported, never silently repaired by
/// synthesizing an edge.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("no edge from {parent} to {child}")]
    EdgeMissing { parent: NodeId, child: NodeId },

    #[error("edge from {parent} to {child} already has zero references")]
    EdgeUnderflow { parent: NodeId, child: NodeId },

    #[error("node {id} is not in the graph")]
    UnknownNode { id: NodeId },
}
