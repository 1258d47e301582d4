/*!
 * Core Module
 * Shared types and error taxonomy
 */

pub mod errors;
pub mod types;

pub use errors::{GraphError, MemError, MemResult};
pub use types::{Address, CallSite, Count, NodeId, Size};
