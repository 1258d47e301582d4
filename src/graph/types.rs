/*!
 * Graph Types
 * Configuration and sweep statistics
 */

use serde::{Deserialize, Serialize};

/// Reclamation aggressiveness during sweep.
///
/// A node deleted by the collector always has its deleter invoked; whether
/// its edge records and its own slot are returned to the arenas right away
/// is configurable, which decouples "logically dead" from "memory
/// reclaimed". Graph teardown always reclaims eagerly regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Free edge records back to the edge arena when a node is deleted
    pub eager_delete_edges: bool,
    /// Free node slots back to the node arena when a node is deleted
    pub eager_delete_nodes: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            eager_delete_edges: true,
            eager_delete_nodes: true,
        }
    }
}

/// Result of one mark-and-sweep pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    /// Nodes reachable from the roots
    pub marked: usize,
    /// Unreachable nodes deleted this pass
    pub swept: usize,
    pub duration_ms: u64,
}
