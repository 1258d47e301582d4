/*!
 * Core Types
 * Common types used across the toolkit
 */

use serde::Serialize;
use std::fmt;
use std::panic::Location;

/// Address of a tracked heap block
pub type Address = usize;

/// Size type for memory operations
pub type Size = usize;

/// Element count for array allocations
pub type Count = usize;

/// Identifier of a graph node, unique per graph and monotonically increasing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Source location of an allocating call, captured via `#[track_caller]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallSite {
    pub file: &'static str,
    pub line: u32,
}

impl CallSite {
    /// Capture the caller's location. Propagates through `#[track_caller]`
    /// chains, so wrappers report the original allocation site.
    #[track_caller]
    pub fn caller() -> Self {
        let loc = Location::caller();
        Self {
            file: loc.file(),
            line: loc.line(),
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}
