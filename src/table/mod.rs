/*!
 * Hash Table
 * Robin Hood open-addressing map and set used by every other component
 */

pub mod map;
pub mod set;

pub use map::{RhMap, DEFAULT_TABLE_SZ};
pub use set::RhSet;
