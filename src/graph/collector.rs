/*!
 * Collector
 * Mark-and-sweep over the memory graph
 */

use super::types::SweepStats;
use super::MemGraph;
use crate::core::types::NodeId;
use crate::table::RhSet;
use log::info;
use std::time::Instant;

impl<R> MemGraph<R> {
    /// One mark-and-sweep pass.
    ///
    /// Mark: starting from every root, walk child edges whose ref count is
    /// positive, visiting each node at most once (the marked set terminates
    /// cycles). Sweep: every node absent from the marked set is deleted in
    /// insertion order — its deleter runs, and its edges and slot are
    /// reclaimed per the graph's config.
    pub fn collect(&mut self) -> SweepStats {
        let start = Instant::now();

        let mut marked: RhSet<NodeId> = RhSet::with_capacity(self.index.len() * 2 + 1);
        let mut worklist: Vec<NodeId> = self
            .roots
            .iter()
            .copied()
            .filter(|id| self.index.contains_key(id))
            .collect();
        while let Some(id) = worklist.pop() {
            if !marked.insert(id) {
                continue;
            }
            let rec = match self.index.get(&id).and_then(|&slot| self.nodes.get(slot)) {
                Some(rec) => rec,
                None => continue,
            };
            for (&child, &eid) in rec.children.iter() {
                let referenced = self.edges.get(eid).map_or(false, |e| e.ref_count > 0);
                if referenced && !marked.contains(&child) {
                    worklist.push(child);
                }
            }
        }

        let dead: Vec<NodeId> = self
            .index
            .keys()
            .copied()
            .filter(|id| !marked.contains(id))
            .collect();
        let swept = dead.len();
        let (delete_edges, delete_nodes) =
            (self.config.eager_delete_edges, self.config.eager_delete_nodes);
        for id in dead {
            self.destroy_node(id, delete_edges, delete_nodes);
        }

        let stats = SweepStats {
            marked: marked.len(),
            swept,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "sweep complete: {} marked, {} swept, {} nodes remain ({}ms)",
            stats.marked,
            stats.swept,
            self.index.len(),
            stats.duration_ms
        );
        stats
    }
}
