/*!
 * Memory Graph
 * Directed graph of resource-owning nodes with reference-counted edges,
 * reclaimed by mark-and-sweep collection
 */

mod collector;
pub mod types;

pub use types::{GraphConfig, SweepStats};

use crate::alloc::arena::{Arena, SlotId};
use crate::core::errors::GraphError;
use crate::core::types::NodeId;
use crate::table::{RhMap, RhSet};
use log::error;
use std::mem;

// Node tables are sized like a process-wide object graph; per-node
// adjacency maps start small.
const NODE_TABLE_SZ: usize = 997;
const ADJACENCY_TABLE_SZ: usize = 17;

/// One reference-counted edge. Owned once by the edge arena and referenced
/// from both endpoints' adjacency maps, so the two directions cannot drift.
struct EdgeRec {
    ref_count: u32,
}

struct NodeRec<R> {
    resource: Option<R>,
    deleter: Box<dyn FnMut(R)>,
    /// child id -> shared edge
    children: RhMap<NodeId, SlotId>,
    /// parent id -> the same shared edge
    parents: RhMap<NodeId, SlotId>,
}

/// Graph of opaque resource-owning nodes.
///
/// Inserting a resource hands its lifecycle to the graph: the deleter is
/// invoked exactly once, either when the collector sweeps the node or when
/// the graph is torn down. Nodes and edges live in arenas; the all-nodes
/// and root indices are Robin Hood tables keyed by node id.
pub struct MemGraph<R> {
    config: GraphConfig,
    nodes: Arena<NodeRec<R>>,
    edges: Arena<EdgeRec>,
    /// all live nodes, in insertion order
    index: RhMap<NodeId, SlotId>,
    roots: RhSet<NodeId>,
    next_id: u32,
}

impl<R> MemGraph<R> {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            nodes: Arena::new("node"),
            edges: Arena::new("edge"),
            index: RhMap::with_capacity(NODE_TABLE_SZ),
            roots: RhSet::new(),
            next_id: 0,
        }
    }

    /// Insert a resource, transferring ownership of its lifecycle to the
    /// graph. The deleter runs on the resource when the node is deleted.
    pub fn insert<F>(&mut self, resource: R, deleter: F) -> NodeId
    where
        F: FnMut(R) + 'static,
    {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        let slot = self.nodes.alloc(NodeRec {
            resource: Some(resource),
            deleter: Box::new(deleter),
            children: RhMap::with_capacity(ADJACENCY_TABLE_SZ),
            parents: RhMap::with_capacity(ADJACENCY_TABLE_SZ),
        });
        self.index.insert(id, slot);
        id
    }

    /// Make `id` a collection entry point. Roots are held by reference; a
    /// root is still a regular member of the all-nodes index.
    pub fn root(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.node_slot(id)?;
        self.roots.insert(id);
        Ok(())
    }

    /// Add one reference from `parent` to `child`, creating the shared edge
    /// record on first use. Both adjacency maps reference the same record,
    /// so the symmetric bookkeeping holds by construction.
    pub fn inc(&mut self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        let pslot = self.node_slot(parent)?;
        let cslot = self.node_slot(child)?;
        let existing = self
            .nodes
            .get(pslot)
            .and_then(|n| n.children.get(&child).copied());
        match existing {
            Some(eid) => {
                if let Some(edge) = self.edges.get_mut(eid) {
                    edge.ref_count += 1;
                }
            }
            None => {
                let eid = self.edges.alloc(EdgeRec { ref_count: 1 });
                if let Some(p) = self.nodes.get_mut(pslot) {
                    p.children.insert(child, eid);
                }
                if let Some(c) = self.nodes.get_mut(cslot) {
                    c.parents.insert(parent, eid);
                }
            }
        }
        Ok(())
    }

    /// Drop one reference from `parent` to `child`.
    ///
    /// Decrementing an edge that does not exist, or one already at zero, is
    /// a consistency anomaly: logged and reported, never repaired by
    /// synthesizing an edge or going negative.
    pub fn dec(&mut self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        let pslot = self.node_slot(parent)?;
        self.node_slot(child)?;
        let eid = self
            .nodes
            .get(pslot)
            .and_then(|n| n.children.get(&child).copied());
        let eid = match eid {
            Some(eid) => eid,
            None => {
                error!("removing reference from {} to {} which did not exist", parent, child);
                return Err(GraphError::EdgeMissing { parent, child });
            }
        };
        match self.edges.get_mut(eid) {
            Some(edge) if edge.ref_count > 0 => {
                edge.ref_count -= 1;
                Ok(())
            }
            Some(_) => {
                error!("reference from {} to {} is already at zero", parent, child);
                Err(GraphError::EdgeUnderflow { parent, child })
            }
            None => {
                error!("removing reference from {} to {} which did not exist", parent, child);
                Err(GraphError::EdgeMissing { parent, child })
            }
        }
    }

    /// Current reference count from `parent` to `child`, if the edge exists.
    pub fn ref_count(&self, parent: NodeId, child: NodeId) -> Option<u32> {
        let pslot = self.index.get(&parent).copied()?;
        let eid = self.nodes.get(pslot)?.children.get(&child).copied()?;
        self.edges.get(eid).map(|e| e.ref_count)
    }

    /// Borrow the resource of a live node.
    pub fn resource(&self, id: NodeId) -> Option<&R> {
        let slot = self.index.get(&id).copied()?;
        self.nodes.get(slot)?.resource.as_ref()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.roots.contains(&id)
    }

    /// Live node count.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Usage counters of the node arena. The live count exceeding [`len`]
    /// means swept nodes are holding their slots (non-eager config).
    ///
    /// [`len`]: MemGraph::len
    pub fn node_stats(&self) -> crate::alloc::ArenaStats {
        self.nodes.stats()
    }

    /// Usage counters of the edge arena.
    pub fn edge_stats(&self) -> crate::alloc::ArenaStats {
        self.edges.stats()
    }

    /// Delete every remaining node, always eagerly regardless of config.
    /// Arena teardown itself happens on drop, one pass per arena.
    pub fn close(&mut self) {
        let ids: Vec<NodeId> = self.index.keys().copied().collect();
        for id in ids {
            self.destroy_node(id, true, true);
        }
    }

    fn node_slot(&self, id: NodeId) -> Result<SlotId, GraphError> {
        self.index
            .get(&id)
            .copied()
            .ok_or(GraphError::UnknownNode { id })
    }

    /// Delete a node: run its deleter, optionally free its edges and its
    /// slot. Mirror adjacency entries in live neighbors are removed when
    /// edges are freed, so each shared edge record is freed exactly once.
    fn destroy_node(&mut self, id: NodeId, delete_edges: bool, delete_node: bool) {
        let slot = match self.index.remove(&id) {
            Some((_, slot)) => slot,
            None => return,
        };
        self.roots.remove(&id);
        let (resource, children, parents) = match self.nodes.get_mut(slot) {
            Some(rec) => (
                rec.resource.take(),
                mem::take(&mut rec.children),
                mem::take(&mut rec.parents),
            ),
            None => return,
        };
        if let Some(resource) = resource {
            if let Some(rec) = self.nodes.get_mut(slot) {
                (rec.deleter)(resource);
            }
        }
        if delete_edges {
            for (&child, &eid) in children.iter() {
                if child != id {
                    if let Some(&cslot) = self.index.get(&child) {
                        if let Some(c) = self.nodes.get_mut(cslot) {
                            c.parents.remove(&id);
                        }
                    }
                }
                let _ = self.edges.dealloc(eid);
            }
            for (&parent, &eid) in parents.iter() {
                if parent == id {
                    // Self-edge: already freed through the children map.
                    continue;
                }
                if let Some(&pslot) = self.index.get(&parent) {
                    if let Some(p) = self.nodes.get_mut(pslot) {
                        p.children.remove(&id);
                    }
                }
                let _ = self.edges.dealloc(eid);
            }
        }
        if delete_node {
            let _ = self.nodes.dealloc(slot);
        }
    }
}

impl<R> Drop for MemGraph<R> {
    fn drop(&mut self) {
        self.close();
    }
}
