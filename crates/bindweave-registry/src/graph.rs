//! The instantiation arena and its memoization table.
//!
//! Nodes live in a `Vec` and refer to their bases by [`InstanceId`]. The
//! memo table maps the [`IdentityHash`] of each [`InstanceKey`] to the one
//! node created for it. Lookups compare the stored key, so a hash shared by
//! two distinct keys is never mistaken for a hit;
//! inserting an existing key is an internal error, never a silent reuse,
//! so callers must [`lookup`](InstantiationGraph::lookup) first.
//!
//! Mutation requires `&mut self`. Concurrent readers share `&self` only
//! after resolution has finished, which is the single-writer discipline
//! the memo table needs.
//!
//! A failed request is undone with [`checkpoint`](InstantiationGraph::checkpoint)
//! and [`rollback`](InstantiationGraph::rollback): nodes are only ever
//! appended, so truncating to the checkpoint removes exactly the nodes the
//! request created.

use std::ops::Index;

use bindweave_core::{GenerationError, IdentityHash, InstanceKey, TemplateArg};
use rustc_hash::FxHashMap;

use crate::{ConcreteInstantiation, InstanceId};

/// Arena length at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// All concrete instantiations of one generation run.
#[derive(Debug, Default, Clone)]
pub struct InstantiationGraph {
    nodes: Vec<ConcreteInstantiation>,
    memo: FxHashMap<IdentityHash, InstanceId>,
}

impl InstantiationGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the node created for `key`.
    pub fn lookup(&self, key: &InstanceKey) -> Option<InstanceId> {
        self.memo
            .get(&key.hash())
            .copied()
            .filter(|id| self.nodes[id.index()].key == *key)
    }

    /// Get a node by id.
    pub fn get(&self, id: InstanceId) -> Option<&ConcreteInstantiation> {
        self.nodes.get(id.index())
    }

    /// Create the node for `key`. Bases are attached later with
    /// [`set_bases`](Self::set_bases).
    pub fn insert(
        &mut self,
        key: InstanceKey,
        bindings: Vec<(String, TemplateArg)>,
    ) -> Result<InstanceId, GenerationError> {
        let hash = key.hash();
        if let Some(existing) = self.memo.get(&hash) {
            let existing = &self.nodes[existing.index()].key;
            if *existing == key {
                return Err(GenerationError::DuplicateInstantiation { instance: key });
            }
            return Err(GenerationError::IdentityCollision {
                instance: key,
                existing: existing.clone(),
            });
        }
        let id = InstanceId::from_index(self.nodes.len());
        tracing::trace!(instance = %key, %id, %hash, "instance created");
        self.memo.insert(hash, id);
        self.nodes.push(ConcreteInstantiation {
            id,
            hash,
            key,
            bindings,
            bases: Vec::new(),
        });
        Ok(id)
    }

    /// Attach resolved bases to a node.
    pub fn set_bases(&mut self, id: InstanceId, bases: Vec<InstanceId>) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.bases = bases;
        }
    }

    /// Record the current arena length.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.nodes.len())
    }

    /// Drop every node created since `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        if checkpoint.0 >= self.nodes.len() {
            return;
        }
        for node in self.nodes.drain(checkpoint.0..) {
            tracing::trace!(instance = %node.key, "instance rolled back");
            self.memo.remove(&node.hash);
        }
    }

    /// Nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &ConcreteInstantiation> {
        self.nodes.iter()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Index<InstanceId> for InstantiationGraph {
    type Output = ConcreteInstantiation;

    fn index(&self, id: InstanceId) -> &Self::Output {
        &self.nodes[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(class: &str, args: &[i64]) -> InstanceKey {
        InstanceKey::with_ints(class, args)
    }

    #[test]
    fn insert_and_lookup() {
        let mut graph = InstantiationGraph::new();
        let id = graph.insert(key("AbstractMesh", &[2, 2]), Vec::new()).unwrap();
        assert_eq!(graph.lookup(&key("AbstractMesh", &[2, 2])), Some(id));
        assert_eq!(graph.lookup(&key("AbstractMesh", &[3, 3])), None);
        assert_eq!(graph[id].key, key("AbstractMesh", &[2, 2]));
    }

    #[test]
    fn duplicate_insert_is_internal_error() {
        let mut graph = InstantiationGraph::new();
        graph.insert(key("Point", &[3]), Vec::new()).unwrap();
        let err = graph.insert(key("Point", &[3]), Vec::new()).unwrap_err();
        assert!(err.is_internal());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn rollback_removes_nodes_and_memo_entries() {
        let mut graph = InstantiationGraph::new();
        let kept = graph.insert(key("AbstractMesh", &[3, 3]), Vec::new()).unwrap();
        let checkpoint = graph.checkpoint();
        let potts = graph.insert(key("PottsMesh", &[3]), Vec::new()).unwrap();
        graph.set_bases(potts, vec![kept]);
        graph.rollback(checkpoint);

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.lookup(&key("PottsMesh", &[3])), None);
        assert_eq!(graph.lookup(&key("AbstractMesh", &[3, 3])), Some(kept));

        // The freed slot is reused by the next insert.
        let again = graph.insert(key("PottsMesh", &[3]), Vec::new()).unwrap();
        assert_eq!(again, potts);
    }

    #[test]
    fn memo_is_keyed_by_identity_hash() {
        let mut graph = InstantiationGraph::new();
        let id = graph.insert(key("AbstractMesh", &[2, 3]), Vec::new()).unwrap();
        assert_eq!(graph[id].hash, key("AbstractMesh", &[2, 3]).hash());
        assert_eq!(graph.lookup(&key("AbstractMesh", &[3, 2])), None);
        assert_eq!(graph.lookup(&key("AbstractMesh", &[2, 3])), Some(id));
    }

    #[test]
    fn set_bases_records_order() {
        let mut graph = InstantiationGraph::new();
        let a = graph.insert(key("A", &[]), Vec::new()).unwrap();
        let b = graph.insert(key("B", &[]), Vec::new()).unwrap();
        let c = graph.insert(key("C", &[]), Vec::new()).unwrap();
        graph.set_bases(c, vec![b, a]);
        assert_eq!(graph[c].bases, vec![b, a]);
        assert!(!graph[c].is_root());
    }
}
