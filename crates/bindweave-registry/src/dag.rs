//! Inheritance DAG over resolved instantiations.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: the [`InstanceKey`] of each instantiation, one per arena slot
//! - Edges: base -> derived
//!
//! Node indices line up with [`InstanceId`]s because nodes are added in
//! arena order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use bindweave_core::{GenerationError, InstanceKey};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashSet;

use crate::{InstanceId, InstantiationGraph};

/// Read-only inheritance structure of a finished [`InstantiationGraph`].
#[derive(Debug, Clone)]
pub struct InheritanceDag {
    graph: DiGraph<InstanceKey, ()>,
}

impl InheritanceDag {
    /// Build the DAG from resolved nodes.
    pub fn from_graph(instances: &InstantiationGraph) -> Self {
        let mut graph = DiGraph::with_capacity(instances.len(), instances.len());
        for node in instances.iter() {
            graph.add_node(node.key.clone());
        }
        for node in instances.iter() {
            for base in &node.bases {
                graph.add_edge(to_node(*base), to_node(node.id), ());
            }
        }
        Self { graph }
    }

    /// Number of instantiations.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Check if the DAG is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Key of an instantiation.
    pub fn key(&self, id: InstanceId) -> Option<&InstanceKey> {
        self.graph.node_weight(to_node(id))
    }

    /// Direct bases, ordered by creation.
    pub fn bases(&self, id: InstanceId) -> Vec<InstanceId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Every transitive base, nearest first.
    pub fn ancestors(&self, id: InstanceId) -> Vec<InstanceId> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        let mut frontier = self.bases(id);
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for base in frontier {
                if seen.insert(base) {
                    out.push(base);
                    next.extend(self.bases(base));
                }
            }
            frontier = next;
        }
        out
    }

    /// Topmost ancestors: those with no bases. A root is its own topmost.
    pub fn topmost(&self, id: InstanceId) -> Vec<InstanceId> {
        let mut roots: Vec<InstanceId> = self
            .ancestors(id)
            .into_iter()
            .filter(|a| self.bases(*a).is_empty())
            .collect();
        if roots.is_empty() {
            roots.push(id);
        }
        roots.sort();
        roots
    }

    /// Bases before derived, ties broken by creation order.
    ///
    /// Kahn's algorithm with a min-heap of ready nodes, so the result is a
    /// pure function of the graph.
    pub fn topological_order(&self) -> Result<Vec<InstanceId>, GenerationError> {
        let count = self.graph.node_count();
        let mut in_degree: Vec<usize> = (0..count)
            .map(|i| {
                self.graph
                    .neighbors_directed(NodeIndex::new(i), Direction::Incoming)
                    .count()
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(count);
        while let Some(Reverse(index)) = ready.pop() {
            order.push(InstanceId::from_index(index));
            for next in self
                .graph
                .neighbors_directed(NodeIndex::new(index), Direction::Outgoing)
            {
                let degree = &mut in_degree[next.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(next.index()));
                }
            }
        }

        if order.len() < count {
            let mut cycle: Vec<InstanceKey> = in_degree
                .iter()
                .enumerate()
                .filter(|(_, d)| **d > 0)
                .map(|(i, _)| self.graph[NodeIndex::new(i)].clone())
                .collect();
            let instance = cycle[0].clone();
            cycle.push(instance.clone());
            return Err(GenerationError::CyclicInheritance { instance, cycle });
        }
        Ok(order)
    }

    /// Group instantiations by inheritance depth.
    ///
    /// Layer 0 holds roots; every node sits one layer below its deepest
    /// base. Nodes in a layer depend only on earlier layers.
    pub fn layers(&self) -> Result<Vec<Vec<InstanceId>>, GenerationError> {
        let order = self.topological_order()?;
        let mut depth = vec![0usize; order.len()];
        let mut layers: Vec<Vec<InstanceId>> = Vec::new();
        for id in order {
            let d = self
                .bases(id)
                .iter()
                .map(|b| depth[b.index()] + 1)
                .max()
                .unwrap_or(0);
            depth[id.index()] = d;
            if layers.len() <= d {
                layers.resize_with(d + 1, Vec::new);
            }
            layers[d].push(id);
        }
        for layer in &mut layers {
            layer.sort();
        }
        Ok(layers)
    }

    /// Check that `order` places every base before each of its derived.
    pub fn verify_order(&self, order: &[InstanceId]) -> Result<(), GenerationError> {
        let mut position = vec![usize::MAX; self.graph.node_count()];
        for (pos, id) in order.iter().enumerate() {
            if let Some(slot) = position.get_mut(id.index()) {
                *slot = pos;
            }
        }
        for edge in self.graph.raw_edges() {
            let (base, derived) = (edge.source(), edge.target());
            if position[base.index()] >= position[derived.index()] {
                return Err(GenerationError::OrderingViolation {
                    base: self.graph[base].clone(),
                    derived: self.graph[derived].clone(),
                });
            }
        }
        Ok(())
    }

    fn neighbors(&self, id: InstanceId, direction: Direction) -> Vec<InstanceId> {
        let mut out: Vec<InstanceId> = self
            .graph
            .neighbors_directed(to_node(id), direction)
            .map(|n| InstanceId::from_index(n.index()))
            .collect();
        out.sort();
        out.dedup();
        out
    }
}

fn to_node(id: InstanceId) -> NodeIndex {
    NodeIndex::new(id.index())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Diamond: Shape <- {Rectangle, Square}; Tile derives from both.
    fn diamond() -> (InstantiationGraph, [InstanceId; 4]) {
        let mut graph = InstantiationGraph::new();
        let shape = graph.insert(InstanceKey::plain("Shape"), Vec::new()).unwrap();
        let rect = graph.insert(InstanceKey::plain("Rectangle"), Vec::new()).unwrap();
        let square = graph.insert(InstanceKey::plain("Square"), Vec::new()).unwrap();
        let tile = graph.insert(InstanceKey::plain("Tile"), Vec::new()).unwrap();
        graph.set_bases(rect, vec![shape]);
        graph.set_bases(square, vec![shape]);
        graph.set_bases(tile, vec![square, rect]);
        (graph, [shape, rect, square, tile])
    }

    #[test]
    fn topological_order_is_deterministic() {
        let (graph, [shape, rect, square, tile]) = diamond();
        let dag = InheritanceDag::from_graph(&graph);
        let order = dag.topological_order().unwrap();
        assert_eq!(order, vec![shape, rect, square, tile]);
        assert_eq!(dag.topological_order().unwrap(), order);
        dag.verify_order(&order).unwrap();
    }

    #[test]
    fn derived_created_before_base_still_orders_after_it() {
        let mut graph = InstantiationGraph::new();
        let potts = graph.insert(InstanceKey::with_ints("PottsMesh", &[3]), Vec::new()).unwrap();
        let mesh = graph
            .insert(InstanceKey::with_ints("AbstractMesh", &[3, 3]), Vec::new())
            .unwrap();
        graph.set_bases(potts, vec![mesh]);
        let dag = InheritanceDag::from_graph(&graph);
        assert_eq!(dag.topological_order().unwrap(), vec![mesh, potts]);
    }

    #[test]
    fn layers_group_by_depth() {
        let (graph, [shape, rect, square, tile]) = diamond();
        let dag = InheritanceDag::from_graph(&graph);
        assert_eq!(
            dag.layers().unwrap(),
            vec![vec![shape], vec![rect, square], vec![tile]]
        );
    }

    #[test]
    fn ancestors_and_topmost() {
        let (graph, [shape, rect, square, tile]) = diamond();
        let dag = InheritanceDag::from_graph(&graph);
        assert_eq!(dag.ancestors(tile), vec![rect, square, shape]);
        assert_eq!(dag.topmost(tile), vec![shape]);
        assert_eq!(dag.topmost(shape), vec![shape]);
    }

    #[test]
    fn verify_order_rejects_derived_first() {
        let (graph, [shape, rect, square, tile]) = diamond();
        let dag = InheritanceDag::from_graph(&graph);
        let err = dag.verify_order(&[rect, shape, square, tile]).unwrap_err();
        assert_eq!(
            err,
            GenerationError::OrderingViolation {
                base: InstanceKey::plain("Shape"),
                derived: InstanceKey::plain("Rectangle"),
            }
        );
    }

    #[test]
    fn cycle_is_reported() {
        let mut graph = InstantiationGraph::new();
        let a = graph.insert(InstanceKey::plain("A"), Vec::new()).unwrap();
        let b = graph.insert(InstanceKey::plain("B"), Vec::new()).unwrap();
        graph.set_bases(a, vec![b]);
        graph.set_bases(b, vec![a]);
        let dag = InheritanceDag::from_graph(&graph);
        assert!(matches!(
            dag.topological_order(),
            Err(GenerationError::CyclicInheritance { .. })
        ));
    }
}
