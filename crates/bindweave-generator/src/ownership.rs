//! Ownership Assigner.
//!
//! Every instantiation gets the ownership model of its hierarchy root. For
//! a polymorphic node the root is the topmost polymorphic ancestor (the
//! node itself if none of its bases is polymorphic). For a node with no
//! dynamic methods anywhere in its ancestry, the roots are its topmost
//! ancestors.
//!
//! The model a node asks for comes from, in order: per-class config,
//! the declaration, the config default. A node whose own request differs
//! from its root's, or from any other ancestor's, is an
//! `OwnershipModelMismatch`; there is no way to mix models inside one
//! hierarchy.

use bindweave_core::{DeclarationModel, GenerationError, OwnershipModel};
use bindweave_registry::{InheritanceDag, InstanceId, InstantiationGraph};

use crate::GeneratorConfig;

/// Ownership assigned to one instantiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    /// The model, identical across the hierarchy.
    pub model: OwnershipModel,
    /// Hierarchy roots the model was taken from.
    pub roots: Vec<InstanceId>,
}

/// Assigns ownership models over a resolved graph.
pub struct OwnershipAssigner<'a> {
    model: &'a DeclarationModel,
    config: &'a GeneratorConfig,
    graph: &'a InstantiationGraph,
    dag: &'a InheritanceDag,
}

impl<'a> OwnershipAssigner<'a> {
    /// Create an assigner.
    pub fn new(
        model: &'a DeclarationModel,
        config: &'a GeneratorConfig,
        graph: &'a InstantiationGraph,
        dag: &'a InheritanceDag,
    ) -> Self {
        Self {
            model,
            config,
            graph,
            dag,
        }
    }

    /// The model a node requests on its own.
    pub fn requested(&self, id: InstanceId) -> OwnershipModel {
        let class = &self.graph[id].key.class;
        self.config
            .class_ownership(class)
            .or_else(|| self.model.get(class).and_then(|c| c.ownership.as_ref()))
            .unwrap_or(&self.config.smart_ptr_type)
            .clone()
    }

    /// Check whether a node declares or inherits a virtual/abstract method.
    pub fn is_polymorphic(&self, id: InstanceId) -> bool {
        self.declares_dynamic(id) || self.dag.ancestors(id).into_iter().any(|a| self.declares_dynamic(a))
    }

    /// Hierarchy roots of a node.
    pub fn roots(&self, id: InstanceId) -> Vec<InstanceId> {
        if !self.is_polymorphic(id) {
            return self.dag.topmost(id);
        }
        let mut roots: Vec<InstanceId> = std::iter::once(id)
            .chain(self.dag.ancestors(id))
            .filter(|c| self.declares_dynamic(*c))
            .filter(|c| self.dag.bases(*c).into_iter().all(|b| !self.is_polymorphic(b)))
            .collect();
        roots.sort();
        roots.dedup();
        roots
    }

    /// Assign the model for one node.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn assign(&self, id: InstanceId) -> Result<Ownership, GenerationError> {
        let roots = self.roots(id);
        let model = self.requested(id);
        let mut ancestors = self.dag.ancestors(id);
        ancestors.retain(|a| !roots.contains(a));
        ancestors.sort();
        for other in roots.iter().chain(&ancestors) {
            let expected = self.requested(*other);
            if expected != model {
                return Err(GenerationError::OwnershipModelMismatch {
                    instance: self.graph[id].key.clone(),
                    root: self.graph[*other].key.clone(),
                    expected,
                    found: model,
                });
            }
        }
        tracing::trace!(instance = %self.graph[id].key, %model, "ownership assigned");
        Ok(Ownership { model, roots })
    }

    fn declares_dynamic(&self, id: InstanceId) -> bool {
        self.model
            .get(&self.graph[id].key.class)
            .is_some_and(|c| c.declares_dynamic_methods())
    }
}
