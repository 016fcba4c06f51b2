//! Concrete instantiation nodes.

use std::fmt;

use bindweave_core::{IdentityHash, InstanceKey, TemplateArg};

/// Arena index of a [`ConcreteInstantiation`].
///
/// Ids are assigned in creation order, so comparing two ids compares
/// creation order. The scheduler relies on this for deterministic ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u32);

impl InstanceId {
    /// Id for an arena position.
    pub fn from_index(index: usize) -> Self {
        InstanceId(index as u32)
    }

    /// Position in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One generic class bound to one concrete argument tuple.
///
/// Created once per run by the resolver and never mutated after resolution
/// completes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcreteInstantiation {
    /// Arena index.
    pub id: InstanceId,
    /// Identity: class name and complete argument tuple.
    pub key: InstanceKey,
    /// Deterministic hash of `key`.
    pub hash: IdentityHash,
    /// Generic parameter name to concrete argument, in declaration order.
    pub bindings: Vec<(String, TemplateArg)>,
    /// Direct bases, in declaration order.
    pub bases: Vec<InstanceId>,
}

impl ConcreteInstantiation {
    /// The argument bound to a generic parameter.
    pub fn binding(&self, param: &str) -> Option<&TemplateArg> {
        self.bindings
            .iter()
            .find(|(name, _)| name == param)
            .map(|(_, arg)| arg)
    }

    /// Check if this node has no bases.
    pub fn is_root(&self) -> bool {
        self.bases.is_empty()
    }
}
