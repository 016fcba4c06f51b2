//! Override Shim Synthesizer.
//!
//! A shim plan lists every virtual or abstract method reachable on an
//! instantiation, declared or inherited, with generic parameters already
//! substituted. Plans are built per instantiation: `AbstractMesh<2,2>` and
//! `AbstractMesh<3,3>` get independent plans even though they share a
//! declaration.
//!
//! Inherited entries are taken from the base instantiations' finished plans
//! rather than recomputed. A method the class declares itself replaces an
//! inherited entry with the same name and erased parameters; a concrete
//! redeclaration turns an abstract entry virtual.

use bindweave_core::runtime::{ShimKind, ShimTarget};
use bindweave_core::{GenericClass, InstanceKey, Param, TypeRef, Virtuality};
use bindweave_registry::{ConcreteInstantiation, InstanceId};

use crate::substitution::{SubstitutionMap, substitute_method};

/// One forwarded method.
#[derive(Debug, Clone, PartialEq)]
pub struct ShimMethod {
    /// Method name.
    pub name: String,
    /// Concrete parameters.
    pub params: Vec<Param>,
    /// Concrete return type.
    pub return_type: TypeRef,
    /// `const` qualified.
    pub is_const: bool,
    /// Fallback behaviour when no override exists.
    pub kind: ShimKind,
    /// Instantiation whose declaration this entry comes from.
    pub declared_in: InstanceId,
    erased: Vec<String>,
}

impl ShimMethod {
    /// The dispatch target for a call on `instance`.
    pub fn target(&self, instance: &InstanceKey) -> ShimTarget {
        ShimTarget {
            instance: instance.to_string(),
            method: self.name.clone(),
            kind: self.kind,
        }
    }

    /// Check whether two entries name the same overridable slot.
    pub fn same_slot(&self, other: &ShimMethod) -> bool {
        self.name == other.name && self.erased == other.erased && self.is_const == other.is_const
    }
}

/// Forwarding shim for one instantiation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShimPlan {
    /// Shim type name, `<Short>_Overrides`.
    pub type_name: String,
    /// Forwarded methods: inherited first, in base order, then new ones.
    pub methods: Vec<ShimMethod>,
}

impl ShimPlan {
    /// Check whether there is anything to forward.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Check for any method without a native implementation.
    pub fn has_abstract(&self) -> bool {
        self.methods.iter().any(|m| m.kind == ShimKind::Abstract)
    }

    /// First entry named `name`.
    pub fn find(&self, name: &str) -> Option<&ShimMethod> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Build the shim plan for `node`.
///
/// `bases` must hold the finished plans of the node's direct bases, in
/// declaration order.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn synthesize_shim(
    node: &ConcreteInstantiation,
    class: &GenericClass,
    short_name: &str,
    subst_map: &SubstitutionMap,
    bases: &[&ShimPlan],
) -> ShimPlan {
    let mut methods: Vec<ShimMethod> = Vec::new();
    for base in bases {
        for inherited in &base.methods {
            if !methods.iter().any(|m| m.same_slot(inherited)) {
                methods.push(inherited.clone());
            }
        }
    }

    for declared in &class.methods {
        if declared.is_static() {
            continue;
        }
        let method = substitute_method(declared, subst_map);
        let entry = ShimMethod {
            erased: method.params.iter().map(|p| p.ty.erased()).collect(),
            kind: match method.virtuality {
                Virtuality::Abstract => ShimKind::Abstract,
                _ => ShimKind::Virtual,
            },
            is_const: method.is_const(),
            name: method.name,
            params: method.params,
            return_type: method.return_type,
            declared_in: node.id,
        };
        match methods.iter_mut().find(|m| m.same_slot(&entry)) {
            Some(slot) => *slot = entry,
            None if declared.virtuality.is_dynamic() => methods.push(entry),
            None => {}
        }
    }

    tracing::trace!(
        instance = %node.key,
        methods = methods.len(),
        "shim plan built"
    );
    ShimPlan {
        type_name: format!("{}_Overrides", short_name),
        methods,
    }
}
