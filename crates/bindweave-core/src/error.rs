//! Error types for every phase of binding generation.
//!
//! ## Error Hierarchy
//!
//! ```text
//! BindError (top-level wrapper)
//! ├── GenerationError - resolution, ownership, exposure and scheduling failures
//! ├── ModuleError     - structural errors reported by a module handle
//! └── DispatchError   - errors raised when calling through a binding at runtime
//! ```
//!
//! Generation errors always name the offending instance so the caller can
//! tell which requested subgraph was aborted.

use thiserror::Error;

use crate::{InstanceKey, OwnershipModel, TypeParseError};

// ============================================================================
// Generation Errors
// ============================================================================

/// Errors raised while generating bindings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// A base argument mapping refers to a parameter that is not bound.
    #[error("{instance}: generic parameter '{param}' is unbound in base '{base}'")]
    UnresolvedGenericParameter {
        instance: InstanceKey,
        base: String,
        param: String,
    },

    /// Inheritance loops back onto an instance still being resolved.
    #[error("{instance}: cyclic inheritance: {}", format_cycle(cycle))]
    CyclicInheritance {
        instance: InstanceKey,
        cycle: Vec<InstanceKey>,
    },

    /// Two instances in one hierarchy request different ownership models.
    #[error(
        "{instance}: ownership model '{found}' conflicts with '{expected}' assigned at hierarchy root {root}"
    )]
    OwnershipModelMismatch {
        instance: InstanceKey,
        root: InstanceKey,
        expected: OwnershipModel,
        found: OwnershipModel,
    },

    /// Two exposed overloads are indistinguishable to a dynamic caller.
    #[error("{instance}: ambiguous overload '{name}': '{first}' and '{second}' erase to the same signature")]
    AmbiguousOverload {
        instance: InstanceKey,
        name: String,
        first: String,
        second: String,
    },

    /// A class name that the declaration model does not contain.
    #[error("{required_by}: unknown class '{name}'")]
    UnknownClass {
        name: String,
        required_by: InstanceKey,
    },

    /// Wrong number of generic arguments.
    #[error("{instance}: '{class}' expects {expected} generic argument(s), got {got}")]
    TemplateArgCountMismatch {
        instance: InstanceKey,
        class: String,
        expected: usize,
        got: usize,
    },

    /// A declared type string could not be parsed after substitution.
    #[error("{instance}: {source}")]
    InvalidType {
        instance: InstanceKey,
        #[source]
        source: TypeParseError,
    },

    /// Two distinct instances encode to the same binding name.
    #[error("binding name '{name}' is produced by both {first} and {second}")]
    NameCollision {
        name: String,
        first: InstanceKey,
        second: InstanceKey,
    },

    /// The same instance was created twice (internal invariant).
    #[error("internal error: {instance} instantiated more than once")]
    DuplicateInstantiation { instance: InstanceKey },

    /// Two distinct instances share an identity hash (internal invariant).
    #[error("internal error: {instance} has the same identity hash as {existing}")]
    IdentityCollision {
        instance: InstanceKey,
        existing: InstanceKey,
    },

    /// A derived instance was ordered before its base (internal invariant).
    #[error("internal error: {derived} scheduled before its base {base}")]
    OrderingViolation {
        base: InstanceKey,
        derived: InstanceKey,
    },
}

impl GenerationError {
    /// The instance this error is reported against.
    pub fn instance(&self) -> &InstanceKey {
        match self {
            GenerationError::UnresolvedGenericParameter { instance, .. }
            | GenerationError::CyclicInheritance { instance, .. }
            | GenerationError::OwnershipModelMismatch { instance, .. }
            | GenerationError::AmbiguousOverload { instance, .. }
            | GenerationError::TemplateArgCountMismatch { instance, .. }
            | GenerationError::InvalidType { instance, .. }
            | GenerationError::DuplicateInstantiation { instance }
            | GenerationError::IdentityCollision { instance, .. } => instance,
            GenerationError::UnknownClass { required_by, .. } => required_by,
            GenerationError::NameCollision { second, .. } => second,
            GenerationError::OrderingViolation { derived, .. } => derived,
        }
    }

    /// Internal invariant violations indicate a generator bug, not bad input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            GenerationError::DuplicateInstantiation { .. }
                | GenerationError::IdentityCollision { .. }
                | GenerationError::OrderingViolation { .. }
        )
    }
}

fn format_cycle(cycle: &[InstanceKey]) -> String {
    cycle
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

// ============================================================================
// Module Errors
// ============================================================================

/// Structural errors reported by a module handle during registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    /// A class referenced a base that has not been registered yet.
    #[error("class '{class}' registered before its base '{base}'")]
    UnknownBase { class: String, base: String },

    /// A class name was registered twice.
    #[error("class '{class}' is already registered")]
    DuplicateRegistration { class: String },

    /// A member was attached to a class that does not exist.
    #[error("no class '{class}' in module")]
    UnknownClass { class: String },

    /// An assembly named a unit it was not handed.
    #[error("module assembly lists '{unit}' but no such unit was supplied")]
    MissingUnit { unit: String },
}

// ============================================================================
// Dispatch Errors
// ============================================================================

/// Errors raised when invoking exposed members.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// An abstract method was called with no dynamic-side override.
    #[error("{instance}.{method} is abstract and has no override")]
    MissingOverride { instance: String, method: String },

    /// A required argument was not supplied and has no default.
    #[error("{callable}: missing argument '{param}'")]
    MissingArgument { callable: String, param: String },

    /// More arguments than parameters.
    #[error("{callable}: expected at most {expected} argument(s), got {got}")]
    TooManyArguments {
        callable: String,
        expected: usize,
        got: usize,
    },

    /// No member with that name accepts the given argument count.
    #[error("{class}.{member}: no overload accepts {arity} argument(s)")]
    NoMatchingOverload {
        class: String,
        member: String,
        arity: usize,
    },

    /// No native implementation is bound to a callable.
    #[error("{callable}: no native implementation bound")]
    NoNativeImplementation { callable: String },

    /// A default expression could not be evaluated.
    #[error("cannot evaluate default expression '{expr}'")]
    InvalidDefault { expr: String },
}

// ============================================================================
// Top-level wrapper
// ============================================================================

/// Any bindweave error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
