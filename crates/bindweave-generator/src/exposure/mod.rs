//! Exposure Filter & Overload Disambiguator.
//!
//! Decides the member surface each instantiation exposes:
//!
//! - [`filter`]: drops excluded members, substitutes generic parameters and
//!   keeps default expressions in expression form
//! - [`overload`]: groups by name, rejects overload sets a dynamic caller
//!   could not tell apart, and renders the signature-qualified reference
//!   every binding uses
//!
//! Only members the class declares itself are exposed; inherited members
//! reach the dynamic side through the base instantiation's own binding.

pub mod filter;
pub mod overload;

use bindweave_core::runtime::BoundParam;
use bindweave_core::{DefaultExpr, GenerationError, GenericClass, TypeRef};
use bindweave_registry::ConcreteInstantiation;
use serde::Deserialize;

use crate::GeneratorConfig;
use crate::substitution::SubstitutionMap;

pub use overload::{check_overloads, erased_signature};

/// How a returned reference or pointer is owned on the dynamic side.
///
/// Pointer and reference returns get [`Reference`](Self::Reference) and
/// [`ReferenceInternal`](Self::ReferenceInternal) unless the config sets
/// `pointer_call_policy` or `reference_call_policy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnPolicy {
    /// Runtime default (values are copied or moved).
    #[default]
    Automatic,
    /// The dynamic side takes ownership of the returned pointer.
    TakeOwnership,
    /// The returned object is copied.
    Copy,
    /// The returned object is moved.
    Move,
    /// Returned pointer is borrowed, not owned.
    Reference,
    /// Returned reference keeps the owning object alive.
    ReferenceInternal,
}

impl ReturnPolicy {
    /// Built-in policy for a return type.
    pub fn for_return(ty: &TypeRef) -> Self {
        if ty.is_reference() {
            ReturnPolicy::ReferenceInternal
        } else if ty.is_pointer() {
            ReturnPolicy::Reference
        } else {
            ReturnPolicy::Automatic
        }
    }
}

/// A parameter on an exposed member.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposedParam {
    /// Keyword name.
    pub name: String,
    /// Concrete type.
    pub ty: TypeRef,
    /// Default expression, substituted but not evaluated.
    pub default: Option<DefaultExpr>,
}

impl ExposedParam {
    /// As handed to a module handle.
    pub fn to_bound(&self) -> BoundParam {
        BoundParam {
            name: self.name.clone(),
            ty: self.ty.clone(),
            default: self.default.clone(),
        }
    }
}

/// An exposed constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposedConstructor {
    /// Parameters.
    pub params: Vec<ExposedParam>,
    /// Exact signature, `Point_3(double, double, double)`.
    pub signature: String,
}

/// An exposed method.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposedMethod {
    /// Method name.
    pub name: String,
    /// Parameters.
    pub params: Vec<ExposedParam>,
    /// Concrete return type.
    pub return_type: TypeRef,
    /// `const` qualified.
    pub is_const: bool,
    /// Static member.
    pub is_static: bool,
    /// Return value policy.
    pub policy: ReturnPolicy,
    /// Exact member-pointer signature, `void(PottsMesh_3::*)(double const)`.
    pub signature: String,
}

/// An exposed data member.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposedField {
    /// Field name.
    pub name: String,
    /// Concrete type.
    pub ty: TypeRef,
    /// Read-only on the dynamic side.
    pub readonly: bool,
}

/// Everything one instantiation exposes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExposedSurface {
    /// Constructors, in declaration order.
    pub constructors: Vec<ExposedConstructor>,
    /// Methods, in declaration order.
    pub methods: Vec<ExposedMethod>,
    /// Fields, in declaration order.
    pub fields: Vec<ExposedField>,
}

impl ExposedSurface {
    /// Overloads of a method name.
    pub fn overloads<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ExposedMethod> {
        self.methods.iter().filter(move |m| m.name == name)
    }

    /// Check whether any exposed member is named `name`.
    pub fn exposes(&self, name: &str) -> bool {
        self.overloads(name).next().is_some() || self.fields.iter().any(|f| f.name == name)
    }
}

/// Build the exposed surface for one instantiation.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn expose(
    node: &ConcreteInstantiation,
    class: &GenericClass,
    short_name: &str,
    subst_map: &SubstitutionMap,
    config: &GeneratorConfig,
) -> Result<ExposedSurface, GenerationError> {
    let surface = filter::filter_members(class, short_name, subst_map, config);
    check_overloads(&node.key, &surface)?;
    tracing::trace!(
        instance = %node.key,
        constructors = surface.constructors.len(),
        methods = surface.methods.len(),
        "surface exposed"
    );
    Ok(surface)
}
