//! The module handle capability and an in-memory host.
//!
//! Binding units attach themselves to a [`ModuleHandle`]: named classes
//! first, then their constructors and methods. The only structural
//! precondition a handle imposes is base-before-derived ordering.
//!
//! [`HostModule`] is an in-memory handle that enforces that precondition and
//! can invoke what was registered, so the generated surface can be exercised
//! without a real dynamic runtime.

use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;

use super::dispatch::{DispatchOutcome, OverrideTable, ShimKind, ShimTarget, dispatch};
use super::{Dynamic, NativeFn, ObjectRef, ValueFactory};
use crate::TypeRef;
use crate::decl::DefaultExpr;
use crate::error::{DispatchError, ModuleError};

/// Name under which constructors are registered.
pub const CONSTRUCTOR_NAME: &str = "__init__";

/// A class declaration handed to a module handle.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassRegistration {
    /// Name visible on the dynamic side (`AbstractMesh_2_2`).
    pub name: String,
    /// Native type name (`AbstractMesh<2,2 >`).
    pub native_name: String,
    /// Dynamic-side names of direct bases; all must already be registered.
    pub bases: Vec<String>,
    /// Holder type implementing the ownership model.
    pub holder: String,
    /// Shim metadata for polymorphic classes.
    pub shim: Option<ShimRegistration>,
}

/// Forwarding shim metadata for a registered class.
#[derive(Debug, Clone, PartialEq)]
pub struct ShimRegistration {
    /// Name of the shim type.
    pub type_name: String,
    /// Forwarded methods and their fallback behaviour.
    pub methods: Vec<(String, ShimKind)>,
}

/// A constructor or method handed to a module handle.
#[derive(Debug, Clone, PartialEq)]
pub struct CallableRegistration {
    /// Member name, or [`CONSTRUCTOR_NAME`].
    pub name: String,
    /// Exact native signature this binding resolves to.
    pub signature: String,
    /// Parameters with their default expressions.
    pub params: Vec<BoundParam>,
}

impl CallableRegistration {
    /// Minimum and maximum accepted argument counts.
    pub fn arity(&self) -> (usize, usize) {
        let required = self
            .params
            .iter()
            .take_while(|p| p.default.is_none())
            .count();
        (required, self.params.len())
    }
}

/// A parameter as bound at registration time.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    /// Keyword name.
    pub name: String,
    /// Concrete native type.
    pub ty: TypeRef,
    /// Default expression, re-evaluated on every call that omits it.
    pub default: Option<DefaultExpr>,
}

/// Accepts class and member registrations.
pub trait ModuleHandle {
    /// Register a class. Every base in `class.bases` must already exist.
    fn add_class(&mut self, class: ClassRegistration) -> Result<(), ModuleError>;

    /// Attach a constructor to a registered class.
    fn add_constructor(
        &mut self,
        class: &str,
        ctor: CallableRegistration,
    ) -> Result<(), ModuleError>;

    /// Attach a method to a registered class.
    fn add_method(&mut self, class: &str, method: CallableRegistration)
    -> Result<(), ModuleError>;
}

/// Fill in omitted arguments from their default expressions.
///
/// Defaults are evaluated here, per call, never cached.
pub fn bind_arguments(
    callable: &str,
    params: &[BoundParam],
    supplied: Vec<Dynamic>,
    factory: &dyn ValueFactory,
) -> Result<Vec<Dynamic>, DispatchError> {
    if supplied.len() > params.len() {
        return Err(DispatchError::TooManyArguments {
            callable: callable.to_string(),
            expected: params.len(),
            got: supplied.len(),
        });
    }
    let mut bound = supplied;
    for param in &params[bound.len()..] {
        let default = param
            .default
            .as_ref()
            .ok_or_else(|| DispatchError::MissingArgument {
                callable: callable.to_string(),
                param: param.name.clone(),
            })?;
        bound.push(default.evaluate(factory)?);
    }
    Ok(bound)
}

// ============================================================================
// In-memory host
// ============================================================================

#[derive(Debug)]
struct HostClass {
    registration: ClassRegistration,
    constructors: Vec<CallableRegistration>,
    methods: FxHashMap<String, Vec<CallableRegistration>>,
}

/// In-memory [`ModuleHandle`] that records and executes registrations.
#[derive(Default)]
pub struct HostModule {
    name: String,
    classes: FxHashMap<String, HostClass>,
    order: Vec<String>,
    natives: FxHashMap<(String, String), NativeFn>,
    next_object: AtomicU64,
}

impl HostModule {
    /// Create an empty module.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class names in registration order.
    pub fn registration_order(&self) -> &[String] {
        &self.order
    }

    /// Look up a class registration.
    pub fn class(&self, name: &str) -> Option<&ClassRegistration> {
        self.classes.get(name).map(|c| &c.registration)
    }

    /// Constructors registered on a class.
    pub fn constructors(&self, class: &str) -> &[CallableRegistration] {
        self.classes
            .get(class)
            .map(|c| c.constructors.as_slice())
            .unwrap_or(&[])
    }

    /// Overloads of a method registered directly on a class.
    pub fn methods(&self, class: &str, name: &str) -> &[CallableRegistration] {
        self.classes
            .get(class)
            .and_then(|c| c.methods.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Bind a native implementation to an exact signature.
    pub fn bind_native(&mut self, class: &str, signature: &str, f: NativeFn) {
        self.natives
            .insert((class.to_string(), signature.to_string()), f);
    }

    /// Construct an instance of `class` through its registered constructors.
    ///
    /// Returns the arguments after default binding alongside the new object,
    /// so callers can observe how defaults were filled.
    pub fn construct_instance(
        &self,
        class: &str,
        supplied: Vec<Dynamic>,
    ) -> Result<(Dynamic, Vec<Dynamic>), DispatchError> {
        let ctors = self.constructors(class);
        let ctor = select_overload(class, CONSTRUCTOR_NAME, ctors, supplied.len())?;
        let args = bind_arguments(&ctor.signature, &ctor.params, supplied, self)?;
        let object = Dynamic::Object(ObjectRef {
            type_name: class.to_string(),
            id: self.next_object.fetch_add(1, Ordering::Relaxed),
        });
        Ok((object, args))
    }

    /// Call a method, searching the class and then its registered bases.
    pub fn call(
        &self,
        class: &str,
        method: &str,
        supplied: Vec<Dynamic>,
    ) -> Result<Dynamic, DispatchError> {
        let (owner, callable) = self.find_method(class, method, supplied.len())?;
        let args = bind_arguments(&callable.signature, &callable.params, supplied, self)?;
        let native = self
            .natives
            .get(&(owner.to_string(), callable.signature.clone()))
            .ok_or_else(|| DispatchError::NoNativeImplementation {
                callable: callable.signature.clone(),
            })?;
        native(&args)
    }

    /// Call a virtual method on an object that may carry dynamic overrides.
    ///
    /// The shim kind comes from the nearest class in the hierarchy whose
    /// shim forwards `method`. When the method is also exposed, omitted
    /// arguments are filled from its defaults before the override lookup.
    /// A shimmed method that is not exposed still reaches its override.
    pub fn call_virtual(
        &self,
        class: &str,
        method: &str,
        overrides: &OverrideTable,
        supplied: Vec<Dynamic>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let kind = self.shim_kind(class, method).ok_or_else(|| {
            DispatchError::NoMatchingOverload {
                class: class.to_string(),
                member: method.to_string(),
                arity: supplied.len(),
            }
        })?;
        let target = ShimTarget {
            instance: self
                .class(class)
                .map(|c| c.native_name.trim_end().replace(" >", ">"))
                .unwrap_or_else(|| class.to_string()),
            method: method.to_string(),
            kind,
        };

        let exposed = if self.exposes(class, method) {
            Some(self.find_method(class, method, supplied.len())?)
        } else {
            None
        };
        let args = match exposed {
            Some((_, callable)) => {
                bind_arguments(&callable.signature, &callable.params, supplied, self)?
            }
            None => supplied,
        };
        let native = match kind {
            ShimKind::Abstract => None,
            ShimKind::Virtual => exposed.and_then(|(owner, callable)| {
                self.natives
                    .get(&(owner.to_string(), callable.signature.clone()))
            }),
        };
        dispatch(&target, overrides, native, &args)
    }

    /// Whether `method` is registered on `class` or any of its bases.
    fn exposes(&self, class: &str, method: &str) -> bool {
        self.classes.get(class).is_some_and(|entry| {
            entry.methods.contains_key(method)
                || entry
                    .registration
                    .bases
                    .iter()
                    .any(|base| self.exposes(base, method))
        })
    }

    fn shim_kind(&self, class: &str, method: &str) -> Option<ShimKind> {
        let entry = self.classes.get(class)?;
        if let Some(shim) = &entry.registration.shim
            && let Some((_, kind)) = shim.methods.iter().find(|(name, _)| name == method)
        {
            return Some(*kind);
        }
        entry
            .registration
            .bases
            .iter()
            .find_map(|base| self.shim_kind(base, method))
    }

    fn find_method<'a>(
        &'a self,
        class: &'a str,
        method: &str,
        arity: usize,
    ) -> Result<(&'a str, &'a CallableRegistration), DispatchError> {
        let entry = self
            .classes
            .get(class)
            .ok_or_else(|| DispatchError::NoMatchingOverload {
                class: class.to_string(),
                member: method.to_string(),
                arity,
            })?;
        if let Some(overloads) = entry.methods.get(method) {
            return select_overload(class, method, overloads, arity).map(|c| (class, c));
        }
        for base in &entry.registration.bases {
            if let Ok(found) = self.find_method(base, method, arity) {
                return Ok(found);
            }
        }
        Err(DispatchError::NoMatchingOverload {
            class: class.to_string(),
            member: method.to_string(),
            arity,
        })
    }

    fn class_mut(&mut self, class: &str) -> Result<&mut HostClass, ModuleError> {
        self.classes
            .get_mut(class)
            .ok_or_else(|| ModuleError::UnknownClass {
                class: class.to_string(),
            })
    }
}

fn select_overload<'a>(
    class: &str,
    member: &str,
    overloads: &'a [CallableRegistration],
    arity: usize,
) -> Result<&'a CallableRegistration, DispatchError> {
    overloads
        .iter()
        .find(|c| {
            let (min, max) = c.arity();
            (min..=max).contains(&arity)
        })
        .ok_or_else(|| DispatchError::NoMatchingOverload {
            class: class.to_string(),
            member: member.to_string(),
            arity,
        })
}

impl ValueFactory for HostModule {
    fn construct(&self, ty: &TypeRef) -> Dynamic {
        Dynamic::Object(ObjectRef {
            type_name: ty.unqualified().to_string(),
            id: self.next_object.fetch_add(1, Ordering::Relaxed),
        })
    }
}

impl ModuleHandle for HostModule {
    fn add_class(&mut self, class: ClassRegistration) -> Result<(), ModuleError> {
        if self.classes.contains_key(&class.name) {
            return Err(ModuleError::DuplicateRegistration { class: class.name });
        }
        if let Some(base) = class.bases.iter().find(|b| !self.classes.contains_key(*b)) {
            return Err(ModuleError::UnknownBase {
                class: class.name.clone(),
                base: base.clone(),
            });
        }
        tracing::debug!(module = %self.name, class = %class.name, "class registered");
        self.order.push(class.name.clone());
        self.classes.insert(
            class.name.clone(),
            HostClass {
                registration: class,
                constructors: Vec::new(),
                methods: FxHashMap::default(),
            },
        );
        Ok(())
    }

    fn add_constructor(
        &mut self,
        class: &str,
        ctor: CallableRegistration,
    ) -> Result<(), ModuleError> {
        self.class_mut(class)?.constructors.push(ctor);
        Ok(())
    }

    fn add_method(
        &mut self,
        class: &str,
        method: CallableRegistration,
    ) -> Result<(), ModuleError> {
        self.class_mut(class)?
            .methods
            .entry(method.name.clone())
            .or_default()
            .push(method);
        Ok(())
    }
}
