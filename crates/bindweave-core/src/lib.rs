//! Bindweave Core
//!
//! Shared data types for the bindweave binding generator: the declaration
//! model the front-end hands over, instance identity, error types and the
//! runtime contract generated bindings follow.
//!
//! ## Modules
//!
//! - [`decl`]: Declaration model (generic classes, members, default expressions)
//! - [`error`]: Generation, module and dispatch errors
//! - [`runtime`]: Dynamic values, override dispatch and module handles
//!
//! Identity types ([`InstanceKey`], [`IdentityHash`], [`TemplateArg`]) and
//! [`TypeRef`] live at the crate root.

pub mod decl;
pub mod error;
mod identity_hash;
mod instance_key;
mod ownership;
pub mod runtime;
mod template_arg;
mod type_ref;

pub use decl::{
    BaseArg, BaseSpec, Constructor, DeclarationModel, DefaultExpr, Field, GenericClass,
    GenericParam, MemberFlags, Method, Param, Virtuality,
};
pub use error::{BindError, DispatchError, GenerationError, ModuleError};
pub use identity_hash::IdentityHash;
pub use instance_key::{InstanceKey, NameRules};
pub use ownership::OwnershipModel;
pub use runtime::{
    BoundParam, CallableRegistration, ClassRegistration, Dynamic, HostModule, ModuleHandle,
    NativeFn, ShimKind, ShimRegistration,
};
pub use template_arg::TemplateArg;
pub use type_ref::{Indirection, TypeParseError, TypeRef};
