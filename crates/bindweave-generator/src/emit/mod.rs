//! Emission of binding artifacts.
//!
//! - [`BindingUnit`]: one per instantiation, with a registration entry point
//!   and, for polymorphic instantiations, an override shim type
//! - [`ModuleAssembly`]: calls every entry point in registration order
//! - [`HeaderCollection`]: explicit instantiations and naming typedefs

mod header;
mod module;
mod unit;

pub use header::HeaderCollection;
pub use module::ModuleAssembly;
pub use unit::{BaseRef, BindingUnit};
