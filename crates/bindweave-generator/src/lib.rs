//! Bindweave Generator
//!
//! Turns a declaration model and a set of requested instantiations into
//! binding units for a dynamic runtime.
//!
//! ## Architecture
//!
//! - **Resolution**: close the requested set over inheritance, one node per
//!   `(class, arguments)` identity
//! - **Node work** (parallel per DAG layer): ownership, override shims and
//!   the exposed member surface
//! - **Scheduling**: bases before derived, ties broken by creation order
//! - **Emission**: binding units, module assembly and header collection
//!
//! ## Modules
//!
//! - [`config`]: TOML configuration and declaration loading
//! - [`emit`]: Binding units and the assembly artifacts
//! - [`exposure`]: Member filtering and overload disambiguation
//! - [`ownership`]: Ownership model assignment per hierarchy
//! - [`pipeline`]: The end-to-end [`Generator`]
//! - [`resolver`]: Instantiation resolution with memoization
//! - [`scheduler`]: Registration order
//! - [`shim`]: Override shim synthesis
//! - [`substitution`]: Generic parameter substitution

pub mod config;
pub mod emit;
pub mod exposure;
pub mod ownership;
pub mod pipeline;
pub mod resolver;
pub mod scheduler;
pub mod shim;
pub mod substitution;

pub use config::{ClassConfig, ConfigError, GeneratorConfig, InstantiateEntry, load_declarations};
pub use emit::{BaseRef, BindingUnit, HeaderCollection, ModuleAssembly};
pub use exposure::{ExposedSurface, ReturnPolicy};
pub use ownership::{Ownership, OwnershipAssigner};
pub use pipeline::{GeneratedBindings, GenerationFailure, Generator};
pub use resolver::{Resolution, Resolver};
pub use scheduler::{Schedule, schedule};
pub use shim::{ShimMethod, ShimPlan, synthesize_shim};
