//! Bindweave Registry
//!
//! Storage for the concrete instantiations of one generation run.
//!
//! - [`InstantiationGraph`]: arena of [`ConcreteInstantiation`] nodes plus the
//!   memoization table from [`InstanceKey`](bindweave_core::InstanceKey) to node
//! - [`InheritanceDag`]: the base -> derived graph over a finished arena, with
//!   deterministic topological order and depth layers

mod dag;
mod graph;
mod instance;

pub use dag::InheritanceDag;
pub use graph::{Checkpoint, InstantiationGraph};
pub use instance::{ConcreteInstantiation, InstanceId};
