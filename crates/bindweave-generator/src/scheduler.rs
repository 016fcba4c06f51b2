//! Registration Scheduler.
//!
//! Orders instantiations so every base is registered before anything that
//! derives from it. Independent nodes keep creation order, which makes the
//! output a pure function of the requests. The computed order is checked
//! against the DAG before it is returned.

use bindweave_core::GenerationError;
use bindweave_registry::{InheritanceDag, InstanceId};

/// The registration order of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Total order, bases first.
    pub order: Vec<InstanceId>,
    /// Depth layers; per-node work in one layer may run in parallel.
    pub layers: Vec<Vec<InstanceId>>,
}

impl Schedule {
    /// Position of an instantiation in the order.
    pub fn position(&self, id: InstanceId) -> Option<usize> {
        self.order.iter().position(|x| *x == id)
    }
}

/// Compute and verify the registration order.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn schedule(dag: &InheritanceDag) -> Result<Schedule, GenerationError> {
    let order = dag.topological_order()?;
    dag.verify_order(&order)?;
    let layers = dag.layers()?;
    tracing::debug!(
        instances = order.len(),
        layers = layers.len(),
        "registration order computed"
    );
    Ok(Schedule { order, layers })
}
