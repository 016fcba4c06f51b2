//! The generation pipeline.
//!
//! ```text
//! requests ──► Resolver ──► InheritanceDag ──► per-layer node work ──► Scheduler ──► emission
//!                                              (ownership, shim, exposure)
//! ```
//!
//! Node work is split by DAG depth. Every node in a layer only reads the
//! finished results of earlier layers, so a layer's nodes are processed on
//! scoped worker threads and the end of the scope is the barrier before the
//! next layer starts. Scheduling and emission run on the calling thread.
//!
//! Any generation error aborts the run; all errors found up to that point
//! are returned together in a [`GenerationFailure`].

use std::thread;

use bindweave_core::{
    DeclarationModel, GenerationError, GenericClass, InstanceKey, ModuleError, ModuleHandle,
};
use bindweave_registry::{InheritanceDag, InstanceId, InstantiationGraph};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::GeneratorConfig;
use crate::emit::{BaseRef, BindingUnit, HeaderCollection, ModuleAssembly};
use crate::exposure::{self, ExposedSurface};
use crate::ownership::{Ownership, OwnershipAssigner};
use crate::resolver::Resolver;
use crate::scheduler::{self, Schedule};
use crate::shim::{ShimPlan, synthesize_shim};
use crate::substitution::build_substitution_map;

/// Every error a failed run produced.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("generation failed with {} error(s): {}", errors.len(), summarize(errors))]
pub struct GenerationFailure {
    /// Errors in discovery order.
    pub errors: Vec<GenerationError>,
}

impl GenerationFailure {
    fn new(errors: Vec<GenerationError>) -> Self {
        Self { errors }
    }

    /// Identities of the offending instances.
    pub fn instances(&self) -> Vec<&InstanceKey> {
        self.errors.iter().map(GenerationError::instance).collect()
    }
}

impl From<GenerationError> for GenerationFailure {
    fn from(err: GenerationError) -> Self {
        Self::new(vec![err])
    }
}

fn summarize(errors: &[GenerationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Output of a successful run.
#[derive(Debug, Clone)]
pub struct GeneratedBindings {
    /// Binding units in registration order.
    pub units: Vec<BindingUnit>,
    /// Master assembly artifact.
    pub assembly: ModuleAssembly,
    /// Header collection.
    pub headers: HeaderCollection,
    /// Registration order and layers.
    pub schedule: Schedule,
    /// The resolved instantiation graph.
    pub graph: InstantiationGraph,
}

impl GeneratedBindings {
    /// Look up a unit by short name.
    pub fn unit(&self, short_name: &str) -> Option<&BindingUnit> {
        self.units.iter().find(|u| u.short_name == short_name)
    }

    /// Look up a unit by identity.
    pub fn unit_for(&self, key: &InstanceKey) -> Option<&BindingUnit> {
        self.units.iter().find(|u| &u.key == key)
    }

    /// Short names in registration order.
    pub fn short_names(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.short_name.as_str()).collect()
    }

    /// Register every unit on a module handle in order.
    pub fn register_all(&self, module: &mut dyn ModuleHandle) -> Result<(), ModuleError> {
        self.assembly.register(&self.units, module)
    }
}

/// Per-node result of the parallel phase.
#[derive(Debug)]
struct NodeOutput {
    ownership: Ownership,
    shim: ShimPlan,
    surface: ExposedSurface,
}

/// Shared, read-only inputs of one layer.
struct LayerContext<'a> {
    model: &'a DeclarationModel,
    config: &'a GeneratorConfig,
    graph: &'a InstantiationGraph,
    short_names: &'a [String],
    assigner: OwnershipAssigner<'a>,
}

impl LayerContext<'_> {
    /// Shim synthesis never fails, so a plan is returned even when ownership
    /// or exposure reports an error. Derived nodes in later layers need it.
    fn process(
        &self,
        id: InstanceId,
        plans: &[Option<ShimPlan>],
    ) -> (ShimPlan, Result<(Ownership, ExposedSurface), GenerationError>) {
        let node = &self.graph[id];
        let class = match self.class(&node.key) {
            Ok(class) => class,
            Err(err) => return (ShimPlan::default(), Err(err)),
        };
        let subst_map = match build_substitution_map(&node.key, class) {
            Ok(map) => map,
            Err(err) => return (ShimPlan::default(), Err(err)),
        };
        let short_name = &self.short_names[id.index()];

        let base_plans: Vec<&ShimPlan> = node
            .bases
            .iter()
            .filter_map(|b| plans[b.index()].as_ref())
            .collect();
        let shim = synthesize_shim(node, class, short_name, &subst_map, &base_plans);

        let rest = self.assigner.assign(id).and_then(|ownership| {
            let surface = exposure::expose(node, class, short_name, &subst_map, self.config)?;
            Ok((ownership, surface))
        });
        (shim, rest)
    }

    fn class(&self, key: &InstanceKey) -> Result<&GenericClass, GenerationError> {
        self.model
            .get(&key.class)
            .ok_or_else(|| GenerationError::UnknownClass {
                name: key.class.clone(),
                required_by: key.clone(),
            })
    }
}

/// Drives one generation run.
pub struct Generator<'a> {
    model: &'a DeclarationModel,
    config: &'a GeneratorConfig,
}

impl<'a> Generator<'a> {
    /// Create a generator over a declaration model.
    pub fn new(model: &'a DeclarationModel, config: &'a GeneratorConfig) -> Self {
        Self { model, config }
    }

    /// Generate bindings for the configured `[[instantiate]]` entries.
    pub fn run(&self) -> Result<GeneratedBindings, GenerationFailure> {
        self.run_requests(&self.config.requests())
    }

    /// Generate bindings for an explicit request list.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run_requests(
        &self,
        requests: &[InstanceKey],
    ) -> Result<GeneratedBindings, GenerationFailure> {
        tracing::info!(
            requests = requests.len(),
            workers = self.config.worker_count(),
            "generation started"
        );

        let mut resolver = Resolver::new(self.model);
        for (name, class) in &self.config.classes {
            if class.excluded {
                resolver = resolver.exclude_class(name.clone());
            }
        }
        let resolution = resolver
            .resolve_all(requests)
            .map_err(GenerationFailure::new)?;
        let graph = resolution.graph;
        let dag = InheritanceDag::from_graph(&graph);

        let short_names = self.short_names(&graph)?;
        let layers = dag.layers()?;
        let outputs = self.process_layers(&graph, &dag, &short_names, &layers)?;
        let schedule = scheduler::schedule(&dag)?;

        let units = self.build_units(&graph, &dag, &schedule, &short_names, outputs);
        let assembly = ModuleAssembly::new(&self.config.package, &self.config.module, &units);
        let headers = HeaderCollection::new(&self.config.package, &units);

        tracing::info!(units = units.len(), "generation finished");
        Ok(GeneratedBindings {
            units,
            assembly,
            headers,
            schedule,
            graph,
        })
    }

    fn short_names(&self, graph: &InstantiationGraph) -> Result<Vec<String>, GenerationError> {
        let mut seen: FxHashMap<String, InstanceId> = FxHashMap::default();
        let mut names = Vec::with_capacity(graph.len());
        for node in graph.iter() {
            let name = node.key.short_name(&self.config.name_rules(&node.key.class));
            if let Some(first) = seen.get(&name) {
                return Err(GenerationError::NameCollision {
                    name,
                    first: graph[*first].key.clone(),
                    second: node.key.clone(),
                });
            }
            seen.insert(name.clone(), node.id);
            names.push(name);
        }
        Ok(names)
    }

    fn process_layers(
        &self,
        graph: &InstantiationGraph,
        dag: &InheritanceDag,
        short_names: &[String],
        layers: &[Vec<InstanceId>],
    ) -> Result<Vec<Option<NodeOutput>>, GenerationFailure> {
        let ctx = LayerContext {
            model: self.model,
            config: self.config,
            graph,
            short_names,
            assigner: OwnershipAssigner::new(self.model, self.config, graph, dag),
        };
        let workers = self.config.worker_count();
        let mut plans: Vec<Option<ShimPlan>> = vec![None; graph.len()];
        let mut results: Vec<Option<(Ownership, ExposedSurface)>> = vec![None; graph.len()];
        let mut errors: Vec<(InstanceId, GenerationError)> = Vec::new();

        for (depth, layer) in layers.iter().enumerate() {
            tracing::debug!(depth, nodes = layer.len(), "processing layer");
            let finished = run_layer(&ctx, layer, &plans, workers);
            for (id, shim, rest) in finished {
                plans[id.index()] = Some(shim);
                match rest {
                    Ok(done) => results[id.index()] = Some(done),
                    Err(err) => errors.push((id, err)),
                }
            }
        }

        if !errors.is_empty() {
            errors.sort_by_key(|(id, _)| *id);
            return Err(GenerationFailure::new(
                errors.into_iter().map(|(_, err)| err).collect(),
            ));
        }

        Ok(plans
            .into_iter()
            .zip(results)
            .map(|(plan, result)| {
                let shim = plan?;
                let (ownership, surface) = result?;
                Some(NodeOutput {
                    ownership,
                    shim,
                    surface,
                })
            })
            .collect())
    }

    fn build_units(
        &self,
        graph: &InstantiationGraph,
        dag: &InheritanceDag,
        schedule: &Schedule,
        short_names: &[String],
        mut outputs: Vec<Option<NodeOutput>>,
    ) -> Vec<BindingUnit> {
        let mut units = Vec::with_capacity(schedule.order.len());
        for &id in &schedule.order {
            let Some(output) = outputs.get_mut(id.index()).and_then(Option::take) else {
                continue;
            };
            let node = &graph[id];
            let bases = node
                .bases
                .iter()
                .map(|b| BaseRef {
                    short_name: short_names[b.index()].clone(),
                    native_name: graph[*b].key.native_name(),
                })
                .collect();
            let polymorphic = !output.shim.is_empty();
            tracing::trace!(
                instance = %node.key,
                polymorphic,
                bases = dag.bases(id).len(),
                "binding unit built"
            );
            units.push(BindingUnit {
                id,
                key: node.key.clone(),
                short_name: short_names[id.index()].clone(),
                native_name: node.key.native_name(),
                source_file: self
                    .model
                    .get(&node.key.class)
                    .and_then(|c| c.source_file.clone()),
                ownership: output.ownership.model,
                bases,
                shim: polymorphic.then_some(output.shim),
                surface: output.surface,
            });
        }
        units
    }
}

type LayerResult = (
    InstanceId,
    ShimPlan,
    Result<(Ownership, ExposedSurface), GenerationError>,
);

#[cfg_attr(feature = "profiling", profiling::function)]
fn run_layer(
    ctx: &LayerContext<'_>,
    layer: &[InstanceId],
    plans: &[Option<ShimPlan>],
    workers: usize,
) -> Vec<LayerResult> {
    let process = |id: &InstanceId| {
        let (shim, rest) = ctx.process(*id, plans);
        (*id, shim, rest)
    };
    if workers <= 1 || layer.len() <= 1 {
        return layer.iter().map(process).collect();
    }

    let chunk = layer.len().div_ceil(workers);
    thread::scope(|s| {
        let handles: Vec<_> = layer
            .chunks(chunk)
            .map(|ids| s.spawn(move || ids.iter().map(process).collect::<Vec<_>>()))
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    })
}
