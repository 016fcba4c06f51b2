//! Instantiation Resolver.
//!
//! Turns requested `(class, arguments)` pairs into a closed instantiation
//! graph: every declared base is substituted and resolved recursively,
//! reusing any node the memo table already holds.
//!
//! A request either succeeds completely or leaves the graph exactly as it
//! found it. Cycles are caught with an explicit stack of keys currently
//! being resolved; the stack is checked before the memo table, because a
//! node in the middle of resolution is already memoized.

use bindweave_core::{DeclarationModel, GenerationError, GenericClass, InstanceKey};
use bindweave_registry::{InstanceId, InstantiationGraph};
use rustc_hash::FxHashSet;

use crate::substitution::{build_substitution_map, complete_args, substitute_base_args};

/// The closed result of resolving a set of requests.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Every instantiation, requested or pulled in as a base.
    pub graph: InstantiationGraph,
    /// Nodes that were requested directly, in request order, deduplicated.
    pub requested: Vec<InstanceId>,
}

/// Resolves instantiation requests against a declaration model.
pub struct Resolver<'a> {
    model: &'a DeclarationModel,
    excluded: FxHashSet<String>,
    graph: InstantiationGraph,
    requested: Vec<InstanceId>,
    stack: Vec<InstanceKey>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver with an empty memo table.
    pub fn new(model: &'a DeclarationModel) -> Self {
        Self {
            model,
            excluded: FxHashSet::default(),
            graph: InstantiationGraph::new(),
            requested: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// Treat a class as excluded in addition to declaration-level flags.
    pub fn exclude_class(mut self, name: impl Into<String>) -> Self {
        self.excluded.insert(name.into());
        self
    }

    /// Resolve every request, collecting all failures.
    ///
    /// Failed requests are rolled back individually, so the errors list one
    /// entry per offending request.
    pub fn resolve_all(mut self, requests: &[InstanceKey]) -> Result<Resolution, Vec<GenerationError>> {
        let mut errors = Vec::new();
        for key in requests {
            if let Err(err) = self.request(key) {
                errors.push(err);
            }
        }
        if errors.is_empty() {
            Ok(self.finish())
        } else {
            Err(errors)
        }
    }

    /// Resolve one request.
    ///
    /// Returns `None` when the class is excluded, which is skipped rather
    /// than treated as an error.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn request(&mut self, key: &InstanceKey) -> Result<Option<InstanceId>, GenerationError> {
        if self.is_excluded(&key.class) {
            tracing::warn!(instance = %key, "skipping request for excluded class");
            return Ok(None);
        }

        let checkpoint = self.graph.checkpoint();
        match self.resolve(key, None) {
            Ok(id) => {
                if !self.requested.contains(&id) {
                    self.requested.push(id);
                }
                Ok(Some(id))
            }
            Err(err) => {
                tracing::debug!(instance = %key, error = %err, "request rolled back");
                self.graph.rollback(checkpoint);
                self.stack.clear();
                Err(err)
            }
        }
    }

    /// Finish resolution and hand over the graph.
    pub fn finish(self) -> Resolution {
        tracing::debug!(
            instances = self.graph.len(),
            requested = self.requested.len(),
            "resolution complete"
        );
        Resolution {
            graph: self.graph,
            requested: self.requested,
        }
    }

    fn resolve(
        &mut self,
        key: &InstanceKey,
        required_by: Option<&InstanceKey>,
    ) -> Result<InstanceId, GenerationError> {
        let class = self.class(key, required_by)?;
        let full = InstanceKey::new(key.class.clone(), complete_args(class, &key.args)?);

        if let Some(pos) = self.stack.iter().position(|k| k == &full) {
            let mut cycle = self.stack[pos..].to_vec();
            cycle.push(full.clone());
            return Err(GenerationError::CyclicInheritance {
                instance: full,
                cycle,
            });
        }
        if let Some(id) = self.graph.lookup(&full) {
            return Ok(id);
        }

        let subst_map = build_substitution_map(&full, class)?;
        let bindings = class
            .params
            .iter()
            .filter_map(|p| subst_map.get(&p.name).map(|a| (p.name.clone(), a.clone())))
            .collect();
        let id = self.graph.insert(full.clone(), bindings)?;

        self.stack.push(full.clone());
        let mut bases = Vec::with_capacity(class.bases.len());
        for base in &class.bases {
            let base_key =
                InstanceKey::new(base.class.clone(), substitute_base_args(&full, base, &subst_map)?);
            bases.push(self.resolve(&base_key, Some(&full))?);
        }
        self.stack.pop();

        self.graph.set_bases(id, bases);
        Ok(id)
    }

    fn class(
        &self,
        key: &InstanceKey,
        required_by: Option<&InstanceKey>,
    ) -> Result<&'a GenericClass, GenerationError> {
        self.model
            .get(&key.class)
            .filter(|_| !self.is_excluded(&key.class))
            .ok_or_else(|| GenerationError::UnknownClass {
                name: key.class.clone(),
                required_by: required_by.unwrap_or(key).clone(),
            })
    }

    fn is_excluded(&self, class: &str) -> bool {
        self.excluded.contains(class) || self.model.get(class).is_some_and(|c| c.excluded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindweave_core::{BaseArg, BaseSpec, GenericParam};

    fn meshes() -> DeclarationModel {
        DeclarationModel::from_classes([
            GenericClass::new("AbstractMesh")
                .with_param(GenericParam::new("ELEMENT_DIM"))
                .with_param(GenericParam::new("SPACE_DIM")),
            GenericClass::new("PottsMesh")
                .with_param(GenericParam::new("DIM"))
                .with_base(BaseSpec::new(
                    "AbstractMesh",
                    vec![BaseArg::param("DIM"), BaseArg::param("DIM")],
                )),
        ])
    }

    #[test]
    fn base_is_pulled_in() {
        let model = meshes();
        let resolution = Resolver::new(&model)
            .resolve_all(&[InstanceKey::with_ints("PottsMesh", &[3])])
            .unwrap();
        let graph = &resolution.graph;
        assert_eq!(graph.len(), 2);
        let potts = graph.lookup(&InstanceKey::with_ints("PottsMesh", &[3])).unwrap();
        let mesh = graph
            .lookup(&InstanceKey::with_ints("AbstractMesh", &[3, 3]))
            .unwrap();
        assert_eq!(graph[potts].bases, vec![mesh]);
        assert_eq!(resolution.requested, vec![potts]);
    }

    #[test]
    fn repeated_requests_share_nodes() {
        let model = meshes();
        let mut resolver = Resolver::new(&model);
        let mesh = resolver
            .request(&InstanceKey::with_ints("AbstractMesh", &[3, 3]))
            .unwrap();
        let potts = resolver
            .request(&InstanceKey::with_ints("PottsMesh", &[3]))
            .unwrap()
            .unwrap();
        let again = resolver
            .request(&InstanceKey::with_ints("AbstractMesh", &[3, 3]))
            .unwrap();
        let resolution = resolver.finish();
        assert_eq!(mesh, again);
        assert_eq!(resolution.graph.len(), 2);
        assert_eq!(resolution.graph[potts].bases, vec![mesh.unwrap()]);
        assert_eq!(resolution.requested.len(), 2);
    }

    #[test]
    fn defaults_complete_short_requests() {
        let model = DeclarationModel::from_classes([GenericClass::new("Foo")
            .with_param(GenericParam::new("A"))
            .with_param(GenericParam::with_default("B", BaseArg::param("A")))]);
        let mut resolver = Resolver::new(&model);
        let short = resolver.request(&InstanceKey::with_ints("Foo", &[2])).unwrap();
        let full = resolver.request(&InstanceKey::with_ints("Foo", &[2, 2])).unwrap();
        assert_eq!(short, full);
    }

    #[test]
    fn cycle_is_rejected_and_rolled_back() {
        let model = DeclarationModel::from_classes([
            GenericClass::new("A")
                .with_param(GenericParam::new("N"))
                .with_base(BaseSpec::new("B", vec![BaseArg::param("N")])),
            GenericClass::new("B")
                .with_param(GenericParam::new("N"))
                .with_base(BaseSpec::new("A", vec![BaseArg::param("N")])),
        ]);
        let mut resolver = Resolver::new(&model);
        let err = resolver.request(&InstanceKey::with_ints("A", &[2])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "A<2>: cyclic inheritance: A<2> -> B<2> -> A<2>"
        );
        assert!(resolver.finish().graph.is_empty());
    }

    #[test]
    fn unbound_base_parameter_is_rejected() {
        let model = DeclarationModel::from_classes([
            GenericClass::new("AbstractMesh")
                .with_param(GenericParam::new("E"))
                .with_param(GenericParam::new("S")),
            GenericClass::new("PottsMesh")
                .with_param(GenericParam::new("DIM"))
                .with_base(BaseSpec::new(
                    "AbstractMesh",
                    vec![BaseArg::param("DIM"), BaseArg::param("SPACE_DIM")],
                )),
        ]);
        let errors = Resolver::new(&model)
            .resolve_all(&[InstanceKey::with_ints("PottsMesh", &[3])])
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            GenerationError::UnresolvedGenericParameter { param, .. } if param == "SPACE_DIM"
        ));
        assert_eq!(errors[0].instance(), &InstanceKey::with_ints("PottsMesh", &[3]));
    }

    #[test]
    fn failed_request_keeps_earlier_nodes() {
        let model = DeclarationModel::from_classes([
            GenericClass::new("Shape").with_param(GenericParam::new("DIM")),
            GenericClass::new("Rectangle").with_base(BaseSpec::new("Polygon", vec![])),
        ]);
        let mut resolver = Resolver::new(&model);
        resolver.request(&InstanceKey::with_ints("Shape", &[2])).unwrap();
        let err = resolver.request(&InstanceKey::plain("Rectangle")).unwrap_err();
        assert_eq!(
            err,
            GenerationError::UnknownClass {
                name: "Polygon".to_string(),
                required_by: InstanceKey::plain("Rectangle"),
            }
        );
        let resolution = resolver.finish();
        assert_eq!(resolution.graph.len(), 1);
        assert!(resolution.graph.lookup(&InstanceKey::plain("Rectangle")).is_none());
    }

    #[test]
    fn excluded_request_is_skipped_but_excluded_base_fails() {
        let model = DeclarationModel::from_classes([
            GenericClass::new("Shape"),
            GenericClass::new("Rectangle").with_base(BaseSpec::plain("Shape")),
        ]);
        let mut resolver = Resolver::new(&model).exclude_class("Shape");
        assert_eq!(resolver.request(&InstanceKey::plain("Shape")).unwrap(), None);
        assert!(matches!(
            resolver.request(&InstanceKey::plain("Rectangle")),
            Err(GenerationError::UnknownClass { .. })
        ));
    }
}
