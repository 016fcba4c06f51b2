//! Overload disambiguation.
//!
//! Every exposed member, overloaded or not, is bound through its exact
//! signature so adding an overload later never changes what an existing
//! binding resolves to.
//!
//! Two exposed overloads are ambiguous when some argument count is accepted
//! by both and their erased parameter types agree on that prefix: a dynamic
//! caller passing that many arguments could not pick one.

use bindweave_core::{GenerationError, InstanceKey, Method};
use indexmap::IndexMap;

use super::{ExposedParam, ExposedSurface};

/// Name constructors are grouped under.
const CONSTRUCTOR_GROUP: &str = "__init__";

/// Member-pointer signature: `ret(Short::*)(params) const`, or
/// `ret(*)(params)` for static methods.
pub fn method_signature(short_name: &str, method: &Method, params: &[ExposedParam]) -> String {
    let params = render_params(params);
    if method.is_static() {
        return format!("{}(*)({})", method.return_type, params);
    }
    let constness = if method.is_const() { " const" } else { "" };
    format!(
        "{}({}::*)({}){}",
        method.return_type, short_name, params, constness
    )
}

/// Constructor signature: `Short(params)`.
pub fn constructor_signature(short_name: &str, params: &[ExposedParam]) -> String {
    format!("{}({})", short_name, render_params(params))
}

/// Parameter types as the dynamic runtime sees them.
pub fn erased_signature(params: &[ExposedParam]) -> Vec<String> {
    params.iter().map(|p| p.ty.erased()).collect()
}

/// Reject overload sets a dynamic caller cannot disambiguate.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn check_overloads(
    instance: &InstanceKey,
    surface: &ExposedSurface,
) -> Result<(), GenerationError> {
    let mut groups: IndexMap<&str, Vec<Candidate<'_>>> = IndexMap::new();
    for ctor in &surface.constructors {
        groups
            .entry(CONSTRUCTOR_GROUP)
            .or_default()
            .push(Candidate::new(&ctor.signature, &ctor.params));
    }
    for method in &surface.methods {
        groups
            .entry(method.name.as_str())
            .or_default()
            .push(Candidate::new(&method.signature, &method.params));
    }

    for (name, candidates) in &groups {
        for (i, first) in candidates.iter().enumerate() {
            for second in &candidates[i + 1..] {
                if first.collides_with(second) {
                    return Err(GenerationError::AmbiguousOverload {
                        instance: instance.clone(),
                        name: name.to_string(),
                        first: first.signature.to_string(),
                        second: second.signature.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

struct Candidate<'a> {
    signature: &'a str,
    erased: Vec<String>,
    required: usize,
}

impl<'a> Candidate<'a> {
    fn new(signature: &'a str, params: &[ExposedParam]) -> Self {
        Self {
            signature,
            erased: erased_signature(params),
            required: params.iter().take_while(|p| p.default.is_none()).count(),
        }
    }

    fn max(&self) -> usize {
        self.erased.len()
    }

    fn collides_with(&self, other: &Candidate<'_>) -> bool {
        let low = self.required.max(other.required);
        let high = self.max().min(other.max());
        (low..=high).any(|n| self.erased[..n] == other.erased[..n])
    }
}

fn render_params(params: &[ExposedParam]) -> String {
    params
        .iter()
        .map(|p| p.ty.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exposure::{ExposedConstructor, ExposedMethod, ReturnPolicy};
    use bindweave_core::{DefaultExpr, TypeRef};

    fn param(ty: &str, default: bool) -> ExposedParam {
        ExposedParam {
            name: "p".to_string(),
            ty: TypeRef::parse(ty).unwrap(),
            default: default.then(|| DefaultExpr::Literal("0".into())),
        }
    }

    fn method(name: &str, params: Vec<ExposedParam>) -> ExposedMethod {
        let decl = Method::new(name);
        ExposedMethod {
            signature: method_signature("Mesh_2", &decl, &params),
            name: name.to_string(),
            params,
            return_type: TypeRef::void(),
            is_const: false,
            is_static: false,
            policy: ReturnPolicy::Automatic,
        }
    }

    fn key() -> InstanceKey {
        InstanceKey::with_ints("Mesh", &[2])
    }

    #[test]
    fn renders_member_pointer_signatures() {
        let decl = Method::new("GetIndex")
            .returns(TypeRef::parse("unsigned int").unwrap())
            .const_();
        assert_eq!(
            method_signature("AbstractMesh_2_2", &decl, &[]),
            "unsigned int(AbstractMesh_2_2::*)() const"
        );
        let stat = Method::new("Create").static_();
        assert_eq!(
            method_signature("Mesh_2", &stat, &[param("double", false)]),
            "void(*)(double)"
        );
    }

    #[test]
    fn distinct_erasures_are_fine() {
        let surface = ExposedSurface {
            methods: vec![
                method("Scale", vec![param("double", false)]),
                method("Scale", vec![param("::std::string const &", false)]),
            ],
            ..ExposedSurface::default()
        };
        check_overloads(&key(), &surface).unwrap();
    }

    #[test]
    fn same_erasure_is_ambiguous() {
        let surface = ExposedSurface {
            methods: vec![
                method("SetIndex", vec![param("unsigned int", false)]),
                method("SetIndex", vec![param("long", false)]),
            ],
            ..ExposedSurface::default()
        };
        let err = check_overloads(&key(), &surface).unwrap_err();
        assert_eq!(
            err,
            GenerationError::AmbiguousOverload {
                instance: key(),
                name: "SetIndex".to_string(),
                first: "void(Mesh_2::*)(unsigned int)".to_string(),
                second: "void(Mesh_2::*)(long)".to_string(),
            }
        );
    }

    #[test]
    fn defaults_can_make_arities_overlap() {
        let surface = ExposedSurface {
            methods: vec![
                method("Move", vec![param("double", false)]),
                method("Move", vec![param("float", false), param("int", true)]),
            ],
            ..ExposedSurface::default()
        };
        assert!(check_overloads(&key(), &surface).is_err());

        let surface = ExposedSurface {
            methods: vec![
                method("Move", vec![param("double", false)]),
                method("Move", vec![param("float", false), param("int", false)]),
            ],
            ..ExposedSurface::default()
        };
        check_overloads(&key(), &surface).unwrap();
    }

    #[test]
    fn constructors_form_their_own_set() {
        let ctor = |ty: &str| {
            let params = vec![param(ty, false)];
            ExposedConstructor {
                signature: constructor_signature("Point_3", &params),
                params,
            }
        };
        let surface = ExposedSurface {
            constructors: vec![ctor("double"), ctor("int")],
            methods: vec![method("__init_helper", vec![param("double", false)])],
            ..ExposedSurface::default()
        };
        check_overloads(&key(), &surface).unwrap();

        let surface = ExposedSurface {
            constructors: vec![ctor("int"), ctor("unsigned")],
            ..ExposedSurface::default()
        };
        assert!(matches!(
            check_overloads(&key(), &surface),
            Err(GenerationError::AmbiguousOverload { name, .. }) if name == "__init__"
        ));
    }
}
