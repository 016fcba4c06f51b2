//! Generic parameter substitution.
//!
//! Provides functions to bind a class's generic parameters to concrete
//! arguments and push those arguments through base mappings, signatures and
//! default expressions.

use bindweave_core::{
    BaseArg, BaseSpec, Constructor, DefaultExpr, GenerationError, GenericClass, Indirection,
    InstanceKey, Method, Param, TemplateArg, TypeRef,
};
use rustc_hash::FxHashMap;

/// Map from generic parameter name to concrete argument.
pub type SubstitutionMap = FxHashMap<String, TemplateArg>;

/// Complete a possibly short argument list from parameter defaults.
///
/// A default may refer to an earlier parameter (`B = A`) or be a value.
///
/// # Errors
/// Returns `TemplateArgCountMismatch` if too many arguments are given or a
/// missing trailing slot has no default.
pub fn complete_args(
    class: &GenericClass,
    args: &[TemplateArg],
) -> Result<Vec<TemplateArg>, GenerationError> {
    let mismatch = || GenerationError::TemplateArgCountMismatch {
        instance: InstanceKey::new(class.name.clone(), args.to_vec()),
        class: class.name.clone(),
        expected: class.params.len(),
        got: args.len(),
    };
    if args.len() > class.params.len() {
        return Err(mismatch());
    }

    let mut complete = args.to_vec();
    for param in &class.params[args.len()..] {
        let value = match &param.default {
            Some(BaseArg::Value(value)) => value.clone(),
            Some(BaseArg::Param(name)) => class
                .params
                .iter()
                .position(|p| &p.name == name)
                .and_then(|i| complete.get(i))
                .cloned()
                .ok_or_else(mismatch)?,
            None => return Err(mismatch()),
        };
        complete.push(value);
    }
    Ok(complete)
}

/// Build a substitution map from parameter names and arguments.
///
/// # Errors
/// Returns error if the number of arguments doesn't match parameters.
pub fn build_substitution_map(
    instance: &InstanceKey,
    class: &GenericClass,
) -> Result<SubstitutionMap, GenerationError> {
    if class.params.len() != instance.args.len() {
        return Err(GenerationError::TemplateArgCountMismatch {
            instance: instance.clone(),
            class: class.name.clone(),
            expected: class.params.len(),
            got: instance.args.len(),
        });
    }

    let mut map = FxHashMap::default();
    for (param, arg) in class.params.iter().zip(instance.args.iter()) {
        map.insert(param.name.clone(), arg.clone());
    }
    Ok(map)
}

/// Concrete arguments of a base, from the deriving instance's bindings.
///
/// # Errors
/// Returns `UnresolvedGenericParameter` when the mapping names a parameter
/// that the deriving class does not bind.
pub fn substitute_base_args(
    instance: &InstanceKey,
    base: &BaseSpec,
    subst_map: &SubstitutionMap,
) -> Result<Vec<TemplateArg>, GenerationError> {
    base.args
        .iter()
        .map(|arg| match arg {
            BaseArg::Param(name) => subst_map.get(name).cloned().ok_or_else(|| {
                GenerationError::UnresolvedGenericParameter {
                    instance: instance.clone(),
                    base: base.class.clone(),
                    param: name.clone(),
                }
            }),
            BaseArg::Value(TemplateArg::Type(ty)) => {
                Ok(TemplateArg::Type(substitute_type(ty, subst_map)))
            }
            BaseArg::Value(value) => Ok(value.clone()),
        })
        .collect()
}

/// Substitute generic parameters in a type.
///
/// A bare parameter is replaced by its argument. Modifiers combine:
/// `const` is OR-ed, and the original reference/pointer decoration wins
/// over the replacement's.
pub fn substitute_type(ty: &TypeRef, subst_map: &SubstitutionMap) -> TypeRef {
    if ty.args.is_empty()
        && let Some(replacement) = subst_map.get(&ty.path)
    {
        let replacement = replacement.to_type_ref();
        return TypeRef {
            path: replacement.path,
            args: replacement.args,
            is_const: ty.is_const || replacement.is_const,
            indirection: if ty.indirection == Indirection::None {
                replacement.indirection
            } else {
                ty.indirection
            },
        };
    }
    TypeRef {
        path: ty.path.clone(),
        args: ty.args.iter().map(|a| substitute_type(a, subst_map)).collect(),
        is_const: ty.is_const,
        indirection: ty.indirection,
    }
}

/// Substitute generic parameters in a default expression.
///
/// Types are substituted structurally; expression text has whole
/// identifiers replaced, so `DIM - 1` becomes `3 - 1`.
pub fn substitute_default(expr: &DefaultExpr, subst_map: &SubstitutionMap) -> DefaultExpr {
    match expr {
        DefaultExpr::Literal(text) => DefaultExpr::Literal(substitute_text(text, subst_map)),
        DefaultExpr::Expr(text) => DefaultExpr::Expr(substitute_text(text, subst_map)),
        DefaultExpr::Construct(ty) => DefaultExpr::Construct(substitute_type(ty, subst_map)),
        DefaultExpr::MakeShared(ty) => DefaultExpr::MakeShared(substitute_type(ty, subst_map)),
    }
}

/// Substitute generic parameters in function parameters.
pub fn substitute_params(params: &[Param], subst_map: &SubstitutionMap) -> Vec<Param> {
    params
        .iter()
        .map(|p| Param {
            name: p.name.clone(),
            ty: substitute_type(&p.ty, subst_map),
            default: p.default.as_ref().map(|d| substitute_default(d, subst_map)),
        })
        .collect()
}

/// Substitute generic parameters throughout a method signature.
pub fn substitute_method(method: &Method, subst_map: &SubstitutionMap) -> Method {
    Method {
        name: method.name.clone(),
        params: substitute_params(&method.params, subst_map),
        return_type: substitute_type(&method.return_type, subst_map),
        virtuality: method.virtuality,
        flags: method.flags,
    }
}

/// Substitute generic parameters in a constructor.
pub fn substitute_constructor(ctor: &Constructor, subst_map: &SubstitutionMap) -> Constructor {
    Constructor {
        params: substitute_params(&ctor.params, subst_map),
        flags: ctor.flags,
    }
}

fn substitute_text(text: &str, subst_map: &SubstitutionMap) -> String {
    if subst_map.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut ident = String::new();
    let mut in_string = false;
    for ch in text.chars() {
        if !in_string && (ch.is_ascii_alphanumeric() || ch == '_') {
            ident.push(ch);
            continue;
        }
        flush_ident(&mut out, &mut ident, subst_map);
        if ch == '"' {
            in_string = !in_string;
        }
        out.push(ch);
    }
    flush_ident(&mut out, &mut ident, subst_map);
    out
}

fn flush_ident(out: &mut String, ident: &mut String, subst_map: &SubstitutionMap) {
    if ident.is_empty() {
        return;
    }
    match subst_map.get(ident.as_str()) {
        Some(arg) => out.push_str(&arg.to_string()),
        None => out.push_str(ident),
    }
    ident.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindweave_core::GenericParam;

    fn mesh() -> GenericClass {
        GenericClass::new("AbstractMesh")
            .with_param(GenericParam::new("ELEMENT_DIM"))
            .with_param(GenericParam::with_default(
                "SPACE_DIM",
                BaseArg::param("ELEMENT_DIM"),
            ))
    }

    fn map(pairs: &[(&str, i64)]) -> SubstitutionMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), TemplateArg::Int(*v)))
            .collect()
    }

    #[test]
    fn complete_args_uses_defaults() {
        let args = complete_args(&mesh(), &[TemplateArg::Int(3)]).unwrap();
        assert_eq!(args, vec![TemplateArg::Int(3), TemplateArg::Int(3)]);
    }

    #[test]
    fn complete_args_count_mismatch_too_many() {
        let result = complete_args(
            &mesh(),
            &[TemplateArg::Int(1), TemplateArg::Int(2), TemplateArg::Int(3)],
        );
        match result.unwrap_err() {
            GenerationError::TemplateArgCountMismatch { expected, got, .. } => {
                assert_eq!(expected, 2);
                assert_eq!(got, 3);
            }
            e => panic!("Expected TemplateArgCountMismatch, got {:?}", e),
        }
    }

    #[test]
    fn complete_args_count_mismatch_no_default() {
        let result = complete_args(&mesh(), &[]);
        assert!(matches!(
            result,
            Err(GenerationError::TemplateArgCountMismatch { got: 0, .. })
        ));
    }

    #[test]
    fn build_map_binds_names() {
        let key = InstanceKey::with_ints("AbstractMesh", &[2, 3]);
        let map = build_substitution_map(&key, &mesh()).unwrap();
        assert_eq!(map.get("SPACE_DIM"), Some(&TemplateArg::Int(3)));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn base_args_reject_unbound_parameter() {
        let key = InstanceKey::with_ints("PottsMesh", &[3]);
        let base = BaseSpec::new(
            "AbstractMesh",
            vec![BaseArg::param("DIM"), BaseArg::param("SPACE")],
        );
        let err = substitute_base_args(&key, &base, &map(&[("DIM", 3)])).unwrap_err();
        assert_eq!(
            err,
            GenerationError::UnresolvedGenericParameter {
                instance: key,
                base: "AbstractMesh".to_string(),
                param: "SPACE".to_string(),
            }
        );
    }

    #[test]
    fn substitute_type_preserves_modifiers() {
        let ty = TypeRef::parse("::std::vector<std::shared_ptr<Point<DIM>>> const &").unwrap();
        let result = substitute_type(&ty, &map(&[("DIM", 3)]));
        assert_eq!(
            result.to_string(),
            "::std::vector<std::shared_ptr<Point<3>>> const &"
        );
    }

    #[test]
    fn substitute_type_parameter_as_type() {
        let mut subst = SubstitutionMap::default();
        subst.insert("T".to_string(), TemplateArg::Type(TypeRef::named("double")));
        let ty = TypeRef::parse("T const &").unwrap();
        assert_eq!(substitute_type(&ty, &subst).to_string(), "double const &");
    }

    #[test]
    fn substitute_default_text_and_types() {
        let subst = map(&[("DIM", 2)]);
        assert_eq!(
            substitute_default(&DefaultExpr::Expr("DIM - 1".into()), &subst),
            DefaultExpr::Expr("2 - 1".into())
        );
        assert_eq!(
            substitute_default(&DefaultExpr::Literal("\"DIM\"".into()), &subst),
            DefaultExpr::Literal("\"DIM\"".into())
        );
        assert_eq!(
            substitute_default(
                &DefaultExpr::MakeShared(TypeRef::parse("Point<DIM>").unwrap()),
                &subst
            )
            .render(),
            "std::make_shared<Point<2>>()"
        );
    }
}
