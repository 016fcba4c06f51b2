//! Member filtering.
//!
//! A member is dropped when its declaration carries the exclusion flag or
//! when a config rule matches it. Type rules match on the substituted
//! types. Everything else is kept in declaration order.

use bindweave_core::{Constructor, GenericClass, Method, Param};

use super::{
    ExposedConstructor, ExposedField, ExposedMethod, ExposedParam, ExposedSurface, ReturnPolicy,
};
use crate::GeneratorConfig;
use crate::exposure::overload::{constructor_signature, method_signature};
use crate::substitution::{
    SubstitutionMap, substitute_constructor, substitute_method, substitute_type,
};

/// Filter and substitute the members `class` declares.
pub fn filter_members(
    class: &GenericClass,
    short_name: &str,
    subst_map: &SubstitutionMap,
    config: &GeneratorConfig,
) -> ExposedSurface {
    let constructors = class
        .constructors
        .iter()
        .filter(|c| !c.is_excluded())
        .map(|c| substitute_constructor(c, subst_map))
        .filter(|c| keep_constructor(c, &class.name, config))
        .map(|c| {
            let params = expose_params(&c.params, config);
            ExposedConstructor {
                signature: constructor_signature(short_name, &params),
                params,
            }
        })
        .collect();

    let methods = class
        .methods
        .iter()
        .filter(|m| !m.is_excluded() && !config.is_method_excluded(&class.name, &m.name))
        .map(|m| substitute_method(m, subst_map))
        .filter(|m| keep_method(m, &class.name, config))
        .map(|m| {
            let params = expose_params(&m.params, config);
            ExposedMethod {
                signature: method_signature(short_name, &m, &params),
                policy: config.return_policy(&class.name, &m.return_type),
                is_const: m.is_const(),
                is_static: m.is_static(),
                name: m.name,
                params,
                return_type: m.return_type,
            }
        })
        .collect();

    let fields = class
        .fields
        .iter()
        .filter(|f| !f.excluded && !config.is_variable_excluded(&class.name, &f.name))
        .map(|f| ExposedField {
            name: f.name.clone(),
            ty: substitute_type(&f.ty, subst_map),
            readonly: f.readonly,
        })
        .collect();

    ExposedSurface {
        constructors,
        methods,
        fields,
    }
}

fn param_types(params: &[Param]) -> Vec<String> {
    params.iter().map(|p| p.ty.to_string()).collect()
}

fn keep_constructor(ctor: &Constructor, class: &str, config: &GeneratorConfig) -> bool {
    let types = param_types(&ctor.params);
    let arg_excluded = types.iter().any(|ty| {
        config
            .constructor_arg_type_excludes
            .iter()
            .any(|ex| ty.contains(ex.as_str()))
    });
    let signature_excluded = config
        .constructor_signature_excludes
        .iter()
        .any(|sig| *sig == types);
    !(arg_excluded || signature_excluded || config.excludes_call(class, &types))
}

fn keep_method(method: &Method, class: &str, config: &GeneratorConfig) -> bool {
    let ret = method.return_type.to_string();
    let ret_excluded = config
        .return_type_excludes
        .iter()
        .any(|ex| ret.contains(ex.as_str()));
    !(ret_excluded || config.excludes_call(class, &param_types(&method.params)))
}

fn expose_params(params: &[Param], config: &GeneratorConfig) -> Vec<ExposedParam> {
    params
        .iter()
        .map(|p| ExposedParam {
            name: p.name.clone(),
            ty: p.ty.clone(),
            default: if config.exclude_default_args {
                None
            } else {
                p.default.clone()
            },
        })
        .collect()
}
