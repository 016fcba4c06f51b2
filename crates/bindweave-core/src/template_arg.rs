//! Concrete template arguments.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::TypeRef;

/// A concrete argument bound to one generic parameter slot.
///
/// Integral values (`AbstractMesh<2, 2>`) and types (`Foo<double>`) are the
/// two kinds native templates are instantiated with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateArg {
    /// Integral constant.
    Int(i64),
    /// Type argument.
    Type(TypeRef),
}

impl TemplateArg {
    /// Create a type argument from a parsed type.
    pub fn ty(ty: TypeRef) -> Self {
        TemplateArg::Type(ty)
    }

    /// The argument as a type tree, for substitution into signatures.
    pub fn to_type_ref(&self) -> TypeRef {
        match self {
            TemplateArg::Int(value) => TypeRef::named(value.to_string()),
            TemplateArg::Type(ty) => ty.clone(),
        }
    }
}

impl From<i64> for TemplateArg {
    fn from(value: i64) -> Self {
        TemplateArg::Int(value)
    }
}

impl From<TypeRef> for TemplateArg {
    fn from(value: TypeRef) -> Self {
        TemplateArg::Type(value)
    }
}

impl fmt::Display for TemplateArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateArg::Int(value) => write!(f, "{}", value),
            TemplateArg::Type(ty) => write!(f, "{}", ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_int_and_type() {
        let args: Vec<TemplateArg> = serde_json::from_str("[2, \"unsigned int\"]").unwrap();
        assert_eq!(args[0], TemplateArg::Int(2));
        assert_eq!(args[1], TemplateArg::Type(TypeRef::named("unsigned int")));
    }

    #[test]
    fn int_becomes_bare_type_path() {
        let ty = TemplateArg::Int(3).to_type_ref();
        assert_eq!(ty.to_string(), "3");
        assert!(ty.is_bare());
    }
}
