//! Generic class declarations.

use serde::{Deserialize, Serialize};

use super::{Constructor, Method};
use crate::{OwnershipModel, TemplateArg, TypeRef};

/// A class definition parameterized by zero or more generic slots.
///
/// Immutable once loaded; the resolver only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericClass {
    /// Unqualified class name.
    pub name: String,
    /// Generic parameter slots, in order. Empty for plain classes.
    #[serde(default)]
    pub params: Vec<GenericParam>,
    /// Direct bases with their argument mappings.
    #[serde(default)]
    pub bases: Vec<BaseSpec>,
    /// Declared constructors.
    #[serde(default)]
    pub constructors: Vec<Constructor>,
    /// Declared methods (overloads share a name).
    #[serde(default)]
    pub methods: Vec<Method>,
    /// Public data members.
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Ownership model requested by the declaration itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership: Option<OwnershipModel>,
    /// Header declaring the class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// Never instantiate or expose this class.
    #[serde(default)]
    pub excluded: bool,
}

impl GenericClass {
    /// Create an empty class declaration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            bases: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            ownership: None,
            source_file: None,
            excluded: false,
        }
    }

    // === Builder Methods ===

    /// Add a generic parameter slot.
    pub fn with_param(mut self, param: GenericParam) -> Self {
        self.params.push(param);
        self
    }

    /// Add a base class.
    pub fn with_base(mut self, base: BaseSpec) -> Self {
        self.bases.push(base);
        self
    }

    /// Add a constructor.
    pub fn with_constructor(mut self, ctor: Constructor) -> Self {
        self.constructors.push(ctor);
        self
    }

    /// Add a method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a field.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Request an ownership model.
    pub fn with_ownership(mut self, model: OwnershipModel) -> Self {
        self.ownership = Some(model);
        self
    }

    /// Set the declaring header.
    pub fn with_source_file(mut self, file: impl Into<String>) -> Self {
        self.source_file = Some(file.into());
        self
    }

    // === Queries ===

    /// Check whether the class has generic parameters.
    pub fn is_generic(&self) -> bool {
        !self.params.is_empty()
    }

    /// Names of the generic parameters, in slot order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    /// Whether any directly declared method is virtual or abstract.
    pub fn declares_dynamic_methods(&self) -> bool {
        self.methods.iter().any(|m| m.virtuality.is_dynamic())
    }
}

/// One generic parameter slot, e.g. `unsigned DIM_B = DIM_A`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericParam {
    /// Parameter name.
    pub name: String,
    /// Default argument used when a request omits this slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<BaseArg>,
}

impl GenericParam {
    /// A parameter with no default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// A parameter defaulting to `default`.
    pub fn with_default(name: impl Into<String>, default: BaseArg) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
        }
    }
}

/// A base class reference and the mapping of its parameter slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseSpec {
    /// Name of the base generic class.
    pub class: String,
    /// One argument per base parameter slot.
    #[serde(default)]
    pub args: Vec<BaseArg>,
}

impl BaseSpec {
    /// Create a base reference.
    pub fn new(class: impl Into<String>, args: Vec<BaseArg>) -> Self {
        Self {
            class: class.into(),
            args,
        }
    }

    /// A non-generic base.
    pub fn plain(class: impl Into<String>) -> Self {
        Self::new(class, Vec::new())
    }
}

/// An argument in a base mapping or parameter default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseArg {
    /// Forward one of the derived class's generic parameters.
    Param(String),
    /// A fixed concrete argument.
    Value(TemplateArg),
}

impl BaseArg {
    /// Forward the named parameter.
    pub fn param(name: impl Into<String>) -> Self {
        BaseArg::Param(name.into())
    }

    /// Fixed integral argument.
    pub fn int(value: i64) -> Self {
        BaseArg::Value(TemplateArg::Int(value))
    }
}

/// A public data member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Read-only from the dynamic side.
    #[serde(default)]
    pub readonly: bool,
    /// Never exposed.
    #[serde(default)]
    pub excluded: bool,
}

impl Field {
    /// Create a writable field.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            readonly: false,
            excluded: false,
        }
    }

    /// Make read-only.
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Mark as excluded from exposure.
    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }
}
