//! Constructor, method and parameter declarations.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::DefaultExpr;
use crate::TypeRef;

bitflags! {
    /// Qualifiers and annotations on a member declaration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MemberFlags: u8 {
        /// `const` member function.
        const CONST = 1 << 0;
        /// `static` member function.
        const STATIC = 1 << 1;
        /// Annotated for exclusion from the exposed surface.
        const EXCLUDED = 1 << 2;
    }
}

/// Virtual dispatch kind of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Virtuality {
    /// Statically dispatched.
    #[default]
    None,
    /// Virtual with a native default implementation.
    Virtual,
    /// Pure virtual; no native implementation.
    Abstract,
}

impl Virtuality {
    /// Virtual or abstract.
    pub fn is_dynamic(self) -> bool {
        !matches!(self, Virtuality::None)
    }
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name, as exposed to keyword arguments.
    pub name: String,
    /// Declared type, possibly mentioning generic parameters.
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Default-value expression, kept in expression form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultExpr>,
}

impl Param {
    /// Create a parameter with no default.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    /// Attach a default-value expression.
    pub fn with_default(mut self, default: DefaultExpr) -> Self {
        self.default = Some(default);
        self
    }
}

/// A declared constructor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Constructor {
    /// Parameters in declaration order.
    #[serde(default)]
    pub params: Vec<Param>,
    /// Flags; only `EXCLUDED` is meaningful.
    #[serde(default)]
    pub flags: MemberFlags,
}

impl Constructor {
    /// Create a constructor.
    pub fn new(params: Vec<Param>) -> Self {
        Self {
            params,
            flags: MemberFlags::empty(),
        }
    }

    /// Mark excluded.
    pub fn excluded(mut self) -> Self {
        self.flags |= MemberFlags::EXCLUDED;
        self
    }

    /// Check the exclusion annotation.
    pub fn is_excluded(&self) -> bool {
        self.flags.contains(MemberFlags::EXCLUDED)
    }
}

/// A declared method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    /// Method name; overloads share it.
    pub name: String,
    /// Parameters in declaration order.
    #[serde(default)]
    pub params: Vec<Param>,
    /// Return type.
    #[serde(default = "TypeRef::void")]
    pub return_type: TypeRef,
    /// Dispatch kind.
    #[serde(default)]
    pub virtuality: Virtuality,
    /// Qualifiers and annotations.
    #[serde(default)]
    pub flags: MemberFlags,
}

impl Method {
    /// Create a non-virtual `void` method with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: TypeRef::void(),
            virtuality: Virtuality::None,
            flags: MemberFlags::empty(),
        }
    }

    // === Builder Methods ===

    /// Add a parameter.
    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Set the return type.
    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.return_type = ty;
        self
    }

    /// Mark `virtual`.
    pub fn virtual_(mut self) -> Self {
        self.virtuality = Virtuality::Virtual;
        self
    }

    /// Mark pure virtual.
    pub fn abstract_(mut self) -> Self {
        self.virtuality = Virtuality::Abstract;
        self
    }

    /// Mark `const`.
    pub fn const_(mut self) -> Self {
        self.flags |= MemberFlags::CONST;
        self
    }

    /// Mark `static`.
    pub fn static_(mut self) -> Self {
        self.flags |= MemberFlags::STATIC;
        self
    }

    /// Mark excluded.
    pub fn excluded(mut self) -> Self {
        self.flags |= MemberFlags::EXCLUDED;
        self
    }

    // === Queries ===

    /// `const` member function.
    pub fn is_const(&self) -> bool {
        self.flags.contains(MemberFlags::CONST)
    }

    /// `static` member function.
    pub fn is_static(&self) -> bool {
        self.flags.contains(MemberFlags::STATIC)
    }

    /// Exclusion annotation present.
    pub fn is_excluded(&self) -> bool {
        self.flags.contains(MemberFlags::EXCLUDED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_flags() {
        let m = Method::new("GetIndex")
            .returns(TypeRef::named("unsigned int"))
            .const_();
        assert!(m.is_const());
        assert!(!m.is_excluded());
        assert_eq!(m.virtuality, Virtuality::None);
    }

    #[test]
    fn deserialize_method_with_defaults() {
        let json = r#"{
            "name": "Scale",
            "params": [{ "name": "factor", "type": "double const" }],
            "virtuality": "abstract"
        }"#;
        let m: Method = serde_json::from_str(json).unwrap();
        assert_eq!(m.virtuality, Virtuality::Abstract);
        assert!(m.return_type.is_void());
        assert!(m.params[0].ty.is_const);
    }

    #[test]
    fn constructor_exclusion() {
        let ctor = Constructor::new(vec![Param::new("x", TypeRef::named("int"))]).excluded();
        assert!(ctor.is_excluded());
    }
}
