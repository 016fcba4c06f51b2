//! Runtime values passed across a binding.

use std::fmt;
use std::sync::Arc;

use crate::TypeRef;
use crate::error::DispatchError;

/// A value as seen on the dynamic side of a binding.
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    /// Void/empty
    Void,
    /// Integer value (all integral widths)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// String value (owned)
    String(String),
    /// Reference to a native object
    Object(ObjectRef),
}

impl Dynamic {
    /// Get a human-readable name for this value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Void => "void",
            Dynamic::Int(_) => "int",
            Dynamic::Float(_) => "float",
            Dynamic::Bool(_) => "bool",
            Dynamic::String(_) => "string",
            Dynamic::Object(_) => "object",
        }
    }

    /// Check if this value is void.
    pub fn is_void(&self) -> bool {
        matches!(self, Dynamic::Void)
    }

    /// The object reference, if this is one.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Dynamic::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl fmt::Display for Dynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dynamic::Void => f.write_str("void"),
            Dynamic::Int(v) => write!(f, "{}", v),
            Dynamic::Float(v) => write!(f, "{}", v),
            Dynamic::Bool(v) => write!(f, "{}", v),
            Dynamic::String(v) => write!(f, "{:?}", v),
            Dynamic::Object(obj) => write!(f, "<{} #{}>", obj.type_name, obj.id),
        }
    }
}

/// Identity of a native object: its type and a unique id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Native type name.
    pub type_name: String,
    /// Unique per allocation.
    pub id: u64,
}

/// Something that can construct fresh native objects.
///
/// Default expressions that construct values go through this on every
/// evaluation.
pub trait ValueFactory {
    /// Construct a fresh default instance of `ty`.
    fn construct(&self, ty: &TypeRef) -> Dynamic;
}

/// A callable implementation: native code or a dynamic-side override.
pub type NativeFn = Arc<dyn Fn(&[Dynamic]) -> Result<Dynamic, DispatchError> + Send + Sync>;

/// Wrap a closure as a [`NativeFn`].
pub fn native_fn<F>(f: F) -> NativeFn
where
    F: Fn(&[Dynamic]) -> Result<Dynamic, DispatchError> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        assert_eq!(Dynamic::Int(3).to_string(), "3");
        assert_eq!(Dynamic::String("a".into()).to_string(), "\"a\"");
        let obj = Dynamic::Object(ObjectRef {
            type_name: "Point<3>".into(),
            id: 7,
        });
        assert_eq!(obj.to_string(), "<Point<3> #7>");
        assert!(obj.as_object().is_some());
    }

    #[test]
    fn native_fn_wraps_closure() {
        let f = native_fn(|args| Ok(Dynamic::Int(args.len() as i64)));
        assert_eq!(f(&[Dynamic::Void, Dynamic::Void]).unwrap(), Dynamic::Int(2));
    }
}
