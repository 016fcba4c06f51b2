//! The declaration model.
//!
//! A structured description of the native classes to expose, as handed
//! over by the parsing front-end. Everything here is plain data: the
//! generator reads it, never mutates it.
//!
//! ## Components
//!
//! - [`GenericClass`]: a class with generic slots, bases and members
//! - [`Constructor`], [`Method`], [`Param`]: member declarations
//! - [`DefaultExpr`]: default-value expressions, kept in expression form
//! - [`DeclarationModel`]: the lookup table of all classes

mod class;
mod default_expr;
mod member;

pub use class::{BaseArg, BaseSpec, Field, GenericClass, GenericParam};
pub use default_expr::DefaultExpr;
pub use member::{Constructor, MemberFlags, Method, Param, Virtuality};

use rustc_hash::FxHashMap;
use serde::Deserialize;

/// All class declarations available to one generation run.
#[derive(Debug, Clone, Default)]
pub struct DeclarationModel {
    classes: FxHashMap<String, GenericClass>,
    order: Vec<String>,
}

#[derive(Deserialize)]
struct RawModel {
    classes: Vec<GenericClass>,
}

impl DeclarationModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a model from class declarations.
    pub fn from_classes(classes: impl IntoIterator<Item = GenericClass>) -> Self {
        let mut model = Self::new();
        for class in classes {
            model.insert(class);
        }
        model
    }

    /// Load a model from JSON of the form `{ "classes": [...] }`.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawModel = serde_json::from_str(json)?;
        Ok(Self::from_classes(raw.classes))
    }

    /// Add or replace a class declaration.
    pub fn insert(&mut self, class: GenericClass) {
        if !self.classes.contains_key(&class.name) {
            self.order.push(class.name.clone());
        }
        self.classes.insert(class.name.clone(), class);
    }

    /// Look up a class by name.
    pub fn get(&self, name: &str) -> Option<&GenericClass> {
        self.classes.get(name)
    }

    /// Check whether a class is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Classes in insertion order.
    pub fn classes(&self) -> impl Iterator<Item = &GenericClass> {
        self.order.iter().filter_map(|name| self.classes.get(name))
    }

    /// Number of declared classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if the model is empty.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_kept() {
        let model = DeclarationModel::from_classes([
            GenericClass::new("Shape"),
            GenericClass::new("Point"),
            GenericClass::new("Rectangle"),
        ]);
        let names: Vec<_> = model.classes().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Shape", "Point", "Rectangle"]);
    }

    #[test]
    fn replace_keeps_single_entry() {
        let mut model = DeclarationModel::new();
        model.insert(GenericClass::new("Point"));
        model.insert(GenericClass::new("Point").with_source_file("Point.hpp"));
        assert_eq!(model.len(), 1);
        assert_eq!(model.classes().count(), 1);
        assert_eq!(
            model.get("Point").and_then(|c| c.source_file.as_deref()),
            Some("Point.hpp")
        );
    }

    #[test]
    fn load_from_json() {
        let model = DeclarationModel::from_json_str(
            r#"{ "classes": [ { "name": "Point", "params": [ { "name": "DIM" } ] } ] }"#,
        )
        .unwrap();
        assert!(model.get("Point").is_some_and(GenericClass::is_generic));
    }
}
