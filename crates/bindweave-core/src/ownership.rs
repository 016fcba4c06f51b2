//! Ownership models for objects crossing into the dynamic runtime.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The reference-lifetime discipline used for one polymorphic hierarchy.
///
/// Every instantiation that shares a hierarchy root must carry the same
/// model; the generator rejects any divergence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OwnershipModel {
    /// Shared, reference counted (`std::shared_ptr`).
    #[default]
    Shared,
    /// Exclusively owned (`std::unique_ptr`).
    Unique,
    /// A custom holder template, named as in native source.
    Custom(String),
}

impl OwnershipModel {
    /// Holder type wrapping `ty`, e.g. `std::shared_ptr<Foo_2_2>`.
    pub fn holder_type(&self, ty: &str) -> String {
        match self {
            OwnershipModel::Shared => format!("std::shared_ptr<{}>", ty),
            OwnershipModel::Unique => format!("std::unique_ptr<{}>", ty),
            OwnershipModel::Custom(holder) => format!("{}<{}>", holder, ty),
        }
    }

    /// Holder template name, as used in holder-type declarations.
    pub fn holder_template(&self) -> &str {
        match self {
            OwnershipModel::Shared => "std::shared_ptr",
            OwnershipModel::Unique => "std::unique_ptr",
            OwnershipModel::Custom(holder) => holder,
        }
    }
}

impl From<String> for OwnershipModel {
    fn from(value: String) -> Self {
        match value.trim() {
            "" | "shared" | "std::shared_ptr" => OwnershipModel::Shared,
            "unique" | "std::unique_ptr" => OwnershipModel::Unique,
            other => OwnershipModel::Custom(other.to_string()),
        }
    }
}

impl From<OwnershipModel> for String {
    fn from(value: OwnershipModel) -> Self {
        value.to_string()
    }
}

impl fmt::Display for OwnershipModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnershipModel::Shared => f.write_str("shared"),
            OwnershipModel::Unique => f.write_str("unique"),
            OwnershipModel::Custom(holder) => f.write_str(holder),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_models() {
        assert_eq!(OwnershipModel::from("shared".to_string()), OwnershipModel::Shared);
        assert_eq!(
            OwnershipModel::from("std::unique_ptr".to_string()),
            OwnershipModel::Unique
        );
        assert_eq!(
            OwnershipModel::from("boost::intrusive_ptr".to_string()),
            OwnershipModel::Custom("boost::intrusive_ptr".to_string())
        );
    }

    #[test]
    fn holder_types() {
        assert_eq!(
            OwnershipModel::Shared.holder_type("Shape_3"),
            "std::shared_ptr<Shape_3>"
        );
        assert_eq!(
            OwnershipModel::Custom("Ref".to_string()).holder_type("Shape_3"),
            "Ref<Shape_3>"
        );
    }
}
