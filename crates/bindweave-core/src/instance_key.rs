//! Instance identity and naming.
//!
//! An [`InstanceKey`] is the (class name, concrete arguments) pair that
//! identifies one concrete instantiation. Keys drive memoization and supply
//! the two names every binding unit carries:
//!
//! - the native name, `AbstractMesh<2,2 >`
//! - the short binding name, `AbstractMesh_2_2`

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{IdentityHash, TemplateArg};

/// Identity of a concrete instantiation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceKey {
    /// Generic class name.
    pub class: String,
    /// Concrete arguments, one per generic parameter slot.
    #[serde(default)]
    pub args: Vec<TemplateArg>,
}

impl InstanceKey {
    /// Create a key for a generic class bound to `args`.
    pub fn new(class: impl Into<String>, args: Vec<TemplateArg>) -> Self {
        Self {
            class: class.into(),
            args,
        }
    }

    /// Create a key for a non-generic class.
    pub fn plain(class: impl Into<String>) -> Self {
        Self::new(class, Vec::new())
    }

    /// Create a key from integral arguments, e.g. `AbstractMesh<2, 2>`.
    pub fn with_ints(class: impl Into<String>, args: &[i64]) -> Self {
        Self::new(class, args.iter().copied().map(TemplateArg::Int).collect())
    }

    /// Deterministic identity hash.
    pub fn hash(&self) -> IdentityHash {
        IdentityHash::from_instance(&self.class, &self.args)
    }

    /// Check whether the key binds any arguments.
    pub fn is_generic(&self) -> bool {
        !self.args.is_empty()
    }

    /// Name of the type as written in native source: `Foo<2,2 >`.
    pub fn native_name(&self) -> String {
        if self.args.is_empty() {
            return self.class.clone();
        }
        let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
        format!("{}<{} >", self.class, args.join(","))
    }

    /// Short, identifier-safe binding name: `Foo_2_2`.
    pub fn short_name(&self, rules: &NameRules) -> String {
        let base = rules
            .name_override
            .clone()
            .unwrap_or_else(|| self.class.clone());
        let mut name = clean_component(&base, &rules.replacements);
        for arg in &self.args {
            name.push('_');
            name.push_str(&clean_component(&arg.to_string(), &rules.replacements));
        }
        name
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.class)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", arg)?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

/// Rules applied when deriving short binding names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameRules {
    /// Replaces the class name (not the arguments).
    pub name_override: Option<String>,
    /// Ordered textual replacements, e.g. `unsigned int` -> `Unsigned`.
    pub replacements: Vec<(String, String)>,
}

impl NameRules {
    /// Rules with only textual replacements.
    pub fn with_replacements(replacements: Vec<(String, String)>) -> Self {
        Self {
            name_override: None,
            replacements,
        }
    }
}

fn clean_component(raw: &str, replacements: &[(String, String)]) -> String {
    let mut text = raw.to_string();
    for (from, to) in replacements {
        text = text.replace(from.as_str(), to.as_str());
    }
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | ',' | ' ' | '&' | '*'))
        .collect();
    let mut chars = cleaned.chars();
    match chars.next() {
        Some(first) if cleaned.chars().count() > 1 => {
            first.to_uppercase().chain(chars).collect()
        }
        _ => cleaned,
    }
}
