//! Generator configuration, loaded from TOML.
//!
//! ```toml
//! package = "pycells"
//! module = "all"
//! smart_ptr_type = "shared"
//! excluded_methods = ["Clear"]
//! return_type_excludes = ["iterator"]
//! calldef_excludes = ["PetscInt"]
//! pointer_call_policy = "take_ownership"
//!
//! [name_replacements]
//! "unsigned int" = "Unsigned"
//!
//! [[instantiate]]
//! class = "AbstractMesh"
//! args = [[2, 2], [3, 3]]
//!
//! [classes.PottsMesh]
//! excluded_methods = ["GetElement"]
//! excluded_variables = ["mCache"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use bindweave_core::{
    DeclarationModel, InstanceKey, NameRules, OwnershipModel, TemplateArg, TypeRef,
};
use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::exposure::ReturnPolicy;

/// Errors raised while loading configuration or declarations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file could not be read.
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for [`GeneratorConfig`].
    #[error("invalid generator config: {0}")]
    Toml(#[from] toml::de::Error),

    /// The declaration model is not valid JSON.
    #[error("invalid declaration model: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level generator settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Package name, used in the module entry point and header guard.
    pub package: String,
    /// Module name.
    pub module: String,
    /// Ownership model for classes that do not request one.
    pub smart_ptr_type: OwnershipModel,
    /// Drop every default-value expression.
    pub exclude_default_args: bool,
    /// Method names never exposed on any class.
    pub excluded_methods: Vec<String>,
    /// Constructors taking any parameter whose type contains one of these
    /// are dropped.
    pub constructor_arg_type_excludes: Vec<String>,
    /// Constructors whose rendered parameter types match one of these
    /// exactly are dropped.
    pub constructor_signature_excludes: Vec<Vec<String>>,
    /// Methods whose return type contains one of these are dropped.
    pub return_type_excludes: Vec<String>,
    /// Methods and constructors taking any parameter whose type contains
    /// one of these are dropped.
    pub calldef_excludes: Vec<String>,
    /// Field names never exposed on any class.
    pub excluded_variables: Vec<String>,
    /// Policy for methods returning a pointer.
    pub pointer_call_policy: Option<ReturnPolicy>,
    /// Policy for methods returning a reference.
    pub reference_call_policy: Option<ReturnPolicy>,
    /// Textual replacements applied when building short names, in order.
    pub name_replacements: IndexMap<String, String>,
    /// Worker threads for per-instance work. `1` runs sequentially.
    pub workers: usize,
    /// Requested instantiations.
    pub instantiate: Vec<InstantiateEntry>,
    /// Per-class settings.
    pub classes: IndexMap<String, ClassConfig>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            package: "bindweave_package".to_string(),
            module: "bindweave_module".to_string(),
            smart_ptr_type: OwnershipModel::Shared,
            exclude_default_args: false,
            excluded_methods: Vec::new(),
            constructor_arg_type_excludes: Vec::new(),
            constructor_signature_excludes: Vec::new(),
            return_type_excludes: Vec::new(),
            calldef_excludes: Vec::new(),
            excluded_variables: Vec::new(),
            pointer_call_policy: None,
            reference_call_policy: None,
            name_replacements: IndexMap::new(),
            workers: 1,
            instantiate: Vec::new(),
            classes: IndexMap::new(),
        }
    }
}

/// One `[[instantiate]]` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstantiateEntry {
    /// Generic class name.
    pub class: String,
    /// Argument tuples; empty means the class is not generic.
    #[serde(default)]
    pub args: Vec<Vec<TemplateArg>>,
}

/// `[classes.<Name>]` settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClassConfig {
    /// Replaces the class part of the short name.
    pub name_override: Option<String>,
    /// Method names never exposed on this class.
    pub excluded_methods: Vec<String>,
    /// Field names never exposed on this class.
    pub excluded_variables: Vec<String>,
    /// Parameter type fragments that drop a method or constructor.
    pub calldef_excludes: Vec<String>,
    /// Pointer return policy, before the global one.
    pub pointer_call_policy: Option<ReturnPolicy>,
    /// Reference return policy, before the global one.
    pub reference_call_policy: Option<ReturnPolicy>,
    /// Ownership model for this class.
    pub smart_ptr_type: Option<OwnershipModel>,
    /// Never instantiate this class.
    pub excluded: bool,
}

impl GeneratorConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read(path.as_ref())?)
    }

    /// Add an `[[instantiate]]` entry.
    pub fn with_instantiation(mut self, class: impl Into<String>, args: Vec<Vec<i64>>) -> Self {
        self.instantiate.push(InstantiateEntry {
            class: class.into(),
            args: args
                .into_iter()
                .map(|tuple| tuple.into_iter().map(TemplateArg::Int).collect())
                .collect(),
        });
        self
    }

    /// Add per-class settings.
    pub fn with_class(mut self, name: impl Into<String>, class: ClassConfig) -> Self {
        self.classes.insert(name.into(), class);
        self
    }

    /// The requested instance keys, in file order.
    pub fn requests(&self) -> Vec<InstanceKey> {
        self.instantiate
            .iter()
            .flat_map(|entry| {
                if entry.args.is_empty() {
                    vec![InstanceKey::plain(entry.class.clone())]
                } else {
                    entry
                        .args
                        .iter()
                        .map(|args| InstanceKey::new(entry.class.clone(), args.clone()))
                        .collect()
                }
            })
            .collect()
    }

    /// Settings for a class, if any.
    pub fn class(&self, name: &str) -> Option<&ClassConfig> {
        self.classes.get(name)
    }

    /// Check whether the config excludes a class.
    pub fn is_class_excluded(&self, name: &str) -> bool {
        self.class(name).is_some_and(|c| c.excluded)
    }

    /// Check whether a method name is excluded globally or for `class`.
    pub fn is_method_excluded(&self, class: &str, method: &str) -> bool {
        self.excluded_methods.iter().any(|m| m == method)
            || self
                .class(class)
                .is_some_and(|c| c.excluded_methods.iter().any(|m| m == method))
    }

    /// Check whether a field name is excluded globally or for `class`.
    pub fn is_variable_excluded(&self, class: &str, field: &str) -> bool {
        self.excluded_variables.iter().any(|v| v == field)
            || self
                .class(class)
                .is_some_and(|c| c.excluded_variables.iter().any(|v| v == field))
    }

    /// Check whether any parameter type hits a `calldef_excludes` entry.
    pub fn excludes_call(&self, class: &str, param_types: &[String]) -> bool {
        let class_rules = self
            .class(class)
            .map(|c| c.calldef_excludes.as_slice())
            .unwrap_or(&[]);
        self.calldef_excludes
            .iter()
            .chain(class_rules)
            .any(|ex| param_types.iter().any(|ty| ty.contains(ex.as_str())))
    }

    /// Return value policy for a method of `class` returning `ty`.
    pub fn return_policy(&self, class: &str, ty: &TypeRef) -> ReturnPolicy {
        let class = self.class(class);
        let configured = if ty.is_reference() {
            class
                .and_then(|c| c.reference_call_policy)
                .or(self.reference_call_policy)
        } else if ty.is_pointer() {
            class
                .and_then(|c| c.pointer_call_policy)
                .or(self.pointer_call_policy)
        } else {
            None
        };
        configured.unwrap_or_else(|| ReturnPolicy::for_return(ty))
    }

    /// Naming rules for a class.
    pub fn name_rules(&self, class: &str) -> NameRules {
        NameRules {
            name_override: self.class(class).and_then(|c| c.name_override.clone()),
            replacements: self
                .name_replacements
                .iter()
                .map(|(from, to)| (from.clone(), to.clone()))
                .collect(),
        }
    }

    /// Ownership model configured for a class, before the declaration's own.
    pub fn class_ownership(&self, class: &str) -> Option<&OwnershipModel> {
        self.class(class).and_then(|c| c.smart_ptr_type.as_ref())
    }

    /// Effective worker count.
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }
}

/// Load a declaration model from a JSON file.
pub fn load_declarations(path: impl AsRef<Path>) -> Result<DeclarationModel, ConfigError> {
    Ok(DeclarationModel::from_json_str(&read(path.as_ref())?)?)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
