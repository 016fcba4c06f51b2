//! The master assembly artifact.

use std::fmt::Write;

use bindweave_core::{ModuleError, ModuleHandle};

use super::BindingUnit;

/// Invokes every unit's entry point in registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleAssembly {
    /// Package name.
    pub package: String,
    /// Module name.
    pub module: String,
    /// Unit short names, in registration order.
    pub units: Vec<String>,
}

impl ModuleAssembly {
    /// Assemble from units already in registration order.
    pub fn new(package: impl Into<String>, module: impl Into<String>, units: &[BindingUnit]) -> Self {
        Self {
            package: package.into(),
            module: module.into(),
            units: units.iter().map(|u| u.short_name.clone()).collect(),
        }
    }

    /// Entry-point name of the module, `_<package>_<module>`.
    pub fn full_name(&self) -> String {
        format!("_{}_{}", self.package, self.module)
    }

    /// Output file name.
    pub fn file_name(&self) -> String {
        format!("{}.main.cpp", self.module)
    }

    /// Register `units` on a module handle in assembly order.
    ///
    /// `units` must contain every unit the assembly was built from.
    pub fn register(
        &self,
        units: &[BindingUnit],
        module: &mut dyn ModuleHandle,
    ) -> Result<(), ModuleError> {
        for name in &self.units {
            let unit = units
                .iter()
                .find(|u| &u.short_name == name)
                .ok_or_else(|| ModuleError::MissingUnit { unit: name.clone() })?;
            unit.register(module)?;
        }
        Ok(())
    }

    /// Render the module source.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "#include <pybind11/pybind11.h>")?;
        writeln!(out, "#include \"wrapper_header_collection.hpp\"")?;
        for name in &self.units {
            writeln!(out, "#include \"{}.cppwg.hpp\"", name)?;
        }
        writeln!(out)?;
        writeln!(out, "namespace py = pybind11;")?;
        writeln!(out)?;
        writeln!(out, "PYBIND11_MODULE({}, m)", self.full_name())?;
        writeln!(out, "{{")?;
        for name in &self.units {
            writeln!(out, "    register_{}_class(m);", name)?;
        }
        writeln!(out, "}}")
    }
}
