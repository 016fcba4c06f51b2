//! The header collection: includes, explicit instantiations and typedefs.

use std::fmt::Write;

use super::BindingUnit;

/// Header that makes every instantiation a complete, nameable type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCollection {
    /// Package name, used for the include guard.
    pub package: String,
    /// Declaring headers, first-seen order, deduplicated.
    pub includes: Vec<String>,
    /// `(native name, short name)` of generic instantiations, in
    /// registration order.
    pub instantiations: Vec<(String, String)>,
}

impl HeaderCollection {
    /// Collect from units already in registration order.
    pub fn new(package: impl Into<String>, units: &[BindingUnit]) -> Self {
        let mut includes: Vec<String> = Vec::new();
        for file in units.iter().filter_map(|u| u.source_file.as_ref()) {
            if !includes.contains(file) {
                includes.push(file.clone());
            }
        }
        Self {
            package: package.into(),
            includes,
            instantiations: units
                .iter()
                .filter(|u| u.key.is_generic())
                .map(|u| (u.native_name.clone(), u.short_name.clone()))
                .collect(),
        }
    }

    /// Output file name.
    pub fn file_name(&self) -> &'static str {
        "wrapper_header_collection.hpp"
    }

    /// Render the header.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) -> std::fmt::Result {
        let guard = format!("{}_HEADERS_HPP_", self.package);
        writeln!(out, "#ifndef {}", guard)?;
        writeln!(out, "#define {}", guard)?;
        writeln!(out)?;
        writeln!(out, "// Includes")?;
        for include in &self.includes {
            writeln!(out, "#include \"{}\"", include)?;
        }
        writeln!(out)?;
        writeln!(out, "// Instantiate Template Classes")?;
        for (native, _) in &self.instantiations {
            writeln!(out, "template class {};", native)?;
        }
        writeln!(out)?;
        writeln!(out, "// Typedefs for nicer naming")?;
        writeln!(out, "namespace cppwg")?;
        writeln!(out, "{{")?;
        for (native, short) in &self.instantiations {
            writeln!(out, "    typedef {} {};", native, short)?;
        }
        writeln!(out, "}} // namespace cppwg")?;
        writeln!(out)?;
        writeln!(out, "#endif // {}", guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_instantiations_and_typedefs() {
        let header = HeaderCollection {
            package: "pycells".to_string(),
            includes: vec!["AbstractMesh.hpp".to_string()],
            instantiations: vec![("AbstractMesh<2,2 >".to_string(), "AbstractMesh_2_2".to_string())],
        };
        let text = header.render();
        assert!(text.starts_with("#ifndef pycells_HEADERS_HPP_"));
        assert!(text.contains("#include \"AbstractMesh.hpp\""));
        assert!(text.contains("template class AbstractMesh<2,2 >;"));
        assert!(text.contains("    typedef AbstractMesh<2,2 > AbstractMesh_2_2;"));
    }
}
