//! Per-instantiation binding units.

use std::fmt::Write;

use bindweave_core::runtime::{
    CONSTRUCTOR_NAME, CallableRegistration, ClassRegistration, ModuleHandle, ShimKind,
    ShimRegistration,
};
use bindweave_core::{InstanceKey, ModuleError, OwnershipModel};
use bindweave_registry::InstanceId;

use crate::exposure::{ExposedMethod, ExposedParam, ExposedSurface, ReturnPolicy};
use crate::shim::{ShimMethod, ShimPlan};

/// A base as referenced from a derived unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseRef {
    /// Short name of the base.
    pub short_name: String,
    /// Native name of the base.
    pub native_name: String,
}

/// The emitted artifact for one instantiation.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingUnit {
    /// Arena id.
    pub id: InstanceId,
    /// Identity.
    pub key: InstanceKey,
    /// Binding name, `AbstractMesh_2_2`.
    pub short_name: String,
    /// Native type name, `AbstractMesh<2,2 >`.
    pub native_name: String,
    /// Header declaring the class.
    pub source_file: Option<String>,
    /// Holder discipline shared by the hierarchy.
    pub ownership: OwnershipModel,
    /// Direct bases, already registered when this unit runs.
    pub bases: Vec<BaseRef>,
    /// Forwarding shim, present for polymorphic instantiations.
    pub shim: Option<ShimPlan>,
    /// Exposed members.
    pub surface: ExposedSurface,
}

impl BindingUnit {
    /// Name of the registration entry point.
    pub fn entry_point(&self) -> String {
        format!("register_{}_class", self.short_name)
    }

    /// Output file name of the rendered unit.
    pub fn file_name(&self) -> String {
        format!("{}.cppwg.cpp", self.short_name)
    }

    /// Header file name for the unit's entry point.
    pub fn header_name(&self) -> String {
        format!("{}.cppwg.hpp", self.short_name)
    }

    /// Attach this unit to a module handle.
    pub fn register(&self, module: &mut dyn ModuleHandle) -> Result<(), ModuleError> {
        module.add_class(ClassRegistration {
            name: self.short_name.clone(),
            native_name: self.native_name.clone(),
            bases: self.bases.iter().map(|b| b.short_name.clone()).collect(),
            holder: self.ownership.holder_type(&self.short_name),
            shim: self.shim.as_ref().map(|plan| ShimRegistration {
                type_name: plan.type_name.clone(),
                methods: plan
                    .methods
                    .iter()
                    .map(|m| (m.name.clone(), m.kind))
                    .collect(),
            }),
        })?;
        for ctor in &self.surface.constructors {
            module.add_constructor(
                &self.short_name,
                CallableRegistration {
                    name: CONSTRUCTOR_NAME.to_string(),
                    signature: ctor.signature.clone(),
                    params: ctor.params.iter().map(ExposedParam::to_bound).collect(),
                },
            )?;
        }
        for method in &self.surface.methods {
            module.add_method(
                &self.short_name,
                CallableRegistration {
                    name: method.name.clone(),
                    signature: method.signature.clone(),
                    params: method.params.iter().map(ExposedParam::to_bound).collect(),
                },
            )?;
        }
        Ok(())
    }

    /// Render the header declaring the entry point.
    pub fn render_header(&self) -> String {
        let guard = format!("{}_hpp__cppwg_wrapper", self.short_name);
        format!(
            "// This file is auto-generated by bindweave; manual changes will be overwritten.\n\
             #ifndef {guard}\n\
             #define {guard}\n\
             \n\
             #include <pybind11/pybind11.h>\n\
             \n\
             void {}(pybind11::module &m);\n\
             \n\
             #endif // {guard}\n",
            self.entry_point()
        )
    }

    /// Render the wrapper source.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) -> std::fmt::Result {
        let short = &self.short_name;
        writeln!(out, "// This file is auto-generated by bindweave; manual changes will be overwritten.")?;
        writeln!(out)?;
        writeln!(out, "#include <pybind11/pybind11.h>")?;
        writeln!(out, "#include <pybind11/stl.h>")?;
        writeln!(out, "#include <memory>")?;
        if let Some(source) = &self.source_file {
            writeln!(out, "#include \"{}\"", source)?;
        }
        writeln!(out)?;
        writeln!(out, "#include \"{}\"", self.header_name())?;
        writeln!(out)?;
        writeln!(out, "namespace py = pybind11;")?;
        writeln!(out, "typedef {} {};", self.native_name, short)?;
        writeln!(
            out,
            "PYBIND11_DECLARE_HOLDER_TYPE(T, {}<T>);",
            self.ownership.holder_template()
        )?;
        writeln!(out)?;

        if let Some(shim) = self.shim.as_ref().filter(|s| !s.is_empty()) {
            self.render_shim(out, shim)?;
            writeln!(out)?;
        }

        writeln!(out, "void {}(py::module &m)", self.entry_point())?;
        writeln!(out, "{{")?;
        let mut class_args = vec![short.clone()];
        if let Some(shim) = self.shim.as_ref().filter(|s| !s.is_empty()) {
            class_args.push(shim.type_name.clone());
        }
        class_args.push(self.ownership.holder_type(short));
        class_args.extend(self.bases.iter().map(|b| b.native_name.clone()));
        writeln!(
            out,
            "    py::class_<{}>(m, \"{}\")",
            class_args.join(", "),
            short
        )?;

        for ctor in &self.surface.constructors {
            let types: Vec<String> = ctor.params.iter().map(|p| p.ty.to_string()).collect();
            write!(out, "        .def(py::init<{}>()", types.join(", "))?;
            for param in &ctor.params {
                write!(out, ", {}", render_arg(param))?;
            }
            writeln!(out, ")")?;
        }
        for method in &self.surface.methods {
            render_method(out, short, method)?;
        }
        for field in &self.surface.fields {
            let def = if field.readonly {
                "def_readonly"
            } else {
                "def_readwrite"
            };
            writeln!(
                out,
                "        .{}(\"{}\", &{}::{})",
                def, field.name, short, field.name
            )?;
        }
        writeln!(out, "    ;")?;
        writeln!(out, "}}")
    }

    fn render_shim(&self, out: &mut String, shim: &ShimPlan) -> std::fmt::Result {
        let short = &self.short_name;
        writeln!(out, "class {} : public {}", shim.type_name, short)?;
        writeln!(out, "{{")?;
        writeln!(out, "public:")?;
        writeln!(out, "    using {}::{};", short, self.key.class)?;
        for method in &shim.methods {
            render_override(out, short, method)?;
        }
        writeln!(out, "}};")
    }
}

fn render_override(out: &mut String, short: &str, method: &ShimMethod) -> std::fmt::Result {
    let params: Vec<String> = method
        .params
        .iter()
        .map(|p| format!("{} {}", p.ty, p.name))
        .collect();
    let constness = if method.is_const { " const" } else { "" };
    writeln!(
        out,
        "    {} {}({}){} override",
        method.return_type,
        method.name,
        params.join(", "),
        constness
    )?;
    writeln!(out, "    {{")?;
    let macro_name = match method.kind {
        ShimKind::Abstract => "PYBIND11_OVERRIDE_PURE",
        ShimKind::Virtual => "PYBIND11_OVERRIDE",
    };
    writeln!(out, "        {}(", macro_name)?;
    writeln!(out, "            {},", method.return_type)?;
    writeln!(out, "            {},", short)?;
    let names: Vec<&str> = method.params.iter().map(|p| p.name.as_str()).collect();
    if names.is_empty() {
        writeln!(out, "            {});", method.name)?;
    } else {
        writeln!(out, "            {},", method.name)?;
        writeln!(out, "            {});", names.join(", "))?;
    }
    writeln!(out, "    }}")
}

fn render_method(out: &mut String, short: &str, method: &ExposedMethod) -> std::fmt::Result {
    let def = if method.is_static { "def_static" } else { "def" };
    writeln!(out, "        .{}(\"{}\",", def, method.name)?;
    writeln!(
        out,
        "            ({}) &{}::{},",
        method.signature, short, method.name
    )?;
    write!(out, "            \" \"")?;
    for param in &method.params {
        write!(out, ", {}", render_arg(param))?;
    }
    if let Some(policy) = render_policy(method.policy) {
        write!(out, ", {}", policy)?;
    }
    writeln!(out, ")")
}

fn render_arg(param: &ExposedParam) -> String {
    match &param.default {
        Some(default) => format!("py::arg(\"{}\") = {}", param.name, default.render()),
        None => format!("py::arg(\"{}\")", param.name),
    }
}

fn render_policy(policy: ReturnPolicy) -> Option<&'static str> {
    match policy {
        ReturnPolicy::Automatic => None,
        ReturnPolicy::TakeOwnership => Some("py::return_value_policy::take_ownership"),
        ReturnPolicy::Copy => Some("py::return_value_policy::copy"),
        ReturnPolicy::Move => Some("py::return_value_policy::move"),
        ReturnPolicy::Reference => Some("py::return_value_policy::reference"),
        ReturnPolicy::ReferenceInternal => Some("py::return_value_policy::reference_internal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exposure::ExposedConstructor;
    use bindweave_core::{DefaultExpr, HostModule, TypeRef};

    fn param(name: &str, ty: &str, default: Option<DefaultExpr>) -> ExposedParam {
        ExposedParam {
            name: name.to_string(),
            ty: TypeRef::parse(ty).unwrap(),
            default,
        }
    }

    fn shape() -> BindingUnit {
        BindingUnit {
            id: InstanceId::from_index(0),
            key: InstanceKey::with_ints("Shape", &[3]),
            short_name: "Shape_3".to_string(),
            native_name: "Shape<3 >".to_string(),
            source_file: Some("Shape.hpp".to_string()),
            ownership: OwnershipModel::Shared,
            bases: Vec::new(),
            shim: None,
            surface: ExposedSurface {
                constructors: vec![ExposedConstructor {
                    params: Vec::new(),
                    signature: "Shape_3()".to_string(),
                }],
                methods: vec![ExposedMethod {
                    name: "AddVertex".to_string(),
                    params: vec![param(
                        "point",
                        "::std::shared_ptr<Point<3>>",
                        Some(DefaultExpr::MakeShared(TypeRef::parse("Point<3>").unwrap())),
                    )],
                    return_type: TypeRef::void(),
                    is_const: false,
                    is_static: false,
                    policy: ReturnPolicy::Automatic,
                    signature: "void(Shape_3::*)(::std::shared_ptr<Point<3>>)".to_string(),
                }],
                fields: Vec::new(),
            },
        }
    }

    #[test]
    fn renders_registration_function() {
        let text = shape().render();
        assert!(text.contains("typedef Shape<3 > Shape_3;"));
        assert!(text.contains("PYBIND11_DECLARE_HOLDER_TYPE(T, std::shared_ptr<T>);"));
        assert!(text.contains("void register_Shape_3_class(py::module &m)"));
        assert!(text.contains("py::class_<Shape_3, std::shared_ptr<Shape_3>>(m, \"Shape_3\")"));
        assert!(text.contains(".def(py::init<>())"));
        assert!(text.contains(
            "(void(Shape_3::*)(::std::shared_ptr<Point<3>>)) &Shape_3::AddVertex,"
        ));
        assert!(text.contains("py::arg(\"point\") = std::make_shared<Point<3>>()"));
        assert!(!text.contains("_Overrides"));
    }

    #[test]
    fn header_declares_entry_point() {
        let unit = shape();
        let text = unit.render_header();
        assert_eq!(unit.header_name(), "Shape_3.cppwg.hpp");
        assert!(text.contains("#ifndef Shape_3_hpp__cppwg_wrapper"));
        assert!(text.contains("void register_Shape_3_class(pybind11::module &m);"));
        assert!(text.trim_end().ends_with("#endif // Shape_3_hpp__cppwg_wrapper"));
        assert!(unit.render().contains("#include \"Shape_3.cppwg.hpp\""));
    }

    #[test]
    fn empty_shim_is_not_rendered() {
        let mut unit = shape();
        unit.shim = Some(ShimPlan {
            type_name: "Shape_3_Overrides".to_string(),
            methods: Vec::new(),
        });
        assert!(!unit.render().contains("Shape_3_Overrides"));
    }

    #[test]
    fn register_attaches_members() {
        let mut module = HostModule::new("shapes");
        shape().register(&mut module).unwrap();
        assert_eq!(module.registration_order(), ["Shape_3".to_string()]);
        assert_eq!(module.constructors("Shape_3").len(), 1);
        assert_eq!(module.methods("Shape_3", "AddVertex").len(), 1);
    }
}
