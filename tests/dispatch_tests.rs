//! Runtime behaviour of generated bindings, exercised through the in-memory
//! host module: override dispatch and per-call default evaluation.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bindweave::core::runtime::DispatchState;
use bindweave::core::{DefaultExpr, Method, Param};
use bindweave::prelude::*;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn generate() -> GeneratedBindings {
    let model = load_declarations(fixture("meshes.json")).expect("Failed to load declarations");
    let config = GeneratorConfig::load(fixture("meshes.toml")).expect("Failed to load config");
    Generator::new(&model, &config)
        .run()
        .expect("Failed to generate bindings")
}

fn host(bindings: &GeneratedBindings) -> HostModule {
    let mut module = HostModule::new("all");
    bindings
        .register_all(&mut module)
        .expect("Failed to register bindings");
    module
}

/// Signature of the first exposed overload of `method` on `unit`.
fn signature(bindings: &GeneratedBindings, unit: &str, method: &str) -> String {
    bindings
        .unit(unit)
        .and_then(|u| u.surface.overloads(method).next())
        .map(|m| m.signature.clone())
        .unwrap_or_else(|| panic!("{unit} does not expose {method}"))
}

// =============================================================================
// Registration
// =============================================================================

#[test]
fn test_registration_follows_schedule() {
    let bindings = generate();
    let module = host(&bindings);
    let order: Vec<&str> = module
        .registration_order()
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(order, bindings.short_names());

    let potts = module.class("PottsMesh_3").unwrap();
    assert_eq!(potts.bases, ["AbstractMesh_3_3"]);
    assert_eq!(potts.holder, "std::shared_ptr<PottsMesh_3>");
}

#[test]
fn test_derived_before_base_is_rejected() {
    let bindings = generate();
    let mut module = HostModule::new("all");
    let err = bindings
        .unit("PottsMesh_3")
        .unwrap()
        .register(&mut module)
        .unwrap_err();
    assert!(matches!(err, ModuleError::UnknownBase { ref base, .. } if base == "AbstractMesh_3_3"));
}

#[test]
fn test_registering_twice_is_rejected() {
    let bindings = generate();
    let mut module = host(&bindings);
    let err = bindings
        .unit("Point")
        .unwrap()
        .register(&mut module)
        .unwrap_err();
    assert!(matches!(err, ModuleError::DuplicateRegistration { .. }));
}

// =============================================================================
// Override dispatch
// =============================================================================

#[test]
fn test_abstract_without_override_is_missing_override() {
    let bindings = generate();
    let module = host(&bindings);
    let err = module
        .call_virtual(
            "AbstractMesh_2_2",
            "Scale",
            &OverrideTable::new(),
            vec![Dynamic::Float(2.0)],
        )
        .unwrap_err();
    assert_eq!(
        err,
        DispatchError::MissingOverride {
            instance: "AbstractMesh<2,2>".to_string(),
            method: "Scale".to_string(),
        }
    );
}

#[test]
fn test_override_result_reaches_native_caller() {
    let bindings = generate();
    let module = host(&bindings);
    let overrides = OverrideTable::new().with_override(
        "Scale",
        native_fn(|args| match args {
            [Dynamic::Float(f)] => Ok(Dynamic::Float(f * 10.0)),
            _ => Ok(Dynamic::Void),
        }),
    );
    let outcome = module
        .call_virtual(
            "AbstractMesh_3_3",
            "Scale",
            &overrides,
            vec![Dynamic::Float(1.5)],
        )
        .unwrap();
    assert_eq!(outcome.value, Dynamic::Float(15.0));
    assert_eq!(outcome.terminal(), DispatchState::Dispatch);
}

#[test]
fn test_virtual_without_override_runs_native_default() {
    let bindings = generate();
    let mut module = host(&bindings);
    module.bind_native(
        "PottsMesh_3",
        &signature(&bindings, "PottsMesh_3", "Scale"),
        native_fn(|_| Ok(Dynamic::String("native".to_string()))),
    );
    let outcome = module
        .call_virtual(
            "PottsMesh_3",
            "Scale",
            &OverrideTable::new(),
            vec![Dynamic::Float(1.0)],
        )
        .unwrap();
    assert_eq!(outcome.value, Dynamic::String("native".to_string()));
    assert_eq!(outcome.terminal(), DispatchState::DefaultFallback);
}

#[test]
fn test_inherited_virtual_falls_back_to_base_native() {
    let bindings = generate();
    let mut module = host(&bindings);
    module.bind_native(
        "AbstractMesh_3_3",
        &signature(&bindings, "AbstractMesh_3_3", "GetNumNodes"),
        native_fn(|_| Ok(Dynamic::Int(8))),
    );
    let outcome = module
        .call_virtual("PottsMesh_3", "GetNumNodes", &OverrideTable::new(), Vec::new())
        .unwrap();
    assert_eq!(outcome.value, Dynamic::Int(8));
}

#[test]
fn test_virtual_without_native_reports_it() {
    let bindings = generate();
    let module = host(&bindings);
    let err = module
        .call_virtual(
            "PottsMesh_3",
            "Scale",
            &OverrideTable::new(),
            vec![Dynamic::Float(1.0)],
        )
        .unwrap_err();
    assert!(matches!(err, DispatchError::NoNativeImplementation { .. }));
}

/// `Shape` with a defaulted virtual `Move` and a virtual `Area` that is
/// kept out of the exposed surface.
fn shape_bindings() -> GeneratedBindings {
    let model = DeclarationModel::from_classes([GenericClass::new("Shape")
        .with_method(
            Method::new("Move")
                .with_param(Param::new("dx", TypeRef::named("double")))
                .with_param(
                    Param::new("dy", TypeRef::named("double"))
                        .with_default(DefaultExpr::Literal("0.5".into())),
                )
                .virtual_(),
        )
        .with_method(
            Method::new("Area")
                .returns(TypeRef::named("double"))
                .virtual_()
                .excluded(),
        )]);
    let config = GeneratorConfig::default().with_instantiation("Shape", Vec::new());
    Generator::new(&model, &config)
        .run()
        .expect("Failed to generate bindings")
}

#[test]
fn test_shim_call_fills_omitted_defaults() {
    let bindings = shape_bindings();
    let mut module = host(&bindings);
    module.bind_native(
        "Shape",
        &signature(&bindings, "Shape", "Move"),
        native_fn(|args| Ok(Dynamic::Int(args.len() as i64))),
    );

    let direct = module
        .call("Shape", "Move", vec![Dynamic::Float(1.0)])
        .unwrap();
    let through_shim = module
        .call_virtual("Shape", "Move", &OverrideTable::new(), vec![Dynamic::Float(1.0)])
        .unwrap();
    assert_eq!(direct, Dynamic::Int(2));
    assert_eq!(through_shim.value, Dynamic::Int(2));
    assert_eq!(through_shim.terminal(), DispatchState::DefaultFallback);
}

#[test]
fn test_override_of_unexposed_virtual_runs() {
    let bindings = shape_bindings();
    assert!(!bindings.unit("Shape").unwrap().surface.exposes("Area"));
    let module = host(&bindings);
    let overrides =
        OverrideTable::new().with_override("Area", native_fn(|_| Ok(Dynamic::Float(42.0))));
    let outcome = module
        .call_virtual("Shape", "Area", &overrides, Vec::new())
        .unwrap();
    assert_eq!(outcome.value, Dynamic::Float(42.0));
    assert_eq!(outcome.terminal(), DispatchState::Dispatch);
}

// =============================================================================
// Default expressions
// =============================================================================

#[test]
fn test_constructed_default_is_fresh_on_every_call() {
    let bindings = generate();
    let mut module = host(&bindings);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    module.bind_native(
        "Shape",
        &signature(&bindings, "Shape", "AddVertex"),
        native_fn(move |args| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(args[0].clone())
        }),
    );

    let first = module.call("Shape", "AddVertex", Vec::new()).unwrap();
    let second = module.call("Shape", "AddVertex", Vec::new()).unwrap();
    let first = first.as_object().unwrap();
    let second = second.as_object().unwrap();
    assert_eq!(first.type_name, "Point");
    assert_eq!(second.type_name, "Point");
    assert_ne!(first.id, second.id);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_literal_default_fills_omitted_argument() {
    let bindings = generate();
    let module = host(&bindings);
    let (object, args) = module
        .construct_instance("Point", vec![Dynamic::Float(1.0), Dynamic::Float(2.0)])
        .unwrap();
    assert_eq!(object.as_object().unwrap().type_name, "Point");
    assert_eq!(args[2], Dynamic::Float(0.0));
}

#[test]
fn test_overflowing_default_is_invalid() {
    let module = HostModule::new("all");
    let params = [bindweave::core::BoundParam {
        name: "n".to_string(),
        ty: TypeRef::named("long"),
        default: Some(DefaultExpr::Expr("9223372036854775807 * 2".into())),
    }];
    let err =
        bindweave::core::runtime::bind_arguments("f", &params, Vec::new(), &module).unwrap_err();
    assert!(matches!(err, DispatchError::InvalidDefault { .. }));
}

#[test]
fn test_missing_required_argument() {
    let bindings = generate();
    let module = host(&bindings);
    let err = module
        .construct_instance("Point", vec![Dynamic::Float(1.0)])
        .unwrap_err();
    assert!(matches!(err, DispatchError::NoMatchingOverload { arity: 1, .. }));
}
