//! Bindweave
//!
//! Generates runtime bindings for generic native class hierarchies: every
//! requested `(class, arguments)` instantiation becomes one binding unit,
//! bases are pulled in and registered first, and polymorphic classes get an
//! override shim so a dynamic subclass can implement virtual methods.
//!
//! ```no_run
//! use bindweave::prelude::*;
//!
//! let model = load_declarations("meshes.json")?;
//! let config = GeneratorConfig::load("bindweave.toml")?;
//! let bindings = Generator::new(&model, &config).run()?;
//! bindweave::write_bindings(&bindings, "generated")?;
//! # Ok::<(), bindweave::Error>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use bindweave_core as core;
pub use bindweave_generator as generator;
pub use bindweave_registry as registry;

pub use bindweave_core::{
    BindError, DeclarationModel, DispatchError, GenerationError, HostModule, InstanceKey,
    ModuleError, ModuleHandle, OwnershipModel, TemplateArg, TypeRef,
};
pub use bindweave_generator::{
    BindingUnit, ConfigError, GeneratedBindings, GenerationFailure, Generator, GeneratorConfig,
    load_declarations,
};

/// Errors from the file-level entry points.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Generation(#[from] GenerationFailure),

    #[error("cannot write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Load a declaration model and a config file, then run the generator.
pub fn generate_from_files(
    declarations: impl AsRef<Path>,
    config: impl AsRef<Path>,
) -> Result<GeneratedBindings, Error> {
    let model = load_declarations(declarations)?;
    let config = GeneratorConfig::load(config)?;
    Ok(Generator::new(&model, &config).run()?)
}

/// Write every artifact of a run into `dir`.
///
/// Returns the written paths: a source and a header per unit in
/// registration order, then the module assembly and the header collection.
pub fn write_bindings(
    bindings: &GeneratedBindings,
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, Error> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|source| Error::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<(String, String)> = bindings
        .units
        .iter()
        .flat_map(|unit| {
            [
                (unit.file_name(), unit.render()),
                (unit.header_name(), unit.render_header()),
            ]
        })
        .collect();
    files.push((bindings.assembly.file_name(), bindings.assembly.render()));
    files.push((
        bindings.headers.file_name().to_string(),
        bindings.headers.render(),
    ));

    let mut written = Vec::with_capacity(files.len());
    for (name, text) in files {
        let path = dir.join(name);
        fs::write(&path, text).map_err(|source| Error::Write {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }
    tracing::info!(dir = %dir.display(), files = written.len(), "bindings written");
    Ok(written)
}

pub mod prelude {
    pub use bindweave_core::runtime::{OverrideTable, native_fn};
    pub use bindweave_core::{
        DeclarationModel, DispatchError, Dynamic, GenerationError, GenericClass, HostModule,
        InstanceKey, ModuleError, ModuleHandle, OwnershipModel, ShimKind, TypeRef,
    };
    pub use bindweave_generator::{
        BindingUnit, ClassConfig, GeneratedBindings, GenerationFailure, Generator,
        GeneratorConfig, load_declarations,
    };
}
