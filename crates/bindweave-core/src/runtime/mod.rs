//! Runtime side of a binding: values, dispatch and module handles.

mod dispatch;
mod module;
mod value;

pub use dispatch::{
    DispatchOutcome, DispatchState, OverrideTable, ShimKind, ShimTarget, dispatch,
};
pub use module::{
    BoundParam, CONSTRUCTOR_NAME, CallableRegistration, ClassRegistration, HostModule,
    ModuleHandle, ShimRegistration, bind_arguments,
};
pub use value::{Dynamic, NativeFn, ObjectRef, ValueFactory, native_fn};
