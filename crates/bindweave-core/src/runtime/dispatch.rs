//! The override dispatch contract.
//!
//! Every call through a synthesized shim walks the same small state machine:
//!
//! ```text
//! NativeCall -> OverrideLookup -+-> Dispatch            (override found)
//!                               +-> DefaultFallback     (absent, virtual)
//!                               +-> MissingOverride     (absent, abstract)
//! ```
//!
//! `Dispatch` and `DefaultFallback` return a value to the native caller;
//! `MissingOverride` is reported as [`DispatchError::MissingOverride`] and
//! never swallowed.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::{Dynamic, NativeFn};
use crate::error::DispatchError;

/// How a shim behaves when no override exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShimKind {
    /// No native implementation; the override is mandatory.
    Abstract,
    /// Falls back to the native default.
    Virtual,
}

/// States of one call through a shim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Entered from native code.
    NativeCall,
    /// Looking for a dynamic-side override.
    OverrideLookup,
    /// Override found and invoked.
    Dispatch,
    /// No override; native default invoked.
    DefaultFallback,
    /// No override on an abstract method.
    MissingOverride,
}

impl DispatchState {
    /// Whether the call ends in this state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DispatchState::Dispatch | DispatchState::DefaultFallback | DispatchState::MissingOverride
        )
    }
}

/// The method a shim forwards, identified for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimTarget {
    /// Instance the method is invoked on, e.g. `AbstractMesh<2,2>`.
    pub instance: String,
    /// Method name.
    pub method: String,
    /// Abstract or virtual.
    pub kind: ShimKind,
}

/// Overrides supplied by a dynamic-side subclass.
#[derive(Clone, Default)]
pub struct OverrideTable {
    overrides: FxHashMap<String, NativeFn>,
}

impl OverrideTable {
    /// An object with no overrides (constructed purely natively).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an override for `method`.
    pub fn with_override(mut self, method: impl Into<String>, f: NativeFn) -> Self {
        self.overrides.insert(method.into(), f);
        self
    }

    /// Look up an override.
    pub fn find(&self, method: &str) -> Option<&NativeFn> {
        self.overrides.get(method)
    }

    /// Number of overrides.
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    /// Check for no overrides.
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

impl std::fmt::Debug for OverrideTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.overrides.keys().collect();
        names.sort();
        f.debug_struct("OverrideTable")
            .field("overrides", &names)
            .finish()
    }
}

/// Result of a completed dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    /// Value returned to the native caller.
    pub value: Dynamic,
    /// States visited, ending in a terminal state.
    pub trace: Vec<DispatchState>,
}

impl DispatchOutcome {
    /// The terminal state reached.
    pub fn terminal(&self) -> DispatchState {
        self.trace
            .last()
            .copied()
            .unwrap_or(DispatchState::NativeCall)
    }
}

/// Run one call through a shim.
pub fn dispatch(
    target: &ShimTarget,
    overrides: &OverrideTable,
    native_default: Option<&NativeFn>,
    args: &[Dynamic],
) -> Result<DispatchOutcome, DispatchError> {
    let mut trace = vec![DispatchState::NativeCall, DispatchState::OverrideLookup];

    if let Some(f) = overrides.find(&target.method) {
        trace.push(DispatchState::Dispatch);
        let value = f(args)?;
        return Ok(DispatchOutcome { value, trace });
    }

    match target.kind {
        ShimKind::Abstract => {
            tracing::debug!(
                instance = %target.instance,
                method = %target.method,
                "abstract method called without override"
            );
            Err(DispatchError::MissingOverride {
                instance: target.instance.clone(),
                method: target.method.clone(),
            })
        }
        ShimKind::Virtual => {
            trace.push(DispatchState::DefaultFallback);
            let native = native_default.ok_or_else(|| DispatchError::NoNativeImplementation {
                callable: format!("{}.{}", target.instance, target.method),
            })?;
            let value = native(args)?;
            Ok(DispatchOutcome { value, trace })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::native_fn;

    fn target(kind: ShimKind) -> ShimTarget {
        ShimTarget {
            instance: "AbstractMesh<2,2>".to_string(),
            method: "Scale".to_string(),
            kind,
        }
    }

    #[test]
    fn abstract_without_override_is_missing() {
        let err = dispatch(&target(ShimKind::Abstract), &OverrideTable::new(), None, &[])
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
    fn override_wins_over_native() {
        let overrides =
            OverrideTable::new().with_override("Scale", native_fn(|_| Ok(Dynamic::Int(1))));
        let native = native_fn(|_| Ok(Dynamic::Int(2)));
        let outcome =
            dispatch(&target(ShimKind::Virtual), &overrides, Some(&native), &[]).unwrap();
        assert_eq!(outcome.value, Dynamic::Int(1));
        assert_eq!(outcome.terminal(), DispatchState::Dispatch);
    }

    #[test]
    fn virtual_falls_back_to_native() {
        let native = native_fn(|args| Ok(args[0].clone()));
        let outcome = dispatch(
            &target(ShimKind::Virtual),
            &OverrideTable::new(),
            Some(&native),
            &[Dynamic::Float(0.5)],
        )
        .unwrap();
        assert_eq!(outcome.value, Dynamic::Float(0.5));
        assert_eq!(
            outcome.trace,
            vec![
                DispatchState::NativeCall,
                DispatchState::OverrideLookup,
                DispatchState::DefaultFallback
            ]
        );
        assert!(outcome.terminal().is_terminal());
    }

    #[test]
    fn virtual_without_native_reports_it() {
        let err =
            dispatch(&target(ShimKind::Virtual), &OverrideTable::new(), None, &[]).unwrap_err();
        assert!(matches!(err, DispatchError::NoNativeImplementation { .. }));
    }
}
