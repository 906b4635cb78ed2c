//! Error types for pipeline wiring and runs
//!
//! - [`ConfigurationError`]: the factory is wired wrong; raised before any
//!   machine runs
//! - [`PipelineError`]: anything a run can return

use crate::machine::MachineState;
use af_core::CoreError;

/// Wiring mistakes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// No workstation by this name
    #[error("unknown workstation '{0}'")]
    UnknownWorkstation(String),

    /// Workstation has no machine by this name
    #[error("workstation '{workstation}' has no machine '{machine}'")]
    UnknownMachine { workstation: String, machine: String },

    /// Stage emits on a path with no destination
    #[error("machine '{machine}' emits on unrouted path '{path}'")]
    UnroutedPath { machine: String, path: String },

    /// Name already taken in its scope
    #[error("duplicate name '{0}'")]
    DuplicateName(String),

    /// Library restriction names an unknown instruction or type
    #[error("library has no entry named '{0}'")]
    UnknownLibraryEntry(String),
}

/// Main error type for pipeline runs
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Wiring mistake
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Stage failed
    #[error("stage error: {0}")]
    Stage(#[from] CoreError),

    /// Machine asked to move between states it cannot
    #[error("illegal machine transition {from:?} -> {to:?}")]
    IllegalTransition { from: MachineState, to: MachineState },
}

impl PipelineError {
    /// Check if the factory is wired wrong
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors() {
        let err = PipelineError::from(ConfigurationError::DuplicateName("w".into()));
        assert!(err.is_configuration());
        assert!(!PipelineError::from(CoreError::Stage("x".into())).is_configuration());
        assert_eq!(
            ConfigurationError::UnroutedPath {
                machine: "m".into(),
                path: "created".into()
            }
            .to_string(),
            "machine 'm' emits on unrouted path 'created'"
        );
    }
}
