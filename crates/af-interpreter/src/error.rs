//! Error types for the interpreter
//!
//! Running a program never fails. These errors come from assembling the
//! instruction library an interpreter runs with.

/// Errors raised while configuring an interpreter
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpreterError {
    /// No instruction registered under this name
    #[error("unknown instruction: {0}")]
    UnknownInstruction(String),
}
