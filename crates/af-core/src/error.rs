//! Error types for answers, operators and evaluation
//!
//! - [`ArgumentError`]: the caller broke an entry point's contract
//! - [`StoreError`]: a persistence collaborator refused a save or load
//! - [`CoreError`]: everything an operator or evaluator call can return

use af_interpreter::InterpreterError;
use af_program::{ParseError, ProgramError, ValueError};

/// Contract violations detected before any work is attempted
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArgumentError {
    /// Operator needs at least one answer to draw from
    #[error("{operator} cannot work on an empty batch")]
    EmptyBatch { operator: String },

    /// Score or tag key is not identifier-like
    #[error("'{0}' is not a valid score or tag key")]
    InvalidKey(String),

    /// Probability outside `[0, 1]`
    #[error("probability {0} is outside [0, 1]")]
    InvalidProbability(f64),

    /// Evaluator has no score label
    #[error("evaluator needs a score label")]
    MissingScoreLabel,

    /// Evaluation called without test cases
    #[error("evaluation needs at least one test case")]
    NoTestCases,

    /// Expectation with no gauge or sensor to read it
    #[error("test case {case} expects '{output}' but nothing measures it")]
    UncoveredExpectation { case: usize, output: String },

    /// Replacement blueprint does not parse
    #[error("replacement point cannot be parsed: {0}")]
    UnparseableReplacement(ParseError),
}

impl ArgumentError {
    /// Create an empty-batch error
    pub fn empty_batch(operator: impl Into<String>) -> Self {
        Self::EmptyBatch {
            operator: operator.into(),
        }
    }
}

/// Errors raised by answer stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No document under this identifier
    #[error("no stored answer with id {0}")]
    NotFound(String),

    /// Answer carries a stale revision
    #[error("revision conflict for {id}: answer has {held:?}, store has {current}")]
    Conflict {
        id: String,
        held: Option<String>,
        current: String,
    },

    /// Document could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Main error type for operator, evaluator and store calls
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Caller contract violation
    #[error("argument error: {0}")]
    Argument(#[from] ArgumentError),

    /// Blueprint failed to parse
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Point index outside a program
    #[error("program error: {0}")]
    Program(#[from] ProgramError),

    /// Unknown literal type in a configuration
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Unknown instruction in a configuration
    #[error("interpreter error: {0}")]
    Interpreter(#[from] InterpreterError),

    /// Persistence failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Custom processing step failed
    #[error("stage failed: {0}")]
    Stage(String),
}

impl CoreError {
    /// Check if the caller passed something it should not have
    #[inline]
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Argument(_) | Self::Parse(_))
    }
}
