//! AF Core - answers and the search over them
//!
//! Building blocks of the answer factory:
//! - [`Answer`]: a program with scores, lineage, tags and a category
//! - [`Batch`]: the ordered unit every stage consumes and produces
//! - Search operators that breed new batches from old ones
//! - [`TestCaseEvaluator`]: scores answers by running them on test cases
//! - [`AnswerStore`]: the boundary to a document store
//!
//! # Example
//!
//! ```rust
//! use af_core::prelude::*;
//!
//! let mut batch = Batch::from(vec![Answer::parse("value «int»\n«int» 12").unwrap()]);
//! let evaluator = TestCaseEvaluator::new(EvaluatorConfig::new("error")).unwrap();
//! let case = TestCase::new()
//!     .with_expectation("y", Value::Int(13))
//!     .with_gauge("y", |i| i.peek("int").cloned());
//!
//! evaluator.evaluate(&mut batch, &[case]).unwrap();
//! assert_eq!(batch[0].score("error"), Some(1.0));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod answer;
pub mod batch;
pub mod error;
pub mod evaluator;
pub mod operators;
pub mod persistence;

pub use answer::{is_valid_key, Answer, AnswerId, AnswerRecord, DEFAULT_LANGUAGE};
pub use batch::Batch;
pub use error::{ArgumentError, CoreError, StoreError};
pub use evaluator::{EvaluatorConfig, ScoreRule, TestCase, TestCaseEvaluator};
pub use operators::{
    BlendingCrossover, OperatorOptions, PointCrossover, PointDelete, PointMutation, RandomGuess,
    ResampleAndClone, ResampleValues, SearchOperator, UniformBackboneCrossover,
    DEFAULT_BACKBONE_PROBABILITY,
};
pub use persistence::{AnswerStore, MemoryStore, SaveReceipt};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for breeding and scoring answers
    pub use crate::{
        Answer, ArgumentError, Batch, CoreError, EvaluatorConfig, OperatorOptions, SearchOperator,
        TestCase, TestCaseEvaluator,
    };
    pub use af_program::{Program, TypeRegistry, Value};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
