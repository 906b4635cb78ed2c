//! Search operators
//!
//! Every operator turns an input batch into a new batch of answers and
//! never mutates its inputs. Operators carry default options set at
//! construction; each call may override any of them.
//!
//! | operator                     | output size           |
//! |------------------------------|-----------------------|
//! | [`RandomGuess`]              | `count`               |
//! | [`ResampleAndClone`]         | `count`               |
//! | [`ResampleValues`]           | `count` per answer    |
//! | [`UniformBackboneCrossover`] | `count` (batch size)  |
//! | [`PointCrossover`]           | `count` per answer    |
//! | [`PointDelete`]              | `count` per answer    |
//! | [`PointMutation`]            | `count` per answer    |
//! | [`BlendingCrossover`]        | `count` per pair      |

mod crossover;
mod mutation;
mod random_guess;
mod resample;

pub use crossover::{
    BlendingCrossover, PointCrossover, UniformBackboneCrossover, DEFAULT_BACKBONE_PROBABILITY,
};
pub use mutation::{PointDelete, PointMutation};
pub use random_guess::RandomGuess;
pub use resample::{ResampleAndClone, ResampleValues};

use crate::batch::Batch;
use crate::error::{ArgumentError, CoreError};
use af_program::{GenerationOptions, Proportions};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Transformer from an input batch to a batch of new answers
pub trait SearchOperator: Send + Sync {
    /// Operator name, used in logs and errors
    fn name(&self) -> &str;

    /// Generate with explicit overrides and randomness
    ///
    /// `count` is the operator-specific multiplicity; `None` uses the
    /// operator's default.
    ///
    /// # Errors
    /// Returns [`CoreError::Argument`] if the input breaks the operator's
    /// contract
    fn generate_with(
        &self,
        crowd: &Batch,
        count: Option<usize>,
        overrides: &OperatorOptions,
        rng: &mut dyn RngCore,
    ) -> Result<Batch, CoreError>;

    /// Generate with the construction-time options
    ///
    /// # Errors
    /// See [`SearchOperator::generate_with`]
    fn generate(&self, crowd: &Batch, count: Option<usize>) -> Result<Batch, CoreError> {
        self.generate_with(
            crowd,
            count,
            &OperatorOptions::default(),
            &mut rand::thread_rng(),
        )
    }
}

/// Partial generation options; unset fields fall through to defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorOptions {
    /// Size of synthesised code
    pub target_size_in_points: Option<usize>,
    /// Names usable in `do` points
    pub instruction_names: Option<Vec<String>>,
    /// Names usable in `ref` points
    pub reference_names: Option<Vec<String>>,
    /// Literal types usable in `value` points
    pub type_names: Option<Vec<String>>,
    /// Point kind weights
    pub proportions: Option<Proportions>,
    /// Bounds of random `int` literals
    pub int_range: Option<(i64, i64)>,
    /// Bounds of random `float` literals
    pub float_range: Option<(f64, f64)>,
    /// Crossover probability of taking the first parent's slot
    pub probability: Option<f64>,
}

impl OperatorOptions {
    /// Create empty options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set code size
    #[must_use]
    pub fn with_target_size(mut self, points: usize) -> Self {
        self.target_size_in_points = Some(points);
        self
    }

    /// Set instruction names
    #[must_use]
    pub fn with_instruction_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instruction_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set reference names
    #[must_use]
    pub fn with_reference_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reference_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set literal type names
    #[must_use]
    pub fn with_type_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set `int` literal bounds
    #[must_use]
    pub fn with_int_range(mut self, min: i64, max: i64) -> Self {
        self.int_range = Some((min, max));
        self
    }

    /// Set crossover probability
    #[must_use]
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = Some(probability);
        self
    }

    /// These options with every field set in `overrides` replaced
    #[must_use]
    pub fn merge(&self, overrides: &OperatorOptions) -> OperatorOptions {
        OperatorOptions {
            target_size_in_points: overrides.target_size_in_points.or(self.target_size_in_points),
            instruction_names: overrides
                .instruction_names
                .clone()
                .or_else(|| self.instruction_names.clone()),
            reference_names: overrides
                .reference_names
                .clone()
                .or_else(|| self.reference_names.clone()),
            type_names: overrides
                .type_names
                .clone()
                .or_else(|| self.type_names.clone()),
            proportions: overrides.proportions.or(self.proportions),
            int_range: overrides.int_range.or(self.int_range),
            float_range: overrides.float_range.or(self.float_range),
            probability: overrides.probability.or(self.probability),
        }
    }

    /// Full generation options built on `base`
    #[must_use]
    pub fn generation(&self, base: &GenerationOptions) -> GenerationOptions {
        let mut options = base.clone();
        if let Some(points) = self.target_size_in_points {
            options.target_size_in_points = points;
        }
        if let Some(names) = &self.instruction_names {
            options.instruction_names.clone_from(names);
        }
        if let Some(names) = &self.reference_names {
            options.reference_names.clone_from(names);
        }
        if let Some(names) = &self.type_names {
            options.type_names.clone_from(names);
        }
        if let Some(proportions) = self.proportions {
            options.proportions = proportions;
        }
        if let Some((min, max)) = self.int_range {
            options.int_min = min;
            options.int_max = max;
        }
        if let Some((min, max)) = self.float_range {
            options.float_min = min;
            options.float_max = max;
        }
        options
    }
}

/// Fail fast on an empty crowd
fn require_answers(operator: &str, crowd: &Batch) -> Result<(), ArgumentError> {
    if crowd.is_empty() {
        Err(ArgumentError::empty_batch(operator))
    } else {
        Ok(())
    }
}
