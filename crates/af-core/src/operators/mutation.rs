use super::{require_answers, OperatorOptions, SearchOperator};
use crate::answer::Answer;
use crate::batch::Batch;
use crate::error::CoreError;
use af_program::{random_point, GenerationOptions, TypeRegistry};
use rand::{Rng, RngCore};
use std::sync::Arc;

/// Mutants with one random point deleted
///
/// Produces `count` mutants per input answer. An invalid index yields a
/// plain copy of the parent.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointDelete;

impl PointDelete {
    /// Create operator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SearchOperator for PointDelete {
    fn name(&self) -> &str {
        "PointDelete"
    }

    fn generate_with(
        &self,
        crowd: &Batch,
        count: Option<usize>,
        _overrides: &OperatorOptions,
        rng: &mut dyn RngCore,
    ) -> Result<Batch, CoreError> {
        let copies = count.unwrap_or(1);
        let mut result = Batch::with_capacity(crowd.len() * copies);
        for dude in crowd.iter() {
            for _ in 0..copies {
                let place = rng.gen_range(1..=dude.points());
                result.push(Answer::offspring(dude.delete_point_or_clone(place), &[dude]));
            }
        }
        tracing::debug!(operator = self.name(), created = result.len(), "points deleted");
        Ok(result)
    }
}

/// Mutants with one random point replaced by fresh random code
///
/// Produces `count` mutants per input answer.
#[derive(Debug, Clone)]
pub struct PointMutation {
    types: Arc<TypeRegistry>,
    defaults: OperatorOptions,
}

impl PointMutation {
    /// Create operator drawing literals from `types`
    #[must_use]
    pub fn new(types: Arc<TypeRegistry>) -> Self {
        Self {
            types,
            defaults: OperatorOptions::default(),
        }
    }

    /// Set default options
    #[must_use]
    pub fn with_options(mut self, defaults: OperatorOptions) -> Self {
        self.defaults = defaults;
        self
    }
}

impl SearchOperator for PointMutation {
    fn name(&self) -> &str {
        "PointMutation"
    }

    fn generate_with(
        &self,
        crowd: &Batch,
        count: Option<usize>,
        overrides: &OperatorOptions,
        rng: &mut dyn RngCore,
    ) -> Result<Batch, CoreError> {
        require_answers(self.name(), crowd)?;
        let options = self
            .defaults
            .merge(overrides)
            .generation(&GenerationOptions::default());
        let copies = count.unwrap_or(1);

        let mut result = Batch::with_capacity(crowd.len() * copies);
        for dude in crowd.iter() {
            for _ in 0..copies {
                let place = rng.gen_range(1..=dude.points());
                let fresh = random_point(options.target_size_in_points.max(1), &options, &self.types, rng);
                result.push(Answer::offspring(dude.replace_point_or_clone(place, &fresh), &[dude]));
            }
        }
        tracing::debug!(operator = self.name(), created = result.len(), "points mutated");
        Ok(result)
    }
}
