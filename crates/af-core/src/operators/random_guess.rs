use super::{OperatorOptions, SearchOperator};
use crate::answer::Answer;
use crate::batch::Batch;
use crate::error::CoreError;
use af_program::{random_program, GenerationOptions, TypeRegistry};
use rand::RngCore;
use std::sync::Arc;

/// Brand-new random answers; the input batch is ignored
#[derive(Debug, Clone)]
pub struct RandomGuess {
    types: Arc<TypeRegistry>,
    defaults: OperatorOptions,
}

impl RandomGuess {
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

impl SearchOperator for RandomGuess {
    fn name(&self) -> &str {
        "RandomGuess"
    }

    fn generate_with(
        &self,
        _crowd: &Batch,
        count: Option<usize>,
        overrides: &OperatorOptions,
        rng: &mut dyn RngCore,
    ) -> Result<Batch, CoreError> {
        let options = self
            .defaults
            .merge(overrides)
            .generation(&GenerationOptions::default());
        let how_many = count.unwrap_or(1);

        let result: Batch = (0..how_many)
            .map(|_| Answer::new(random_program(&options, &self.types, rng)))
            .collect();
        tracing::debug!(operator = self.name(), created = result.len(), "random guesses");
        Ok(result)
    }
}
