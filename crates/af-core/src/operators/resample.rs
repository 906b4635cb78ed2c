use super::{require_answers, OperatorOptions, SearchOperator};
use crate::answer::Answer;
use crate::batch::Batch;
use crate::error::CoreError;
use af_program::{GenerationOptions, TypeRegistry};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use std::sync::Arc;

/// Clones of answers drawn uniformly with replacement
#[derive(Debug, Clone, Copy, Default)]
pub struct ResampleAndClone;

impl ResampleAndClone {
    /// Create operator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SearchOperator for ResampleAndClone {
    fn name(&self) -> &str {
        "ResampleAndClone"
    }

    fn generate_with(
        &self,
        crowd: &Batch,
        count: Option<usize>,
        _overrides: &OperatorOptions,
        rng: &mut dyn RngCore,
    ) -> Result<Batch, CoreError> {
        let how_many = count.unwrap_or(1);
        if how_many > 0 {
            require_answers(self.name(), crowd)?;
        }

        let mut result = Batch::with_capacity(how_many);
        for _ in 0..how_many {
            if let Some(donor) = crowd.choose(rng) {
                result.push(Answer::offspring(donor.program().deep_copy(), &[donor]));
            }
        }
        tracing::debug!(operator = self.name(), created = result.len(), "clones drawn");
        Ok(result)
    }
}

/// Mutants with every footnote literal re-drawn from its type
///
/// The code section is left as it is. Literals of unregistered types keep
/// their original text.
#[derive(Debug, Clone)]
pub struct ResampleValues {
    types: Arc<TypeRegistry>,
    defaults: OperatorOptions,
}

impl ResampleValues {
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

impl SearchOperator for ResampleValues {
    fn name(&self) -> &str {
        "ResampleValues"
    }

    fn generate_with(
        &self,
        crowd: &Batch,
        count: Option<usize>,
        overrides: &OperatorOptions,
        rng: &mut dyn RngCore,
    ) -> Result<Batch, CoreError> {
        let merged = self.defaults.merge(overrides);
        let base = merged.generation(&GenerationOptions::default());
        let copies = count.unwrap_or(1);

        let mut result = Batch::with_capacity(crowd.len() * copies);
        for dude in crowd.iter() {
            // Code literals default to at most half the parent's size
            let half = dude.points() / 2;
            for _ in 0..copies {
                let program = dude.program().map_literals(|type_name, value| {
                    let size = merged
                        .target_size_in_points
                        .unwrap_or_else(|| if half == 0 { 0 } else { rng.gen_range(0..half) });
                    let options = base.clone().with_target_size(size);
                    self.types
                        .random_value(type_name, &options, rng)
                        .unwrap_or_else(|| value.to_string())
                });
                result.push(Answer::offspring(program, &[dude]));
            }
        }
        tracing::debug!(operator = self.name(), created = result.len(), "values resampled");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn clone_of_single_answer_is_textually_identical() {
        let donor = Answer::parse("block {\n  do int_add\n  value «int»\n}\n«int» 4")
            .unwrap()
            .with_progress(2);
        let crowd = Batch::from(vec![donor.clone()]);
        let mut rng = StdRng::seed_from_u64(0);
        let result = ResampleAndClone::new()
            .generate_with(&crowd, Some(1), &OperatorOptions::new(), &mut rng)
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].blueprint(), donor.blueprint());
        assert_eq!(result[0].progress(), 3);
        assert_eq!(result[0].ancestors(), &[donor.id()]);
    }

    #[test]
    fn clone_needs_a_donor() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = ResampleAndClone::new()
            .generate_with(&Batch::new(), Some(2), &OperatorOptions::new(), &mut rng)
            .unwrap_err();
        assert!(err.is_caller_error());
    }

    #[test]
    fn resampled_values_keep_code() {
        let dude = Answer::parse(
            "block {\n  value «int»\n  value «mystery»\n}\n«int» 5\n«mystery» ??\n«int» 77",
        )
        .unwrap();
        let crowd = Batch::from(vec![dude.clone()]);
        let op = ResampleValues::new(Arc::new(TypeRegistry::with_builtins()))
            .with_options(OperatorOptions::new().with_int_range(1000, 1010));
        let mut rng = StdRng::seed_from_u64(12);
        let result = op
            .generate_with(&crowd, Some(3), &OperatorOptions::new(), &mut rng)
            .unwrap();

        assert_eq!(result.len(), 3);
        for mutant in result.iter() {
            assert_eq!(mutant.program().code_section(), dude.program().code_section());
            let notes = mutant.program().footnotes();
            assert_eq!(notes.len(), 3);
            assert!((1000..=1010).contains(&notes[0].value.parse::<i64>().unwrap()));
            assert_eq!(notes[1].value, "??");
            assert!((1000..=1010).contains(&notes[2].value.parse::<i64>().unwrap()));
            assert_eq!(mutant.progress(), 1);
        }
    }
}
