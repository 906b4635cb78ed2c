use super::{require_answers, OperatorOptions, SearchOperator};
use crate::answer::Answer;
use crate::batch::Batch;
use crate::error::{ArgumentError, CoreError};
use af_program::{Point, Program, TypeRegistry};
use indexmap::IndexMap;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use std::sync::Arc;

/// Default chance of taking a backbone slot from the first parent
pub const DEFAULT_BACKBONE_PROBABILITY: f64 = 0.5;

/// Children stitched slot by slot from the backbones of adjacent pairs
///
/// For each child a random answer and its cyclic successor become the
/// parents. Each slot of the first parent's backbone comes from the first
/// parent with probability `p`, otherwise from the same slot of the second
/// parent (nothing when the second backbone is shorter). The child keeps
/// the first parent's unused footnotes.
#[derive(Debug, Clone, Default)]
pub struct UniformBackboneCrossover {
    defaults: OperatorOptions,
}

impl UniformBackboneCrossover {
    /// Create operator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set default options
    #[must_use]
    pub fn with_options(mut self, defaults: OperatorOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Stitch one child from `mom` and `dad`
    #[must_use]
    pub fn cross(mom: &Program, dad: &Program, probability: f64, rng: &mut dyn RngCore) -> Program {
        let dad_backbone = dad.backbone();
        let slots: Vec<Point> = mom
            .backbone()
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                if rng.gen::<f64>() < probability {
                    Some(slot.clone())
                } else {
                    dad_backbone.get(i).cloned()
                }
            })
            .collect();
        Program::from_point(Point::block(slots)).with_unused_footnotes(mom.unused_footnotes().to_vec())
    }
}

impl SearchOperator for UniformBackboneCrossover {
    fn name(&self) -> &str {
        "UniformBackboneCrossover"
    }

    fn generate_with(
        &self,
        crowd: &Batch,
        count: Option<usize>,
        overrides: &OperatorOptions,
        rng: &mut dyn RngCore,
    ) -> Result<Batch, CoreError> {
        let probability = self
            .defaults
            .merge(overrides)
            .probability
            .unwrap_or(DEFAULT_BACKBONE_PROBABILITY);
        if !(0.0..=1.0).contains(&probability) {
            return Err(ArgumentError::InvalidProbability(probability).into());
        }
        let how_many = count.unwrap_or(crowd.len());
        if how_many > 0 {
            require_answers(self.name(), crowd)?;
        }

        let mut result = Batch::with_capacity(how_many);
        for _ in 0..how_many {
            let place = rng.gen_range(0..crowd.len());
            let mom = &crowd[place];
            let dad = &crowd[(place + 1) % crowd.len()];
            let baby = Self::cross(mom.program(), dad.program(), probability, rng);
            result.push(Answer::offspring(baby, &[mom, dad]));
        }
        tracing::debug!(operator = self.name(), created = result.len(), "backbone crossover");
        Ok(result)
    }
}

/// Children made by grafting a random subtree of one parent into another
///
/// Produces `count` children per input answer, each from two parents drawn
/// with replacement.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointCrossover;

impl PointCrossover {
    /// Create operator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SearchOperator for PointCrossover {
    fn name(&self) -> &str {
        "PointCrossover"
    }

    fn generate_with(
        &self,
        crowd: &Batch,
        count: Option<usize>,
        _overrides: &OperatorOptions,
        rng: &mut dyn RngCore,
    ) -> Result<Batch, CoreError> {
        require_answers(self.name(), crowd)?;
        let production = crowd.len() * count.unwrap_or(1);

        let mut result = Batch::with_capacity(production);
        for _ in 0..production {
            let (Some(mom), Some(dad)) = (crowd.choose(rng), crowd.choose(rng)) else {
                break;
            };
            let receives = rng.gen_range(1..=mom.points());
            let donates = rng.gen_range(1..=dad.points());
            let baby = match dad.program().point(donates) {
                Ok(graft) => mom.replace_point_or_clone(receives, graft),
                Err(_) => mom.program().deep_copy(),
            };
            result.push(Answer::offspring(baby, &[mom, dad]));
        }
        tracing::debug!(operator = self.name(), created = result.len(), "point crossover");
        Ok(result)
    }
}

/// Children blended from pairs of same-language answers
///
/// Answers are grouped by language, each group is shuffled and split into
/// consecutive pairs (a leftover answer pairs with itself), and every pair
/// yields `count` children.
#[derive(Debug, Clone)]
pub struct BlendingCrossover {
    types: Arc<TypeRegistry>,
}

impl BlendingCrossover {
    /// Create operator blending literals through `types`
    #[must_use]
    pub fn new(types: Arc<TypeRegistry>) -> Self {
        Self { types }
    }
}

impl SearchOperator for BlendingCrossover {
    fn name(&self) -> &str {
        "BlendingCrossover"
    }

    fn generate_with(
        &self,
        crowd: &Batch,
        count: Option<usize>,
        _overrides: &OperatorOptions,
        rng: &mut dyn RngCore,
    ) -> Result<Batch, CoreError> {
        let children_per_pair = count.unwrap_or(1);

        let mut groups: IndexMap<&str, Vec<&Answer>> = IndexMap::new();
        for answer in crowd.iter() {
            groups.entry(answer.language()).or_default().push(answer);
        }

        let mut result = Batch::new();
        for (_, mut group) in groups {
            group.shuffle(rng);
            for pair in group.chunks(2) {
                let a = pair[0];
                let b = pair.get(1).copied().unwrap_or(a);
                for _ in 0..children_per_pair {
                    let baby = a.program().blending_crossover(b.program(), &self.types, rng);
                    result.push(Answer::offspring(baby, &[a, b]));
                }
            }
        }
        tracing::debug!(operator = self.name(), created = result.len(), "blending crossover");
        Ok(result)
    }
}
