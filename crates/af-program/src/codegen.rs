//! Random code synthesis
//!
//! Builds point trees of an exact size from the instruction names,
//! reference names and literal types an operator is allowed to use.

use crate::point::Point;
use crate::program::Program;
use crate::types::TypeRegistry;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// Relative weights of the point kinds drawn by random synthesis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Proportions {
    /// Nested blocks
    pub block: f64,
    /// `do name` leaves
    pub instruction: f64,
    /// `ref name` leaves
    pub reference: f64,
    /// `value «T»` leaves
    pub value: f64,
}

impl Default for Proportions {
    fn default() -> Self {
        Self {
            block: 1.0,
            instruction: 4.0,
            reference: 1.0,
            value: 2.0,
        }
    }
}

impl Proportions {
    fn total(&self) -> f64 {
        self.block.max(0.0) + self.instruction.max(0.0) + self.reference.max(0.0) + self.value.max(0.0)
    }

    /// Share of draws that open a nested block
    fn block_share(&self) -> f64 {
        let total = self.total();
        if total > 0.0 {
            self.block.max(0.0) / total
        } else {
            0.0
        }
    }
}

/// Options for random code and literal generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Exact point count of generated programs
    pub target_size_in_points: usize,
    /// Names usable in `do` points
    pub instruction_names: Vec<String>,
    /// Names usable in `ref` points
    pub reference_names: Vec<String>,
    /// Literal types usable in `value` points
    pub type_names: Vec<String>,
    /// Point kind weights
    pub proportions: Proportions,
    /// Lower bound of random `int` literals
    pub int_min: i64,
    /// Upper bound of random `int` literals
    pub int_max: i64,
    /// Lower bound of random `float` literals
    pub float_min: f64,
    /// Upper bound of random `float` literals
    pub float_max: f64,
    /// Chance a random `bool` literal is `true`
    pub bool_true_probability: f64,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            target_size_in_points: 20,
            instruction_names: Vec::new(),
            reference_names: Vec::new(),
            type_names: Vec::new(),
            proportions: Proportions::default(),
            int_min: -100,
            int_max: 100,
            float_min: -100.0,
            float_max: 100.0,
            bool_true_probability: 0.5,
        }
    }
}

fn owned<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

impl GenerationOptions {
    /// Set target program size
    #[must_use]
    pub fn with_target_size(mut self, points: usize) -> Self {
        self.target_size_in_points = points;
        self
    }

    /// Set instruction names
    #[must_use]
    pub fn with_instruction_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instruction_names = owned(names);
        self
    }

    /// Set reference names
    #[must_use]
    pub fn with_reference_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reference_names = owned(names);
        self
    }

    /// Set literal type names
    #[must_use]
    pub fn with_type_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_names = owned(names);
        self
    }

    /// Set point kind weights
    #[must_use]
    pub fn with_proportions(mut self, proportions: Proportions) -> Self {
        self.proportions = proportions;
        self
    }

    /// Set `int` literal range
    #[must_use]
    pub fn with_int_range(mut self, min: i64, max: i64) -> Self {
        self.int_min = min;
        self.int_max = max;
        self
    }

    /// Set `float` literal range
    #[must_use]
    pub fn with_float_range(mut self, min: f64, max: f64) -> Self {
        self.float_min = min;
        self.float_max = max;
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum LeafKind {
    Block,
    Instruction,
    Reference,
    Value,
}

/// Random point tree with exactly `size` points (at least one)
///
/// Trees of more than one point are rooted at a block.
#[must_use]
pub fn random_point(
    size: usize,
    options: &GenerationOptions,
    types: &TypeRegistry,
    rng: &mut dyn RngCore,
) -> Point {
    if size <= 1 {
        return random_leaf(options, types, rng);
    }

    let nest = options.proportions.block_share();
    let mut remaining = size - 1;
    let mut contents = Vec::new();
    while remaining > 0 {
        let child_size = if remaining > 1 && rng.gen_bool(nest) {
            rng.gen_range(2..=remaining)
        } else {
            1
        };
        contents.push(random_point(child_size, options, types, rng));
        remaining -= child_size;
    }
    Point::block(contents)
}

/// Random program of `options.target_size_in_points` points
#[must_use]
pub fn random_program(
    options: &GenerationOptions,
    types: &TypeRegistry,
    rng: &mut dyn RngCore,
) -> Program {
    Program::from_point(random_point(
        options.target_size_in_points.max(1),
        options,
        types,
        rng,
    ))
}

fn random_leaf(options: &GenerationOptions, types: &TypeRegistry, rng: &mut dyn RngCore) -> Point {
    let usable_types: Vec<&String> = options
        .type_names
        .iter()
        .filter(|name| types.contains(name))
        .collect();

    let weights = &options.proportions;
    let mut kinds: Vec<(LeafKind, f64)> = vec![(LeafKind::Block, weights.block)];
    if !options.instruction_names.is_empty() {
        kinds.push((LeafKind::Instruction, weights.instruction));
    }
    if !options.reference_names.is_empty() {
        kinds.push((LeafKind::Reference, weights.reference));
    }
    if !usable_types.is_empty() {
        kinds.push((LeafKind::Value, weights.value));
    }
    kinds.retain(|(_, weight)| *weight > 0.0);

    let kind = kinds
        .choose_weighted(rng, |(_, weight)| *weight)
        .map_or(LeafKind::Block, |(kind, _)| *kind);

    match kind {
        LeafKind::Block => Point::empty_block(),
        LeafKind::Instruction => options
            .instruction_names
            .choose(rng)
            .map_or_else(Point::empty_block, Point::instruction),
        LeafKind::Reference => options
            .reference_names
            .choose(rng)
            .map_or_else(Point::empty_block, Point::reference),
        LeafKind::Value => usable_types
            .choose(rng)
            .and_then(|name| {
                types
                    .random_value(name, options, rng)
                    .map(|value| Point::literal(name.as_str(), value))
            })
            .unwrap_or_else(Point::empty_block),
    }
}
