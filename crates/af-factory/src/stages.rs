//! Processing stages hosted by machines
//!
//! A stage turns the batch a machine pulled from its queue into named
//! output batches. Operators, the evaluator and plain closures all plug in
//! through [`Stage`].

use af_core::{
    Batch, BlendingCrossover, CoreError, OperatorOptions, SearchOperator, TestCase,
    TestCaseEvaluator,
};
use af_program::TypeRegistry;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Output batches keyed by path name
pub type StageOutput = IndexMap<String, Batch>;

/// Path carrying a stage's unchanged input
pub const PARENTS: &str = "parents";
/// Path carrying newly bred answers
pub const CREATED: &str = "created";
/// Path carrying evaluated answers
pub const SCORED: &str = "scored";

/// Processing step of a machine
pub trait Stage: Send {
    /// Paths this stage may emit on
    fn output_paths(&self) -> Vec<String>;

    /// Turn the pulled batch into output batches
    ///
    /// Forwarded answers are taken out of `input`. Whatever a failed call
    /// leaves behind goes back to the machine's queue.
    ///
    /// # Errors
    /// Returns [`CoreError`] if the wrapped operator or evaluator fails
    fn process(&mut self, input: &mut Batch) -> Result<StageOutput, CoreError>;
}

/// Search operator as a stage
///
/// Emits the input on `parents` and the operator's output on `created`.
pub struct OperatorStage {
    operator: Box<dyn SearchOperator>,
    count: Option<usize>,
    overrides: OperatorOptions,
}

impl fmt::Debug for OperatorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorStage")
            .field("operator", &self.operator.name())
            .field("count", &self.count)
            .field("overrides", &self.overrides)
            .finish()
    }
}

impl OperatorStage {
    /// Wrap `operator` with its default count and options
    #[must_use]
    pub fn new(operator: impl SearchOperator + 'static) -> Self {
        Self {
            operator: Box::new(operator),
            count: None,
            overrides: OperatorOptions::default(),
        }
    }

    /// Set per-run multiplicity
    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Set per-run option overrides
    #[must_use]
    pub fn with_overrides(mut self, overrides: OperatorOptions) -> Self {
        self.overrides = overrides;
        self
    }
}

impl Stage for OperatorStage {
    fn output_paths(&self) -> Vec<String> {
        vec![PARENTS.to_string(), CREATED.to_string()]
    }

    fn process(&mut self, input: &mut Batch) -> Result<StageOutput, CoreError> {
        let mut rng = rand::thread_rng();
        let created = self
            .operator
            .generate_with(input, self.count, &self.overrides, &mut rng)?;
        let mut output = StageOutput::new();
        output.insert(PARENTS.to_string(), std::mem::take(input));
        output.insert(CREATED.to_string(), created);
        Ok(output)
    }
}

/// Blending crossover as a stage
///
/// Emits the input on `parents` and the children on `created`.
#[derive(Debug)]
pub struct BlendingCrossoverStage {
    operator: BlendingCrossover,
    children_per_pair: usize,
}

impl BlendingCrossoverStage {
    /// Create stage blending literals through `types`, one child per pair
    #[must_use]
    pub fn new(types: Arc<TypeRegistry>) -> Self {
        Self {
            operator: BlendingCrossover::new(types),
            children_per_pair: 1,
        }
    }

    /// Set how many children each pair produces
    #[must_use]
    pub fn create(mut self, children_per_pair: usize) -> Self {
        self.children_per_pair = children_per_pair;
        self
    }
}

impl Stage for BlendingCrossoverStage {
    fn output_paths(&self) -> Vec<String> {
        vec![PARENTS.to_string(), CREATED.to_string()]
    }

    fn process(&mut self, input: &mut Batch) -> Result<StageOutput, CoreError> {
        let created = self.operator.generate(input, Some(self.children_per_pair))?;
        let mut output = StageOutput::new();
        output.insert(PARENTS.to_string(), std::mem::take(input));
        output.insert(CREATED.to_string(), created);
        Ok(output)
    }
}

/// Test-case evaluator as a stage
///
/// Scores the input in place and emits it on `scored`.
#[derive(Debug)]
pub struct EvaluatorStage {
    evaluator: TestCaseEvaluator,
    cases: Vec<TestCase>,
}

impl EvaluatorStage {
    /// Score against `cases`
    #[must_use]
    pub fn new(evaluator: TestCaseEvaluator, cases: Vec<TestCase>) -> Self {
        Self { evaluator, cases }
    }

    /// Wrapped evaluator
    #[inline]
    #[must_use]
    pub fn evaluator(&self) -> &TestCaseEvaluator {
        &self.evaluator
    }
}

impl Stage for EvaluatorStage {
    fn output_paths(&self) -> Vec<String> {
        vec![SCORED.to_string()]
    }

    fn process(&mut self, input: &mut Batch) -> Result<StageOutput, CoreError> {
        self.evaluator.evaluate(input, &self.cases)?;
        let mut output = StageOutput::new();
        output.insert(SCORED.to_string(), std::mem::take(input));
        Ok(output)
    }
}

type StageFn = dyn FnMut(&mut Batch) -> Result<StageOutput, CoreError> + Send;

/// Closure with declared output paths
///
/// The closure takes what it forwards out of the batch it is handed.
pub struct FnStage {
    paths: Vec<String>,
    body: Box<StageFn>,
}

impl fmt::Debug for FnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStage").field("paths", &self.paths).finish_non_exhaustive()
    }
}

impl FnStage {
    /// Create stage emitting on `paths`
    pub fn new<I, S, F>(paths: I, body: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnMut(&mut Batch) -> Result<StageOutput, CoreError> + Send + 'static,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            body: Box::new(body),
        }
    }
}

impl Stage for FnStage {
    fn output_paths(&self) -> Vec<String> {
        self.paths.clone()
    }

    fn process(&mut self, input: &mut Batch) -> Result<StageOutput, CoreError> {
        (self.body)(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_core::{Answer, EvaluatorConfig, ResampleAndClone};
    use af_program::Value;

    fn crowd() -> Batch {
        vec![
            Answer::parse("value «int»\n«int» 4").unwrap(),
            Answer::parse("do int_add").unwrap(),
        ]
        .into()
    }

    #[test]
    fn operator_stage_splits_parents_and_created() {
        let mut stage = OperatorStage::new(ResampleAndClone::new()).with_count(3);
        let mut input = crowd();
        let output = stage.process(&mut input).unwrap();
        assert_eq!(output.keys().collect::<Vec<_>>(), vec![PARENTS, CREATED]);
        assert_eq!(output[PARENTS].len(), 2);
        assert_eq!(output[CREATED].len(), 3);
        assert!(input.is_empty());
    }

    #[test]
    fn blending_stage_counts_children_per_pair() {
        let mut stage =
            BlendingCrossoverStage::new(Arc::new(TypeRegistry::with_builtins())).create(4);
        let output = stage.process(&mut crowd()).unwrap();
        assert_eq!(output[CREATED].len(), 4);
    }

    #[test]
    fn evaluator_stage_scores() {
        let evaluator = TestCaseEvaluator::new(EvaluatorConfig::new("error")).unwrap();
        let case = TestCase::new()
            .with_expectation("y", Value::Int(4))
            .with_gauge("y", |i| i.peek("int").cloned());
        let mut stage = EvaluatorStage::new(evaluator, vec![case]);
        let output = stage.process(&mut crowd()).unwrap();
        let scored = &output[SCORED];
        assert_eq!(scored[0].score("error"), Some(0.0));
        assert_eq!(scored[1].score("error"), Some(100_000.0));
    }

    #[test]
    fn fn_stage_declares_paths() {
        let mut stage = FnStage::new(["keep"], |batch: &mut Batch| {
            let mut out = StageOutput::new();
            out.insert("keep".to_string(), std::mem::take(batch));
            Ok(out)
        });
        assert_eq!(stage.output_paths(), vec!["keep".to_string()]);
        assert_eq!(stage.process(&mut crowd()).unwrap()["keep"].len(), 2);
    }

    #[test]
    fn failed_operator_leaves_input_in_place() {
        let mut stage = OperatorStage::new(ResampleAndClone::new());
        let mut input = Batch::new();
        assert!(stage.process(&mut input).is_err());

        let mut stage = EvaluatorStage::new(
            TestCaseEvaluator::new(EvaluatorConfig::new("error")).unwrap(),
            Vec::new(),
        );
        let mut input = crowd();
        assert!(stage.process(&mut input).is_err());
        assert_eq!(input.len(), 2);
    }
}
