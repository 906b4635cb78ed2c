//! Test-case evaluation
//!
//! Each answer runs once per test case on a fresh interpreter: reset,
//! bind the case's inputs, register sensors and gauges, run, then compare
//! gauge readings with the case's expectations. The per-case errors fold
//! into one score stored under the evaluator's score label, overwriting
//! any earlier value.

use crate::answer::is_valid_key;
use crate::batch::Batch;
use crate::error::{ArgumentError, CoreError};
use af_interpreter::{InstructionLibrary, Interpreter, InterpreterConfig, Readings, Sensor};
use af_program::{Program, TypeRegistry, Value};
use indexmap::IndexMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Inputs, expected outputs and the gauges that read observed outputs
#[derive(Clone, Default)]
pub struct TestCase {
    /// Variable name to bound value
    pub bindings: IndexMap<String, Value>,
    /// Output name to expected value
    pub expectations: IndexMap<String, Value>,
    /// Output name to probe reading the observed value
    pub gauges: IndexMap<String, Sensor>,
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("bindings", &self.bindings)
            .field("expectations", &self.expectations)
            .field("gauges", &self.gauges.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TestCase {
    /// Create empty test case
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input binding
    #[must_use]
    pub fn with_binding(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    /// Add an expected output
    #[must_use]
    pub fn with_expectation(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.expectations.insert(name.into(), value.into());
        self
    }

    /// Add a gauge
    #[must_use]
    pub fn with_gauge<F>(mut self, name: impl Into<String>, gauge: F) -> Self
    where
        F: Fn(&Interpreter) -> Option<Value> + Send + Sync + 'static,
    {
        self.gauges.insert(name.into(), Arc::new(gauge));
        self
    }

    /// Expectations with no gauge of the same name
    #[must_use]
    pub fn unmeasured(&self) -> Vec<&str> {
        self.expectations
            .keys()
            .filter(|k| !self.gauges.contains_key(*k))
            .map(String::as_str)
            .collect()
    }
}

/// How per-output deviations fold into a score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreRule {
    /// Mean over cases of the summed absolute deviations
    #[default]
    MeanAbsoluteError,
    /// Sum over cases of the summed squared deviations
    SumSquaredError,
}

/// Evaluator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Criterion the score is stored under
    pub score_label: String,
    /// Folding rule
    pub rule: ScoreRule,
    /// Error charged for a gauge that reads nothing
    pub missing_penalty: f64,
    /// Interpreter step limit per run
    pub step_limit: usize,
    /// Reject cases with expectations nothing measures
    pub require_coverage: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            score_label: String::new(),
            rule: ScoreRule::default(),
            missing_penalty: 100_000.0,
            step_limit: InterpreterConfig::default().step_limit,
            require_coverage: false,
        }
    }
}

impl EvaluatorConfig {
    /// Create configuration scoring under `label`
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            score_label: label.into(),
            ..Self::default()
        }
    }

    /// Set folding rule
    #[must_use]
    pub fn with_rule(mut self, rule: ScoreRule) -> Self {
        self.rule = rule;
        self
    }

    /// Set missing reading penalty
    #[must_use]
    pub fn with_missing_penalty(mut self, penalty: f64) -> Self {
        self.missing_penalty = penalty;
        self
    }

    /// Set interpreter step limit
    #[must_use]
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Require every expectation to be measured
    #[must_use]
    pub fn with_required_coverage(mut self, required: bool) -> Self {
        self.require_coverage = required;
        self
    }
}

/// Scores batches of answers against test cases
pub struct TestCaseEvaluator {
    config: EvaluatorConfig,
    instructions: Arc<InstructionLibrary>,
    types: Arc<TypeRegistry>,
    sensors: IndexMap<String, Sensor>,
    raw_results: Mutex<IndexMap<String, Vec<Option<Value>>>>,
}

impl fmt::Debug for TestCaseEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCaseEvaluator")
            .field("config", &self.config)
            .field("sensors", &self.sensors.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl TestCaseEvaluator {
    /// Create evaluator with the builtin libraries
    ///
    /// # Errors
    /// Returns [`ArgumentError::MissingScoreLabel`] for an empty label or
    /// [`ArgumentError::InvalidKey`] for a label that is not identifier-like
    pub fn new(config: EvaluatorConfig) -> Result<Self, ArgumentError> {
        if config.score_label.is_empty() {
            return Err(ArgumentError::MissingScoreLabel);
        }
        if !is_valid_key(&config.score_label) {
            return Err(ArgumentError::InvalidKey(config.score_label));
        }
        Ok(Self {
            config,
            instructions: Arc::new(InstructionLibrary::with_builtins()),
            types: Arc::new(TypeRegistry::with_builtins()),
            sensors: IndexMap::new(),
            raw_results: Mutex::new(IndexMap::new()),
        })
    }

    /// Use a shared instruction library
    #[must_use]
    pub fn with_instructions(mut self, instructions: Arc<InstructionLibrary>) -> Self {
        self.instructions = instructions;
        self
    }

    /// Use a shared type registry
    #[must_use]
    pub fn with_types(mut self, types: Arc<TypeRegistry>) -> Self {
        self.types = types;
        self
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Register a sensor installed on every run next to the case gauges
    pub fn build_sensor<F>(&mut self, name: impl Into<String>, sensor: F)
    where
        F: Fn(&Interpreter) -> Option<Value> + Send + Sync + 'static,
    {
        self.sensors.insert(name.into(), Arc::new(sensor));
    }

    /// Names of evaluator-level sensors
    #[must_use]
    pub fn sensor_names(&self) -> Vec<&str> {
        self.sensors.keys().map(String::as_str).collect()
    }

    /// Readings of every run of the last [`TestCaseEvaluator::evaluate`]
    /// call, per sensor name, in answer-then-case order
    #[must_use]
    pub fn raw_results(&self) -> IndexMap<String, Vec<Option<Value>>> {
        self.raw_results.lock().clone()
    }

    /// Score every answer of `batch` against `cases`
    ///
    /// # Errors
    /// Returns [`ArgumentError::NoTestCases`] for an empty case list, or
    /// [`ArgumentError::UncoveredExpectation`] when coverage is required
    /// and an expectation has no gauge or sensor
    pub fn evaluate(&self, batch: &mut Batch, cases: &[TestCase]) -> Result<(), CoreError> {
        if cases.is_empty() {
            return Err(ArgumentError::NoTestCases.into());
        }
        if self.config.require_coverage {
            self.check_coverage(cases)?;
        }

        let label = self.config.score_label.as_str();
        let runs: Vec<(f64, Vec<Readings>)> = batch
            .par_iter()
            .map(|answer| self.score_program(answer.program(), cases))
            .collect();

        let mut raw: IndexMap<String, Vec<Option<Value>>> = IndexMap::new();
        for (answer, (score, readings)) in batch.iter_mut().zip(runs) {
            answer.set_score(label, score)?;
            for reading in readings {
                for (sensor, value) in reading {
                    raw.entry(sensor).or_default().push(value);
                }
            }
        }
        *self.raw_results.lock() = raw;

        tracing::info!(
            evaluator = label,
            answers = batch.len(),
            cases = cases.len(),
            "batch evaluated"
        );
        Ok(())
    }

    fn check_coverage(&self, cases: &[TestCase]) -> Result<(), ArgumentError> {
        for (i, case) in cases.iter().enumerate() {
            if let Some(output) = case
                .unmeasured()
                .into_iter()
                .find(|name| !self.sensors.contains_key(*name))
            {
                return Err(ArgumentError::UncoveredExpectation {
                    case: i,
                    output: output.to_string(),
                });
            }
        }
        Ok(())
    }

    fn score_program(&self, program: &Program, cases: &[TestCase]) -> (f64, Vec<Readings>) {
        let mut total = 0.0;
        let mut all_readings = Vec::with_capacity(cases.len());

        for case in cases {
            let mut interpreter = Interpreter::new(program.clone())
                .with_instructions(Arc::clone(&self.instructions))
                .with_types(Arc::clone(&self.types))
                .with_config(InterpreterConfig::default().with_step_limit(self.config.step_limit));
            interpreter.reset();
            for (name, value) in &case.bindings {
                interpreter.bind_variable(name.clone(), value.clone());
            }
            for (name, sensor) in self.sensors.iter().chain(case.gauges.iter()) {
                interpreter.register_shared_sensor(name.clone(), Arc::clone(sensor));
            }
            let readings = interpreter.run();

            let mut case_error = 0.0;
            for (output, expected) in &case.expectations {
                // expectations nobody measures are not scored
                let Some(reading) = readings.get(output) else {
                    continue;
                };
                let miss = match reading {
                    Some(observed) => deviation(observed, expected),
                    None => {
                        case_error += self.config.missing_penalty;
                        continue;
                    }
                };
                case_error += match self.config.rule {
                    ScoreRule::MeanAbsoluteError => miss,
                    ScoreRule::SumSquaredError => miss * miss,
                };
            }
            total += case_error;
            all_readings.push(readings);
        }

        #[allow(clippy::cast_precision_loss)]
        let score = match self.config.rule {
            ScoreRule::MeanAbsoluteError => total / cases.len() as f64,
            ScoreRule::SumSquaredError => total,
        };
        (score, all_readings)
    }
}

/// Distance between an observed and an expected value
///
/// Numbers compare by absolute difference; anything else scores 0 when
/// equal and 1 otherwise.
fn deviation(observed: &Value, expected: &Value) -> f64 {
    match (observed.as_f64(), expected.as_f64()) {
        (Some(o), Some(e)) => (o - e).abs(),
        _ if observed == expected => 0.0,
        _ => 1.0,
    }
}
