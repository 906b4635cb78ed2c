//! Scoring answers against test cases

use af_core::prelude::*;
use af_core::ScoreRule;
use af_test_utils::{init_tracing, int_case, sample_batch, sample_cases};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn sample_batch_scores_mean_absolute_error() {
    init_tracing();
    let evaluator = TestCaseEvaluator::new(EvaluatorConfig::new("error")).unwrap();
    let mut batch = sample_batch();
    evaluator.evaluate(&mut batch, &sample_cases()).unwrap();

    let scores: Vec<f64> = batch.iter().map(|a| a.score("error").unwrap()).collect();
    assert_eq!(scores, vec![0.5, 9924.5, 100_000.0, 0.5]);
}

#[test]
fn one_run_per_answer_and_case() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let mut evaluator = TestCaseEvaluator::new(EvaluatorConfig::new("error")).unwrap();
    evaluator.build_sensor("runs", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        None
    });

    let mut batch = sample_batch();
    evaluator.evaluate(&mut batch, &sample_cases()).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 8);

    let raw = evaluator.raw_results();
    assert_eq!(raw["y"].len(), 8);
    assert_eq!(raw["runs"].len(), 8);
    assert_eq!(raw["y"][0], Some(Value::Int(12)));
}

#[test]
fn repeated_evaluation_overwrites_score() {
    let mut batch = Batch::from(vec![Answer::parse("value «int»\n«int» 12").unwrap()]);
    let evaluator = TestCaseEvaluator::new(EvaluatorConfig::new("error")).unwrap();

    evaluator.evaluate(&mut batch, &[int_case(0, 12)]).unwrap();
    assert_eq!(batch[0].score("error"), Some(0.0));

    evaluator.evaluate(&mut batch, &[int_case(0, 13)]).unwrap();
    assert_eq!(batch[0].score("error"), Some(1.0));

    evaluator.evaluate(&mut batch, &[int_case(0, 13)]).unwrap();
    assert_eq!(batch[0].score("error"), Some(1.0));
}

#[test]
fn bindings_reach_the_program() {
    let mut batch = Batch::from(vec![Answer::parse("block { ref x ref x do int_add }").unwrap()]);
    let evaluator = TestCaseEvaluator::new(EvaluatorConfig::new("error")).unwrap();
    evaluator
        .evaluate(&mut batch, &[int_case(3, 6), int_case(10, 20)])
        .unwrap();
    assert_eq!(batch[0].score("error"), Some(0.0));
}

#[test]
fn sum_squared_error() {
    let config = EvaluatorConfig::new("sse").with_rule(ScoreRule::SumSquaredError);
    let evaluator = TestCaseEvaluator::new(config).unwrap();
    let mut batch = Batch::from(vec![Answer::parse("value «int»\n«int» 10").unwrap()]);
    evaluator
        .evaluate(&mut batch, &[int_case(0, 12), int_case(0, 13)])
        .unwrap();
    assert_eq!(batch[0].score("sse"), Some(13.0));
}

#[test]
fn no_cases_is_an_argument_error() {
    let evaluator = TestCaseEvaluator::new(EvaluatorConfig::new("error")).unwrap();
    let mut batch = sample_batch();
    let err = evaluator.evaluate(&mut batch, &[]).unwrap_err();
    assert!(err.is_caller_error());
}

#[test]
fn unmeasured_expectations_are_ignored_by_default() {
    let evaluator = TestCaseEvaluator::new(EvaluatorConfig::new("error")).unwrap();
    let mut batch = Batch::from(vec![Answer::parse("do a").unwrap()]);
    let case = TestCase::new().with_expectation("y1", Value::Int(31));
    evaluator.evaluate(&mut batch, &[case]).unwrap();
    assert_eq!(batch[0].score("error"), Some(0.0));
}
