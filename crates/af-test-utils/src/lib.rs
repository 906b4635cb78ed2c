//! Testing utilities for the answer factory workspace
//!
//! Shared fixtures for integration tests and a tracing switch.

#![allow(missing_docs)]

use af_core::{Answer, Batch, TestCase};
use af_interpreter::Interpreter;
use af_program::Value;
use tracing_subscriber::EnvFilter;

/// Blueprints of the four-answer scoring fixture
pub const SAMPLE_BLUEPRINTS: [&str; 4] = [
    "value «int»\n«int» 12",
    "value «int»\n«int» -9912",
    "value «bool»\n«bool» false",
    "block { value «int» value «int»}\n«int» 99\n«int» 12",
];

/// Install a fmt subscriber filtered by `RUST_LOG`; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn answer(blueprint: &str) -> Answer {
    Answer::parse(blueprint).unwrap()
}

pub fn batch_of(blueprints: &[&str]) -> Batch {
    blueprints.iter().map(|b| answer(b)).collect()
}

pub fn sample_batch() -> Batch {
    batch_of(&SAMPLE_BLUEPRINTS)
}

/// Gauge reading the top of the `int` stack
pub fn int_top(interpreter: &Interpreter) -> Option<Value> {
    interpreter.peek("int").cloned()
}

/// Case binding `x` and expecting `y` on top of the `int` stack
pub fn int_case(x: i64, y: i64) -> TestCase {
    TestCase::new()
        .with_binding("x", Value::Int(x))
        .with_expectation("y", Value::Int(y))
        .with_gauge("y", int_top)
}

/// The two cases the sample batch is scored against
pub fn sample_cases() -> Vec<TestCase> {
    vec![int_case(77, 12), int_case(78, 13)]
}

/// `block { do p0 do p1 ... }` with `n` instructions
pub fn chain(prefix: &str, n: usize) -> String {
    let body: Vec<String> = (0..n).map(|i| format!("do {prefix}{i}")).collect();
    format!("block {{ {} }}", body.join(" "))
}
