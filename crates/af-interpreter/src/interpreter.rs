//! Typed multi-stack interpreter
//!
//! One stack per value type, keyed by [`Value::type_name`], plus an exec
//! stack of points still to run. Execution is total: unknown instructions,
//! unparseable literals and stack underflow are all no-ops, and a step
//! limit halts runaway programs quietly.

use crate::instruction::InstructionLibrary;
use af_program::{Point, Program, TypeRegistry, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Read-out probe evaluated against the interpreter after a run
pub type Sensor = Arc<dyn Fn(&Interpreter) -> Option<Value> + Send + Sync>;

/// Sensor readings by sensor name, in registration order
pub type Readings = IndexMap<String, Option<Value>>;

/// Interpreter limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Points executed before a run halts
    pub step_limit: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self { step_limit: 3000 }
    }
}

impl InterpreterConfig {
    /// Set step limit
    #[must_use]
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }
}

/// Interpreter bound to one program
pub struct Interpreter {
    program: Program,
    exec: Vec<Point>,
    stacks: HashMap<String, Vec<Value>>,
    bindings: HashMap<String, Value>,
    sensors: IndexMap<String, Sensor>,
    instructions: Arc<InstructionLibrary>,
    types: Arc<TypeRegistry>,
    config: InterpreterConfig,
    steps: usize,
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("program", &self.program.root().compact())
            .field("stacks", &self.stacks)
            .field("bindings", &self.bindings)
            .field("sensors", &self.sensors.keys().collect::<Vec<_>>())
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

impl Interpreter {
    /// Interpreter with the builtin instructions and literal types
    #[must_use]
    pub fn new(program: Program) -> Self {
        Self {
            program,
            exec: Vec::new(),
            stacks: HashMap::new(),
            bindings: HashMap::new(),
            sensors: IndexMap::new(),
            instructions: Arc::new(InstructionLibrary::with_builtins()),
            types: Arc::new(TypeRegistry::with_builtins()),
            config: InterpreterConfig::default(),
            steps: 0,
        }
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

    /// Set limits
    #[must_use]
    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    /// Bound program
    #[inline]
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Clear stacks and bindings; sensors stay registered
    pub fn reset(&mut self) {
        self.exec.clear();
        self.stacks.clear();
        self.bindings.clear();
        self.steps = 0;
    }

    /// Install an input binding read by `ref name`
    pub fn bind_variable(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Current binding of `name`
    #[inline]
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Install a read-out probe
    pub fn register_sensor<F>(&mut self, name: impl Into<String>, probe: F)
    where
        F: Fn(&Interpreter) -> Option<Value> + Send + Sync + 'static,
    {
        self.register_shared_sensor(name, Arc::new(probe));
    }

    /// Install an already shared probe
    pub fn register_shared_sensor(&mut self, name: impl Into<String>, probe: Sensor) {
        self.sensors.insert(name.into(), probe);
    }

    /// Registered sensor names
    #[must_use]
    pub fn sensor_names(&self) -> Vec<&str> {
        self.sensors.keys().map(String::as_str).collect()
    }

    /// Run the program to completion (or the step limit) and read every sensor
    pub fn run(&mut self) -> Readings {
        self.exec.clear();
        self.exec.push(self.program.root().clone());
        self.steps = 0;

        while let Some(point) = self.exec.pop() {
            if self.steps >= self.config.step_limit {
                tracing::debug!(
                    step_limit = self.config.step_limit,
                    pending = self.exec.len() + 1,
                    "step limit reached, halting"
                );
                self.exec.clear();
                break;
            }
            self.steps += 1;
            self.step(point);
        }

        self.read_sensors()
    }

    /// Evaluate every sensor against the current state
    #[must_use]
    pub fn read_sensors(&self) -> Readings {
        self.sensors
            .iter()
            .map(|(name, probe)| (name.clone(), probe(self)))
            .collect()
    }

    /// Evaluate one sensor
    #[must_use]
    pub fn read_sensor(&self, name: &str) -> Option<Value> {
        self.sensors.get(name).and_then(|probe| probe(self))
    }

    fn step(&mut self, point: Point) {
        match point {
            Point::Block(block) => {
                self.exec.extend(block.into_contents().into_iter().rev());
            }
            Point::Instruction(name) => {
                if let Some(instruction) = self.instructions.get(&name).map(Arc::clone) {
                    instruction.execute(self);
                } else {
                    tracing::trace!(instruction = %name, "unknown instruction skipped");
                }
            }
            Point::Reference(name) => {
                let value = self
                    .bindings
                    .get(&name)
                    .cloned()
                    .unwrap_or(Value::Name(name));
                self.push(value);
            }
            Point::Literal(lit) => match self.types.parse_value(&lit.type_name, &lit.value) {
                Ok(value) => self.push(value),
                Err(err) => tracing::trace!(error = %err, "literal skipped"),
            },
        }
    }

    /// Push a value onto the stack of its type
    pub fn push(&mut self, value: Value) {
        self.stacks
            .entry(value.type_name().to_string())
            .or_default()
            .push(value);
    }

    /// Pop the top of a stack
    pub fn pop(&mut self, type_name: &str) -> Option<Value> {
        self.stacks.get_mut(type_name).and_then(Vec::pop)
    }

    /// Pop the top of the `int` stack
    pub fn pop_int(&mut self) -> Option<i64> {
        match self.pop("int") {
            Some(Value::Int(i)) => Some(i),
            _ => None,
        }
    }

    /// Top of a stack
    #[must_use]
    pub fn peek(&self, type_name: &str) -> Option<&Value> {
        self.stacks.get(type_name).and_then(|stack| stack.last())
    }

    /// Number of values on a stack
    #[must_use]
    pub fn depth(&self, type_name: &str) -> usize {
        self.stacks.get(type_name).map_or(0, Vec::len)
    }

    /// Whole stack, bottom first
    #[must_use]
    pub fn stack(&self, type_name: &str) -> &[Value] {
        self.stacks.get(type_name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Points executed by the last run
    #[inline]
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(blueprint: &str) -> Interpreter {
        let mut interpreter = Interpreter::new(Program::parse(blueprint).unwrap());
        let _ = interpreter.run();
        interpreter
    }

    #[test]
    fn literal_pushes_onto_its_stack() {
        let interpreter = run("value «int»\n«int» 12");
        assert_eq!(interpreter.peek("int"), Some(&Value::Int(12)));
        assert_eq!(interpreter.steps(), 1);
    }

    #[test]
    fn blocks_run_in_order() {
        let interpreter = run(
            "block {\n  value «int»\n  value «int»\n  do int_subtract\n}\n«int» 10\n«int» 3",
        );
        assert_eq!(interpreter.stack("int"), &[Value::Int(7)]);
    }

    #[test]
    fn references_read_bindings_or_push_names() {
        let mut interpreter =
            Interpreter::new(Program::parse("block { ref x ref y do int_dup }").unwrap());
        interpreter.bind_variable("x", Value::Int(4));
        let _ = interpreter.run();
        assert_eq!(interpreter.stack("int"), &[Value::Int(4), Value::Int(4)]);
        assert_eq!(interpreter.peek("name"), Some(&Value::Name("y".into())));
    }

    #[test]
    fn underflow_and_unknown_instructions_are_noops() {
        let interpreter = run("block { value «int» do int_add do warp_drive do bool_not }\n«int» 5");
        assert_eq!(interpreter.stack("int"), &[Value::Int(5)]);
        assert_eq!(interpreter.depth("bool"), 0);
    }

    #[test]
    fn divide_by_zero_leaves_arguments() {
        let interpreter =
            run("block { value «int» value «int» do int_divide }\n«int» 9\n«int» 0");
        assert_eq!(interpreter.stack("int"), &[Value::Int(9), Value::Int(0)]);
    }

    #[test]
    fn unparseable_literal_is_skipped() {
        let interpreter = run("block { value «int» value «mystery» }\n«int» nope\n«mystery» 1");
        assert_eq!(interpreter.depth("int"), 0);
        assert_eq!(interpreter.depth("mystery"), 0);
    }

    #[test]
    fn step_limit_halts_quietly() {
        let program = Program::parse("block { do exec_noop do exec_noop do exec_noop do exec_noop }")
            .unwrap();
        let mut interpreter =
            Interpreter::new(program).with_config(InterpreterConfig::default().with_step_limit(3));
        let _ = interpreter.run();
        assert_eq!(interpreter.steps(), 3);
    }

    #[test]
    fn reset_keeps_sensors() {
        let mut interpreter = Interpreter::new(Program::parse("value «int»\n«int» 1").unwrap());
        interpreter.register_sensor("top", |i| i.peek("int").cloned());
        interpreter.bind_variable("x", Value::Int(3));
        let first = interpreter.run();
        interpreter.reset();
        assert_eq!(interpreter.depth("int"), 0);
        assert!(interpreter.binding("x").is_none());
        assert_eq!(interpreter.sensor_names(), vec!["top"]);
        assert_eq!(first.get("top"), Some(&Some(Value::Int(1))));
    }
}
