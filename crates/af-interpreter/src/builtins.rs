//! Builtin instruction set
//!
//! Arithmetic, comparison and logic over the `int`, `float` and `bool`
//! stacks. Every instruction checks stack depth before popping, so
//! underflow leaves the stacks untouched.

use crate::instruction::BuiltinInstruction;
use crate::interpreter::Interpreter;
use af_program::Value;

pub(crate) const BUILTINS: &[BuiltinInstruction] = &[
    BuiltinInstruction::new("int_add", int_add),
    BuiltinInstruction::new("int_subtract", int_subtract),
    BuiltinInstruction::new("int_multiply", int_multiply),
    BuiltinInstruction::new("int_divide", int_divide),
    BuiltinInstruction::new("int_pop", int_pop),
    BuiltinInstruction::new("int_dup", int_dup),
    BuiltinInstruction::new("int_swap", int_swap),
    BuiltinInstruction::new("int_equal", int_equal),
    BuiltinInstruction::new("int_less_than", int_less_than),
    BuiltinInstruction::new("float_add", float_add),
    BuiltinInstruction::new("float_multiply", float_multiply),
    BuiltinInstruction::new("bool_and", bool_and),
    BuiltinInstruction::new("bool_or", bool_or),
    BuiltinInstruction::new("bool_not", bool_not),
    BuiltinInstruction::new("exec_noop", exec_noop),
];

/// Pop two ints `(a, b)` with `b` on top and push `f(a, b)`
///
/// When `f` declines (returns `None`) both arguments are restored.
fn binary_int<F>(interpreter: &mut Interpreter, f: F)
where
    F: FnOnce(i64, i64) -> Option<Value>,
{
    if interpreter.depth("int") < 2 {
        return;
    }
    let (Some(b), Some(a)) = (interpreter.pop_int(), interpreter.pop_int()) else {
        return;
    };
    match f(a, b) {
        Some(result) => interpreter.push(result),
        None => {
            interpreter.push(Value::Int(a));
            interpreter.push(Value::Int(b));
        }
    }
}

fn binary_float<F>(interpreter: &mut Interpreter, f: F)
where
    F: FnOnce(f64, f64) -> f64,
{
    if interpreter.depth("float") < 2 {
        return;
    }
    let (Some(Value::Float(b)), Some(Value::Float(a))) =
        (interpreter.pop("float"), interpreter.pop("float"))
    else {
        return;
    };
    interpreter.push(Value::Float(f(a, b)));
}

fn binary_bool<F>(interpreter: &mut Interpreter, f: F)
where
    F: FnOnce(bool, bool) -> bool,
{
    if interpreter.depth("bool") < 2 {
        return;
    }
    let (Some(Value::Bool(b)), Some(Value::Bool(a))) =
        (interpreter.pop("bool"), interpreter.pop("bool"))
    else {
        return;
    };
    interpreter.push(Value::Bool(f(a, b)));
}

fn int_add(interpreter: &mut Interpreter) {
    binary_int(interpreter, |a, b| Some(Value::Int(a.wrapping_add(b))));
}

fn int_subtract(interpreter: &mut Interpreter) {
    binary_int(interpreter, |a, b| Some(Value::Int(a.wrapping_sub(b))));
}

fn int_multiply(interpreter: &mut Interpreter) {
    binary_int(interpreter, |a, b| Some(Value::Int(a.wrapping_mul(b))));
}

fn int_divide(interpreter: &mut Interpreter) {
    binary_int(interpreter, |a, b| a.checked_div(b).map(Value::Int));
}

fn int_pop(interpreter: &mut Interpreter) {
    let _ = interpreter.pop("int");
}

fn int_dup(interpreter: &mut Interpreter) {
    if let Some(top) = interpreter.peek("int").cloned() {
        interpreter.push(top);
    }
}

fn int_swap(interpreter: &mut Interpreter) {
    if interpreter.depth("int") < 2 {
        return;
    }
    if let (Some(b), Some(a)) = (interpreter.pop("int"), interpreter.pop("int")) {
        interpreter.push(b);
        interpreter.push(a);
    }
}

fn int_equal(interpreter: &mut Interpreter) {
    binary_int(interpreter, |a, b| Some(Value::Bool(a == b)));
}

fn int_less_than(interpreter: &mut Interpreter) {
    binary_int(interpreter, |a, b| Some(Value::Bool(a < b)));
}

fn float_add(interpreter: &mut Interpreter) {
    binary_float(interpreter, |a, b| a + b);
}

fn float_multiply(interpreter: &mut Interpreter) {
    binary_float(interpreter, |a, b| a * b);
}

fn bool_and(interpreter: &mut Interpreter) {
    binary_bool(interpreter, |a, b| a && b);
}

fn bool_or(interpreter: &mut Interpreter) {
    binary_bool(interpreter, |a, b| a || b);
}

fn bool_not(interpreter: &mut Interpreter) {
    if let Some(Value::Bool(b)) = interpreter.pop("bool") {
        interpreter.push(Value::Bool(!b));
    }
}

fn exec_noop(_interpreter: &mut Interpreter) {}
