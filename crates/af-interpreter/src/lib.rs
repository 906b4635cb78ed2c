//! AF Interpreter - typed multi-stack execution
//!
//! Runs blueprint programs for search operators and for fitness evaluation:
//! - One stack per value type plus an exec stack of pending points
//! - Input bindings read by `ref name` points
//! - Named sensors that read interpreter state after a run
//! - A replaceable [`InstructionLibrary`] with a small builtin set
//!
//! # Example
//!
//! ```rust
//! use af_interpreter::Interpreter;
//! use af_program::{Program, Value};
//!
//! let program = Program::parse("block { ref x value «int» do int_add }\n«int» 5").unwrap();
//! let mut interpreter = Interpreter::new(program);
//! interpreter.bind_variable("x", Value::Int(2));
//! interpreter.register_sensor("y", |i| i.peek("int").cloned());
//!
//! let readings = interpreter.run();
//! assert_eq!(readings["y"], Some(Value::Int(7)));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod builtins;
pub mod error;
pub mod instruction;
pub mod interpreter;

pub use error::InterpreterError;
pub use instruction::{BuiltinInstruction, Instruction, InstructionLibrary};
pub use interpreter::{Interpreter, InterpreterConfig, Readings, Sensor};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running programs
    pub use crate::{Instruction, InstructionLibrary, Interpreter, InterpreterConfig, Sensor};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
