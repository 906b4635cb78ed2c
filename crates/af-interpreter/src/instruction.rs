//! Instructions and the instruction library
//!
//! An instruction reads and writes interpreter stacks. It never fails:
//! when its arguments are missing it leaves the stacks as they were.

use crate::builtins;
use crate::error::InterpreterError;
use crate::interpreter::Interpreter;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Executable instruction referenced by `do name` points
pub trait Instruction: Send + Sync + fmt::Debug {
    /// Name used in blueprints
    fn name(&self) -> &str;

    /// Apply the instruction to the interpreter stacks
    fn execute(&self, interpreter: &mut Interpreter);
}

/// Instruction backed by a plain function
#[derive(Clone, Copy)]
pub struct BuiltinInstruction {
    name: &'static str,
    op: fn(&mut Interpreter),
}

impl BuiltinInstruction {
    /// Create builtin instruction
    #[inline]
    #[must_use]
    pub const fn new(name: &'static str, op: fn(&mut Interpreter)) -> Self {
        Self { name, op }
    }
}

impl fmt::Debug for BuiltinInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BuiltinInstruction").field(&self.name).finish()
    }
}

impl Instruction for BuiltinInstruction {
    fn name(&self) -> &str {
        self.name
    }

    fn execute(&self, interpreter: &mut Interpreter) {
        (self.op)(interpreter);
    }
}

/// Named set of instructions available to programs
#[derive(Clone, Default)]
pub struct InstructionLibrary {
    instructions: IndexMap<String, Arc<dyn Instruction>>,
}

impl fmt::Debug for InstructionLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstructionLibrary")
            .field("instructions", &self.names())
            .finish()
    }
}

impl InstructionLibrary {
    /// Create empty library
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            instructions: IndexMap::new(),
        }
    }

    /// Library holding every builtin instruction
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut library = Self::new();
        for builtin in builtins::BUILTINS {
            library.register(*builtin);
        }
        library
    }

    /// Register an instruction under its own name
    pub fn register<I: Instruction + 'static>(&mut self, instruction: I) {
        self.register_arc(Arc::new(instruction));
    }

    /// Register a shared instruction
    pub fn register_arc(&mut self, instruction: Arc<dyn Instruction>) {
        self.instructions
            .insert(instruction.name().to_string(), instruction);
    }

    /// Sub-library holding only the named instructions
    ///
    /// # Errors
    /// Returns [`InterpreterError::UnknownInstruction`] for the first name
    /// not registered
    pub fn restricted<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, InterpreterError> {
        let mut subset = Self::new();
        for name in names {
            let instruction = self
                .get(name.as_ref())
                .ok_or_else(|| InterpreterError::UnknownInstruction(name.as_ref().to_string()))?;
            subset.register_arc(Arc::clone(instruction));
        }
        Ok(subset)
    }

    /// Look up an instruction
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Instruction>> {
        self.instructions.get(name)
    }

    /// Check if an instruction is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.instructions.contains_key(name)
    }

    /// Registered names, in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.instructions.keys().map(String::as_str).collect()
    }

    /// Number of instructions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if library is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
