//! AF Program - blueprint genomes
//!
//! The program representation evolved by the answer factory:
//! - Parses blueprint text (code section plus `«type» value` footnotes)
//! - Numbers points 1..N in pre-order with O(1) size and O(depth) lookup
//! - Returns new programs from point delete/replace edits
//! - Resolves literal types through an explicit [`TypeRegistry`]
//! - Synthesises random code of an exact size
//!
//! # Example
//!
//! ```rust
//! use af_program::{Point, Program};
//!
//! let program = Program::parse("block {\n  do int_add\n  value «int»\n}\n«int» 12").unwrap();
//! assert_eq!(program.points(), 3);
//!
//! let child = program.replace_point(2, &Point::instruction("int_dup")).unwrap();
//! assert_eq!(child.point(2).unwrap(), &Point::instruction("int_dup"));
//! assert_eq!(program.point(2).unwrap(), &Point::instruction("int_add"));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod codegen;
pub mod error;
pub mod footnote;
mod parser;
pub mod point;
pub mod program;
pub mod types;
pub mod value;

pub use codegen::{random_point, random_program, GenerationOptions, Proportions};
pub use error::{ParseError, ProgramError, ValueError};
pub use footnote::{is_valid_type_name, Footnote};
pub use point::{Block, Literal, Point, PreOrder};
pub use program::Program;
pub use types::{BoolType, CodeType, FloatType, IntType, LiteralType, TypeRegistry};
pub use value::Value;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with programs
    pub use crate::{
        GenerationOptions, LiteralType, ParseError, Point, Program, ProgramError, TypeRegistry,
        Value,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
