//! # chickenstack
//! An interpreter for ChickenStack, a small stack-based esoteric language.
//!
//! A program is a sequence of integer literals and single-character operators
//! working on one stack of arbitrary precision integers:
//!
//! | char | operation | char | operation |
//! |---|---|---|---|
//! | `0`-`9` | integer literal | `=` | equal (1 or 0) |
//! | `+` | add | `>` | greater than (1 or 0) |
//! | `-` | subtract | `.` | print number |
//! | `*` | multiply | `"` | print character |
//! | `/` | floor division | `,` | read number |
//! | `%` | floor modulo | `?` | read character |
//! | `:` | duplicate | `[` | loop while the top is non-zero |
//! | `\` | swap | `]` | end of loop |
//! | `$` | drop | `#` | comment until the end of the line |
//!
//! Binary operators pop the right operand first, so `7 3 -` leaves `4`.
//!
//! ```
//! use chickenstack::io::BufferIo;
//!
//! let mut io = BufferIo::new("");
//! let stack = chickenstack::run_source("5 [ : . 1 - ]", &mut io).unwrap();
//! assert_eq!(io.output(), "5 4 3 2 1 ");
//! assert_eq!(stack.len(), 1);
//! ```
pub mod config;
pub mod io;
pub mod jump_table;
pub mod ops;
pub mod parser;
pub mod vm;

use num_bigint::BigInt;
use thiserror::Error;

use crate::parser::ParserError;
use crate::vm::{Machine, RunError, VMOptions};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParserError),
    #[error(transparent)]
    Run(#[from] RunError),
}

/// Parses and runs `source` on a fresh machine with default limits, returning the final stack.
pub fn run_source(source: &str, io: &mut impl io::Io) -> Result<Vec<BigInt>, Error> {
    let program = parser::parse_program(source)?;
    let mut machine = Machine::new(VMOptions::default());
    Ok(vm::run(&program, &mut machine, io)?.stack)
}
