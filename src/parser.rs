use num_bigint::BigInt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::jump_table::{build_jump_table_with_max_depth, JumpTable, DEFAULT_MAX_LOOP_DEPTH};
use crate::ops::{Instruction, Op, Position};


/// A structural error in the loop brackets of a program.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParserError {
    #[error("Unmatched `]` at {position} (instruction {index}).")]
    UnmatchedLoopClose { index: usize, position: Position },
    #[error("Unclosed `[` at {}.", format_unclosed(.unclosed))]
    UnmatchedLoopOpen {
        /// Every `[` left open, as (instruction index, position), innermost last.
        unclosed: Vec<(usize, Position)>,
    },
    #[error("Loops nested too deeply at {position} (instruction {index}), the maximum depth is {max_depth}.")]
    LoopNestingTooDeep { index: usize, position: Position, max_depth: usize },
}

fn format_unclosed(unclosed: &[(usize, Position)]) -> String {
    unclosed
        .iter()
        .map(|(index, position)| format!("{position} (instruction {index})"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Digits seen so far and where the first one was.
#[derive(Default)]
struct PendingLiteral {
    digits: String,
    position: Position,
}

impl PendingLiteral {
    fn push_digit(&mut self, digit: char, line: usize, column: usize) {
        if self.digits.is_empty() {
            self.position = Position::new(line, column);
        }
        self.digits.push(digit);
    }

    /// Parses the collected digits in one go.
    fn flush(&mut self, instructions: &mut Vec<Instruction>) {
        if self.digits.is_empty() {
            return;
        }
        if let Some(value) = BigInt::parse_bytes(self.digits.as_bytes(), 10) {
            instructions.push(Instruction { op: Op::Push(value), position: self.position });
        }
        self.digits.clear();
    }
}

/// Converts source text into a sequence of instructions.
///
/// Tokenizing never fails: characters that are neither digits, whitespace,
/// comments nor operators are dropped with a warning.
pub fn tokenize(source: &str) -> Vec<Instruction> {
    let mut instructions = Vec::new();
    let mut literal = PendingLiteral::default();
    let mut in_comment = false;
    let mut line = 1;
    let mut column = 0;

    for c in source.chars() {
        if c == '\n' {
            literal.flush(&mut instructions);
            line += 1;
            column = 0;
            in_comment = false;
            continue;
        }
        column += 1;
        if in_comment {
            continue;
        }

        if c.is_ascii_digit() {
            literal.push_digit(c, line, column);
            continue;
        }

        literal.flush(&mut instructions);
        match c {
            '#' => in_comment = true,
            c if c.is_whitespace() => (),
            c => match Op::from_char(c) {
                Some(op) => instructions.push(Instruction::new(op, line, column)),
                None => warn!(line, column, character = ?c, "ignoring unknown character"),
            },
        }
    }
    literal.flush(&mut instructions);

    instructions
}

/// A tokenized program with its loop jump table.
///
/// Both parts are immutable once built, so a program can be run any number of times.
#[derive(Clone, Debug)]
pub struct Program {
    instructions: Vec<Instruction>,
    jump_table: JumpTable,
}

impl Program {
    /// Builds the jump table for `instructions` using [`DEFAULT_MAX_LOOP_DEPTH`].
    pub fn new(instructions: Vec<Instruction>) -> Result<Self, ParserError> {
        Self::with_max_loop_depth(instructions, DEFAULT_MAX_LOOP_DEPTH)
    }

    pub fn with_max_loop_depth(instructions: Vec<Instruction>, max_loop_depth: usize) -> Result<Self, ParserError> {
        let jump_table = build_jump_table_with_max_depth(&instructions, max_loop_depth)?;
        debug!(instructions = instructions.len(), loops = jump_table.len(), "program built");
        Ok(Self { instructions, jump_table })
    }

    /// Pairs instructions with a prebuilt table without validating it.
    #[cfg(test)]
    pub(crate) fn from_parts(instructions: Vec<Instruction>, jump_table: JumpTable) -> Self {
        Self { instructions, jump_table }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn jump_table(&self) -> &JumpTable {
        &self.jump_table
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Tokenizes `source` and builds its jump table.
pub fn parse_program(source: &str) -> Result<Program, ParserError> {
    Program::new(tokenize(source))
}

/// Like [`parse_program`], with a custom limit on loop nesting.
pub fn parse_program_with_max_loop_depth(source: &str, max_loop_depth: usize) -> Result<Program, ParserError> {
    Program::with_max_loop_depth(tokenize(source), max_loop_depth)
}
