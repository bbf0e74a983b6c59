//! Instructions of the ChickenStack language.
use std::fmt;

use num_bigint::BigInt;

/// A single ChickenStack instruction kind.
///
/// The literal payload lives inside [`Op::Push`], so every other kind is
/// guaranteed to carry no value.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Op {
    /// Integer literal, pushes its value.
    Push(BigInt),
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Duplicate,
    Swap,
    Drop,
    Equal,
    GreaterThan,
    PrintNumber,
    PrintChar,
    ReadNumber,
    ReadChar,
    LoopOpen,
    LoopClose,
}

impl Op {
    /// Looks up the operator for a source character.
    ///
    /// Digits are not operators; they are accumulated into [`Op::Push`] by the tokenizer.
    pub fn from_char(c: char) -> Option<Op> {
        Some(match c {
            '+' => Op::Add,
            '-' => Op::Subtract,
            '*' => Op::Multiply,
            '/' => Op::Divide,
            '%' => Op::Modulo,
            ':' => Op::Duplicate,
            '\\' => Op::Swap,
            '$' => Op::Drop,
            '=' => Op::Equal,
            '>' => Op::GreaterThan,
            '.' => Op::PrintNumber,
            '"' => Op::PrintChar,
            ',' => Op::ReadNumber,
            '?' => Op::ReadChar,
            '[' => Op::LoopOpen,
            ']' => Op::LoopClose,
            _ => return None,
        })
    }

    /// The source character of an operator, `None` for literals.
    pub fn symbol(&self) -> Option<char> {
        Some(match self {
            Op::Push(_) => return None,
            Op::Add => '+',
            Op::Subtract => '-',
            Op::Multiply => '*',
            Op::Divide => '/',
            Op::Modulo => '%',
            Op::Duplicate => ':',
            Op::Swap => '\\',
            Op::Drop => '$',
            Op::Equal => '=',
            Op::GreaterThan => '>',
            Op::PrintNumber => '.',
            Op::PrintChar => '"',
            Op::ReadNumber => ',',
            Op::ReadChar => '?',
            Op::LoopOpen => '[',
            Op::LoopClose => ']',
        })
    }

    /// A stable human readable name of the instruction kind.
    pub fn name(&self) -> &'static str {
        match self {
            Op::Push(_) => "IntegerLiteral",
            Op::Add => "Add",
            Op::Subtract => "Subtract",
            Op::Multiply => "Multiply",
            Op::Divide => "Divide",
            Op::Modulo => "Modulo",
            Op::Duplicate => "Duplicate",
            Op::Swap => "Swap",
            Op::Drop => "Drop",
            Op::Equal => "Equal",
            Op::GreaterThan => "GreaterThan",
            Op::PrintNumber => "PrintNumber",
            Op::PrintChar => "PrintChar",
            Op::ReadNumber => "ReadNumber",
            Op::ReadChar => "ReadChar",
            Op::LoopOpen => "LoopOpen",
            Op::LoopClose => "LoopClose",
        }
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, Op::LoopOpen | Op::LoopClose)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Push(value) => write!(f, "{value}"),
            op => write!(f, "{}", op.symbol().unwrap_or('?')),
        }
    }
}

/// A 1-based location in the source text.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A decoded instruction together with where it came from.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Instruction {
    pub op: Op,
    pub position: Position,
}

impl Instruction {
    pub fn new(op: Op, line: usize, column: usize) -> Self {
        Self { op, position: Position::new(line, column) }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.op, f)
    }
}
