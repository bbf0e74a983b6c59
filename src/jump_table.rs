//! Matching of loop brackets.
use crate::ops::{Instruction, Op};
use crate::parser::ParserError;

/// How many loops may be open at the same time by default.
pub const DEFAULT_MAX_LOOP_DEPTH: usize = 100;

/// Maps every `[` to its matching `]` and back, by instruction index.
///
/// Entries always come in mutually inverse pairs and never point outside the
/// instruction sequence they were built from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JumpTable {
    targets: Vec<Option<usize>>,
    pairs: usize,
}

impl JumpTable {
    /// The index of the bracket matching the one at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<usize> {
        self.targets.get(index).copied().flatten()
    }

    /// Matched (open, close) pairs, ordered by the open index.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.targets
            .iter()
            .enumerate()
            .filter_map(|(open, close)| close.filter(|&close| close > open).map(|close| (open, close)))
    }

    /// Number of matched loops.
    pub fn len(&self) -> usize {
        self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs == 0
    }

    #[cfg(test)]
    pub(crate) fn from_targets(targets: Vec<Option<usize>>) -> Self {
        let pairs = targets.iter().enumerate().filter(|(i, t)| t.is_some_and(|t| t > *i)).count();
        Self { targets, pairs }
    }

    fn link(&mut self, open: usize, close: usize) {
        self.targets[open] = Some(close);
        self.targets[close] = Some(open);
        self.pairs += 1;
    }
}

/// Builds the jump table, allowing at most [`DEFAULT_MAX_LOOP_DEPTH`] nested loops.
pub fn build_jump_table(instructions: &[Instruction]) -> Result<JumpTable, ParserError> {
    build_jump_table_with_max_depth(instructions, DEFAULT_MAX_LOOP_DEPTH)
}

/// Builds the jump table in a single pass, matching each `]` with the innermost open `[`.
pub fn build_jump_table_with_max_depth(
    instructions: &[Instruction],
    max_depth: usize,
) -> Result<JumpTable, ParserError> {
    let mut table = JumpTable { targets: vec![None; instructions.len()], pairs: 0 };
    let mut open = Vec::new();

    for (index, instruction) in instructions.iter().enumerate() {
        match instruction.op {
            Op::LoopOpen => {
                if open.len() >= max_depth {
                    return Err(ParserError::LoopNestingTooDeep {
                        index,
                        position: instruction.position,
                        max_depth,
                    });
                }
                open.push(index);
            }
            Op::LoopClose => {
                let start = open.pop().ok_or(ParserError::UnmatchedLoopClose {
                    index,
                    position: instruction.position,
                })?;
                table.link(start, index);
            }
            _ => (),
        }
    }

    if !open.is_empty() {
        return Err(ParserError::UnmatchedLoopOpen {
            unclosed: open.into_iter().map(|index| (index, instructions[index].position)).collect(),
        });
    }

    Ok(table)
}
