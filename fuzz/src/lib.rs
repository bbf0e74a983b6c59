use std::fmt;

use arbitrary::Arbitrary;
use chickenstack::io::BufferIo;
use chickenstack::ops::Op;
use chickenstack::parser::{parse_program, tokenize, ParserError, Program};
use chickenstack::vm::{format_stack, run, Machine, RunError, VMOptions};

/// Small limits so every fuzz case finishes quickly.
pub const FUZZ_OPTIONS: VMOptions = VMOptions { max_stack_size: 1_000, max_iterations: 10_000 };

pub const ALLOWED_TOKENS: &[&str] = &[
    "0", "1", "2", "3", "10", "32", "65", "255", "1114111", "1114112", "99999999999999999999",
    "+", "-", "*", "/", "%", ":", "\\", "$", "=", ">", ".", "\"", ",", "?", "[", "]",
    "\n", "# comment\n", "x",
];

pub struct ArbitraryToken(pub &'static str);

impl<'a> Arbitrary<'a> for ArbitraryToken {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let idx = u.choose_index(ALLOWED_TOKENS.len())?;
        Ok(ArbitraryToken(ALLOWED_TOKENS[idx]))
    }
}

impl fmt::Debug for ArbitraryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.0, f)
    }
}

pub fn tokens_to_source(tokens: &[ArbitraryToken]) -> String {
    tokens.iter().map(|token| token.0).collect::<Vec<_>>().join(" ")
}

/// Prints a regression test reproducing a failing case.
pub struct Repro<'a> {
    pub source: &'a str,
    pub input: &'a str,
}

impl fmt::Display for Repro<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reproduce with:")?;
        writeln!(f, "#[test]")?;
        writeln!(f, "fn fuzz_repro() {{")?;
        writeln!(f, "    verify_program({:?}, {:?});", self.source, self.input)?;
        write!(f, "}}")
    }
}

type Outcome = (Result<(String, u64), RunError>, String);

fn run_once(program: &Program, input: &str) -> Outcome {
    let mut machine = Machine::new(FUZZ_OPTIONS);
    let mut io = BufferIo::new(input);
    let result = run(program, &mut machine, &mut io);
    match &result {
        Ok(result) => {
            assert!(result.stack.len() <= FUZZ_OPTIONS.max_stack_size);
            assert!(result.instruction_counter <= FUZZ_OPTIONS.max_iterations);
        }
        Err(err) => {
            assert!(err.index < program.len(), "{err}");
            assert!(err.stack.len() <= FUZZ_OPTIONS.max_stack_size, "{err}");
            assert!(err.instruction_counter <= FUZZ_OPTIONS.max_iterations, "{err}");
            assert_eq!(program.instructions()[err.index].op, err.instruction);
        }
    }
    let result = result.map(|result| (format_stack(&result.stack), result.instruction_counter));
    (result, io.take_output())
}

fn verify_jump_table(program: &Program) {
    let instructions = program.instructions();
    let table = program.jump_table();
    for (open, close) in table.pairs() {
        assert!(open < close && close < instructions.len());
        assert_eq!(instructions[open].op, Op::LoopOpen);
        assert_eq!(instructions[close].op, Op::LoopClose);
        assert_eq!(table.get(close), Some(open));
    }
    let brackets = instructions.iter().filter(|instruction| instruction.op.is_loop()).count();
    assert_eq!(brackets, 2 * table.len());
}

fn verify_parse_error(source: &str, err: &ParserError) {
    let instructions = tokenize(source);
    match err {
        ParserError::UnmatchedLoopClose { index, position } => {
            assert_eq!(instructions[*index].op, Op::LoopClose);
            assert_eq!(instructions[*index].position, *position);
        }
        ParserError::UnmatchedLoopOpen { unclosed } => {
            assert!(!unclosed.is_empty());
            for (index, position) in unclosed {
                assert_eq!(instructions[*index].op, Op::LoopOpen);
                assert_eq!(instructions[*index].position, *position);
            }
        }
        ParserError::LoopNestingTooDeep { index, .. } => {
            assert_eq!(instructions[*index].op, Op::LoopOpen);
        }
    }
}

/// Parses and runs `source` twice, checking that nothing panics, limits hold
/// and both runs behave the same.
pub fn verify_program(source: &str, input: &str) {
    let program = match parse_program(source) {
        Ok(program) => program,
        Err(err) => return verify_parse_error(source, &err),
    };
    verify_jump_table(&program);

    let first = run_once(&program, input);
    let second = run_once(&program, input);
    assert_eq!(first, second, "{}", Repro { source, input });
}
