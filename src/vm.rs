//! Functions for executing ChickenStack programs.
use std::collections::BTreeMap;
use std::fmt;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{ToPrimitive, Zero};
use thiserror::Error;
use tracing::{debug, trace};

use crate::io::Io;
use crate::ops::{Instruction, Op, Position};
use crate::parser::Program;


/// The default maximum number of values on the stack.
pub const DEFAULT_MAX_STACK_SIZE: usize = 10_000;
/// The default maximum number of instructions executed in one run.
pub const DEFAULT_MAX_ITERATIONS: u64 = 1_000_000;

/// An error that can occur during the execution of a single instruction.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationError {
    #[error("Not enough elements on the stack: {available} elements, {required} required")]
    StackUnderflow { required: usize, available: usize },
    #[error("Adding to a full stack (maximum size {max_stack_size})")]
    StackOverflow { max_stack_size: usize },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Executed more than {max_iterations} instructions, the program probably loops forever")]
    ExecutionLimitExceeded { max_iterations: u64 },
    #[error("Invalid jump target {target} in a program of {len} instructions")]
    InvalidJumpTarget { target: usize, len: usize },
    #[error("Not a valid character code: {value}")]
    InvalidCharCode { value: BigInt },
    #[error("No more input to read")]
    EndOfInput,
    #[error("I/O error: {message}")]
    Io { message: String },
}

impl From<std::io::Error> for OperationError {
    fn from(error: std::io::Error) -> Self {
        OperationError::Io { message: error.to_string() }
    }
}

/// What the dispatcher has to do after an instruction was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Continue after the matching `]`.
    SkipLoop,
    /// Go back to the matching `[`.
    RepeatLoop,
}

/// Options for the ChickenStack virtual machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VMOptions {
    /// The maximum size of the stack.
    pub max_stack_size: usize,
    /// The maximum number of instructions to run, if this is exceeded,
    /// the program will stop with an error.
    ///
    /// Set to [`u64::MAX`] to disable this limit.
    pub max_iterations: u64,
}

impl VMOptions {
    pub fn new(max_stack_size: usize, max_iterations: u64) -> Self {
        Self { max_stack_size, max_iterations }
    }
}

impl Default for VMOptions {
    fn default() -> Self {
        Self { max_stack_size: DEFAULT_MAX_STACK_SIZE, max_iterations: DEFAULT_MAX_ITERATIONS }
    }
}

/// The stack machine: an operand stack and the iteration counter.
///
/// One machine serves one run at a time. Call [`Machine::reset`] between runs
/// to start from an empty stack.
#[derive(Clone, Debug)]
pub struct Machine {
    stack: Vec<BigInt>,
    options: VMOptions,
    iterations: u64,
}

impl Machine {
    pub fn new(options: VMOptions) -> Self {
        Self { stack: Vec::new(), options, iterations: 0 }
    }

    /// Creates a machine with `stack` already on it, bottom first.
    ///
    /// Fails if `stack` does not fit into `options.max_stack_size`.
    pub fn with_stack(options: VMOptions, stack: Vec<BigInt>) -> Result<Self, OperationError> {
        if stack.len() > options.max_stack_size {
            return Err(OperationError::StackOverflow { max_stack_size: options.max_stack_size });
        }
        Ok(Self { stack, options, iterations: 0 })
    }

    pub fn options(&self) -> &VMOptions {
        &self.options
    }

    /// The stack, bottom first.
    pub fn stack(&self) -> &[BigInt] {
        &self.stack
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Clears the stack and the iteration counter.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.iterations = 0;
    }

    pub fn reset_iteration_count(&mut self) {
        self.iterations = 0;
    }

    /// Counts one executed instruction.
    pub fn tick(&mut self) -> Result<(), OperationError> {
        self.iterations += 1;
        if self.iterations > self.options.max_iterations {
            return Err(OperationError::ExecutionLimitExceeded { max_iterations: self.options.max_iterations });
        }
        Ok(())
    }

    pub fn push(&mut self, value: BigInt) -> Result<(), OperationError> {
        if self.stack.len() >= self.options.max_stack_size {
            return Err(OperationError::StackOverflow { max_stack_size: self.options.max_stack_size });
        }
        self.stack.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<BigInt, OperationError> {
        self.stack.pop().ok_or(OperationError::StackUnderflow { required: 1, available: 0 })
    }

    pub fn peek(&self) -> Result<&BigInt, OperationError> {
        self.stack.last().ok_or(OperationError::StackUnderflow { required: 1, available: 0 })
    }

    fn require(&self, required: usize) -> Result<(), OperationError> {
        if self.stack.len() < required {
            return Err(OperationError::StackUnderflow { required, available: self.stack.len() });
        }
        Ok(())
    }

    /// Pops the right operand, then the left one.
    fn pop2(&mut self) -> Result<(BigInt, BigInt), OperationError> {
        self.require(2)?;
        let right = self.pop()?;
        let left = self.pop()?;
        Ok((left, right))
    }

    fn binary(&mut self, f: impl FnOnce(BigInt, BigInt) -> BigInt) -> Result<(), OperationError> {
        let (left, right) = self.pop2()?;
        self.push(f(left, right))
    }

    pub fn add(&mut self) -> Result<(), OperationError> {
        self.binary(|a, b| a + b)
    }

    pub fn subtract(&mut self) -> Result<(), OperationError> {
        self.binary(|a, b| a - b)
    }

    pub fn multiply(&mut self) -> Result<(), OperationError> {
        self.binary(|a, b| a * b)
    }

    /// Fails before popping anything if the divisor on top is zero.
    fn require_divisor(&self) -> Result<(), OperationError> {
        self.require(2)?;
        if self.peek()?.is_zero() {
            return Err(OperationError::DivisionByZero);
        }
        Ok(())
    }

    /// Floor division, rounding towards negative infinity.
    pub fn divide(&mut self) -> Result<(), OperationError> {
        self.require_divisor()?;
        self.binary(|a, b| a.div_floor(&b))
    }

    /// Floor modulo, the result has the sign of the divisor.
    pub fn modulo(&mut self) -> Result<(), OperationError> {
        self.require_divisor()?;
        self.binary(|a, b| a.mod_floor(&b))
    }

    pub fn duplicate(&mut self) -> Result<(), OperationError> {
        let top = self.peek()?.clone();
        self.push(top)
    }

    pub fn swap(&mut self) -> Result<(), OperationError> {
        self.require(2)?;
        let len = self.stack.len();
        self.stack.swap(len - 1, len - 2);
        Ok(())
    }

    /// Removes the top of the stack.
    pub fn drop_top(&mut self) -> Result<(), OperationError> {
        self.pop().map(|_| ())
    }

    pub fn equal(&mut self) -> Result<(), OperationError> {
        self.binary(|a, b| BigInt::from(u8::from(a == b)))
    }

    pub fn greater_than(&mut self) -> Result<(), OperationError> {
        self.binary(|a, b| BigInt::from(u8::from(a > b)))
    }

    /// Prints the top of the stack as a number. An empty stack prints nothing.
    pub fn print_number(&mut self, io: &mut impl Io) -> Result<(), OperationError> {
        if let Some(value) = self.stack.pop() {
            io.print_number(&value)?;
        }
        Ok(())
    }

    /// Fails before popping anything if the top is not a character code.
    pub fn print_char(&mut self, io: &mut impl Io) -> Result<(), OperationError> {
        let top = self.peek()?;
        let c = top
            .to_u32()
            .and_then(char::from_u32)
            .ok_or_else(|| OperationError::InvalidCharCode { value: top.clone() })?;
        self.pop()?;
        Ok(io.print_char(c)?)
    }

    pub fn read_number(&mut self, io: &mut impl Io) -> Result<(), OperationError> {
        let value = io.read_number()?;
        self.push(value)
    }

    pub fn read_char(&mut self, io: &mut impl Io) -> Result<(), OperationError> {
        let c = io.read_char()?.ok_or(OperationError::EndOfInput)?;
        self.push(BigInt::from(u32::from(c)))
    }

    /// Whether a `[` has to skip its body: the stack is empty or its top is zero.
    pub fn loop_exhausted(&self) -> bool {
        self.stack.last().map_or(true, |top| top.is_zero())
    }

    /// Applies the stack effect of one instruction.
    ///
    /// Loop brackets do not move anything here; the returned [`Effect`] tells the
    /// dispatcher where to continue.
    pub fn apply(&mut self, op: &Op, io: &mut impl Io) -> Result<Effect, OperationError> {
        match op {
            Op::Push(value) => self.push(value.clone())?,
            Op::Add => self.add()?,
            Op::Subtract => self.subtract()?,
            Op::Multiply => self.multiply()?,
            Op::Divide => self.divide()?,
            Op::Modulo => self.modulo()?,
            Op::Duplicate => self.duplicate()?,
            Op::Swap => self.swap()?,
            Op::Drop => self.drop_top()?,
            Op::Equal => self.equal()?,
            Op::GreaterThan => self.greater_than()?,
            Op::PrintNumber => self.print_number(io)?,
            Op::PrintChar => self.print_char(io)?,
            Op::ReadNumber => self.read_number(io)?,
            Op::ReadChar => self.read_char(io)?,
            Op::LoopOpen => {
                if self.loop_exhausted() {
                    return Ok(Effect::SkipLoop);
                }
            }
            Op::LoopClose => return Ok(Effect::RepeatLoop),
        }
        Ok(Effect::None)
    }
}

/// A trait for observing the execution of a program.
///
/// You can implement this trait to track any statistics you need.
pub trait Tracer {
    fn instruction(&mut self, ip: usize, instruction: &Instruction, result: &Result<Effect, OperationError>);
}

/// An implementation of [`Tracer`] that does not track anything.
#[derive(Default, Debug, Clone, Copy)]
pub struct NoStats {}

impl Tracer for NoStats {
    #[inline(always)]
    fn instruction(&mut self, _ip: usize, _instruction: &Instruction, _result: &Result<Effect, OperationError>) {}
}

/// Counts how many times each instruction kind was executed.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct OpStats {
    pub counts: BTreeMap<&'static str, u64>,
    pub loop_jumps: u64,
}

impl Tracer for OpStats {
    fn instruction(&mut self, _ip: usize, instruction: &Instruction, result: &Result<Effect, OperationError>) {
        *self.counts.entry(instruction.op.name()).or_default() += 1;
        if matches!(result, Ok(Effect::SkipLoop | Effect::RepeatLoop)) {
            self.loop_jumps += 1;
        }
    }
}

/// A failed run: which instruction failed, why, and the stack at that moment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Instruction {index} ({instruction}) at {position} failed (instruction counter {instruction_counter}): {error}; stack: {}", format_stack(.stack))]
pub struct RunError {
    /// The instruction which failed.
    pub instruction: Op,
    /// The 0-based index of this instruction in the program.
    pub index: usize,
    pub position: Position,
    /// The number of instructions which have been run before this one.
    /// May differ from index in case of loops being present.
    pub instruction_counter: u64,
    /// The specific error within the instruction.
    pub error: OperationError,
    /// The stack when the instruction failed, bottom first.
    pub stack: Vec<BigInt>,
}

/// The successful result of running a program.
#[derive(Debug, Clone)]
pub struct RunResult<T: Tracer> {
    /// The resulting stack after the program has finished, bottom first.
    pub stack: Vec<BigInt>,
    /// The number of instructions which have been run.
    pub instruction_counter: u64,
    pub tracer: T,
}

/// Formats a stack as `[1, 2, 3]`, bottom first.
pub fn format_stack(stack: &[BigInt]) -> String {
    struct Stack<'a>(&'a [BigInt]);
    impl fmt::Display for Stack<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("[")?;
            for (i, value) in self.0.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{value}")?;
            }
            f.write_str("]")
        }
    }
    Stack(stack).to_string()
}

/// Run a program on the given machine.
///
/// The iteration counter is reset first; the stack is kept, so call
/// [`Machine::reset`] before reusing a machine for an unrelated run.
///
/// # Example
/// ```
/// use chickenstack::io::BufferIo;
/// use chickenstack::parser::parse_program;
/// use chickenstack::vm::{format_stack, run, Machine, VMOptions};
///
/// let program = parse_program("5 3 + : .").unwrap();
/// let mut machine = Machine::new(VMOptions::default());
/// let mut io = BufferIo::new("");
/// let result = run(&program, &mut machine, &mut io).unwrap();
/// assert_eq!(io.output(), "8 ");
/// assert_eq!(format_stack(&result.stack), "[8]");
/// ```
pub fn run(program: &Program, machine: &mut Machine, io: &mut impl Io) -> Result<RunResult<NoStats>, RunError> {
    run_with_stats(program, machine, io, NoStats::default())
}

/// Run a program and collect statistics with `tracer`.
/// If you do not need statistics, use the [`run`] function instead.
pub fn run_with_stats<T: Tracer>(
    program: &Program,
    machine: &mut Machine,
    io: &mut impl Io,
    mut tracer: T,
) -> Result<RunResult<T>, RunError> {
    machine.reset_iteration_count();
    run_state(program, machine, io, &mut tracer)?;
    debug!(instructions = machine.iterations(), stack = machine.len(), "program finished");
    Ok(RunResult { stack: machine.stack().to_vec(), instruction_counter: machine.iterations(), tracer })
}

#[inline]
fn run_state<T: Tracer>(
    program: &Program,
    machine: &mut Machine,
    io: &mut impl Io,
    tracer: &mut T,
) -> Result<(), RunError> {
    let instructions = program.instructions();
    let jump_table = program.jump_table();
    let len = instructions.len();

    let jump_target = |ip: usize| -> Result<usize, OperationError> {
        let target = jump_table.get(ip).ok_or(OperationError::InvalidJumpTarget { target: ip, len })?;
        if target >= len {
            return Err(OperationError::InvalidJumpTarget { target, len });
        }
        Ok(target)
    };

    let mut ip = 0;
    while let Some(instruction) = instructions.get(ip) {
        let index = ip;
        let instruction_counter = machine.iterations();
        let build_err = |machine: &Machine, error| RunError {
            instruction: instruction.op.clone(),
            index,
            position: instruction.position,
            instruction_counter,
            error,
            stack: machine.stack().to_vec(),
        };

        machine.tick().map_err(|error| build_err(machine, error))?;
        trace!(ip, op = %instruction.op, stack = machine.len(), "executing");

        let result = machine.apply(&instruction.op, io);
        tracer.instruction(index, instruction, &result);

        ip = match result {
            Err(error) => return Err(build_err(machine, error)),
            Ok(Effect::None) => index + 1,
            Ok(Effect::SkipLoop) => {
                let target = jump_target(index).map_err(|error| build_err(machine, error))?;
                trace!(from = index, to = target + 1, "skipping loop");
                target + 1
            }
            Ok(Effect::RepeatLoop) => {
                let target = jump_target(index).map_err(|error| build_err(machine, error))?;
                trace!(from = index, to = target, "repeating loop");
                target
            }
        };
    }

    Ok(())
}
