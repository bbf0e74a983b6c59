//! The input/output collaborator used by the I/O instructions.
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use num_bigint::BigInt;
use num_traits::Zero;

/// Everything the VM needs from the outside world.
///
/// Reads block until input is available.
pub trait Io {
    /// Reads a decimal number. Empty or invalid input reads as zero.
    fn read_number(&mut self) -> io::Result<BigInt>;
    /// Reads one character, `None` at the end of input.
    fn read_char(&mut self) -> io::Result<Option<char>>;
    /// Writes `value` followed by a single space.
    fn print_number(&mut self, value: &BigInt) -> io::Result<()>;
    fn print_char(&mut self, c: char) -> io::Result<()>;
}

fn parse_number(line: &str) -> BigInt {
    line.trim().parse().unwrap_or_else(|_| BigInt::zero())
}

/// Line-buffered console I/O over any reader and writer.
pub struct ConsoleIo<R: BufRead, W: Write> {
    input: R,
    output: W,
    /// The unread rest of the current input line.
    pending: VecDeque<char>,
}

impl ConsoleIo<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleIo<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output, pending: VecDeque::new() }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line)
    }
}

impl<R: BufRead, W: Write> Io for ConsoleIo<R, W> {
    /// Uses the rest of the current line, or the next line when nothing but
    /// whitespace is left of it.
    fn read_number(&mut self) -> io::Result<BigInt> {
        let rest: String = self.pending.drain(..).collect();
        let line = if rest.trim().is_empty() { self.read_line()? } else { rest };
        Ok(parse_number(&line))
    }

    fn read_char(&mut self) -> io::Result<Option<char>> {
        if self.pending.is_empty() {
            let line = self.read_line()?;
            self.pending.extend(line.chars());
        }
        Ok(self.pending.pop_front())
    }

    fn print_number(&mut self, value: &BigInt) -> io::Result<()> {
        write!(self.output, "{value} ")?;
        self.output.flush()
    }

    fn print_char(&mut self, c: char) -> io::Result<()> {
        write!(self.output, "{c}")?;
        self.output.flush()
    }
}

/// In-memory I/O: input comes from a string, output is collected.
///
/// Numbers are read one line at a time, exactly like [`ConsoleIo`].
#[derive(Clone, Debug, Default)]
pub struct BufferIo {
    input: VecDeque<char>,
    output: String,
    /// A character of the current line has been read.
    mid_line: bool,
}

impl BufferIo {
    pub fn new(input: &str) -> Self {
        Self { input: input.chars().collect(), output: String::new(), mid_line: false }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    fn take_line(&mut self) -> String {
        let end = self.input.iter().position(|&c| c == '\n').map_or(self.input.len(), |i| i + 1);
        self.input.drain(..end).collect()
    }
}

impl Io for BufferIo {
    fn read_number(&mut self) -> io::Result<BigInt> {
        let mut line = self.take_line();
        if self.mid_line && line.trim().is_empty() {
            line = self.take_line();
        }
        self.mid_line = false;
        Ok(parse_number(&line))
    }

    fn read_char(&mut self) -> io::Result<Option<char>> {
        let c = self.input.pop_front();
        self.mid_line = c.is_some_and(|c| c != '\n');
        Ok(c)
    }

    fn print_number(&mut self, value: &BigInt) -> io::Result<()> {
        self.output.push_str(&value.to_string());
        self.output.push(' ');
        Ok(())
    }

    fn print_char(&mut self, c: char) -> io::Result<()> {
        self.output.push(c);
        Ok(())
    }
}
