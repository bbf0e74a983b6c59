#![no_main]

use std::fmt;

use arbitrary::Arbitrary;
use chickenstack_fuzz::{tokens_to_source, verify_program, ArbitraryToken, Repro};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary)]
struct FuzzInput {
    program: Vec<ArbitraryToken>,
    input: String,
}

impl fmt::Debug for FuzzInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = tokens_to_source(&self.program);
        writeln!(f, "FuzzInput {{")?;
        writeln!(f, "    program: {:?},", self.program)?;
        writeln!(f, "    input: {:?},", self.input)?;
        writeln!(f, "}}")?;
        fmt::Display::fmt(&Repro { source: &source, input: &self.input }, f)
    }
}

fuzz_target!(|data: FuzzInput| {
    if data.program.is_empty() { return } // uninteresting edge case

    verify_program(&tokens_to_source(&data.program), &data.input);
});
