#![no_main]

use chickenstack_fuzz::verify_program;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (String, String)| {
    let (source, input) = data;
    verify_program(&source, &input);
});
