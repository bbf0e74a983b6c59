use chickenstack_fuzz::verify_program;

#[test]
fn regression_brackets_only() {
    verify_program("]", "");
    verify_program("[", "");
    verify_program("] [", "");
    verify_program("[ ] ]", "");
}

#[test]
fn regression_nesting_over_limit() {
    let source = "[".repeat(101) + &"]".repeat(101);
    verify_program(&source, "");
}

#[test]
fn regression_loops_until_limits() {
    verify_program("1 [ 1 ]", "");
    verify_program("1 [ ]", "");
    verify_program("1 [ : ]", "");
}

#[test]
fn regression_reads_past_end_of_input() {
    verify_program("? ? ?", "a");
    verify_program(", , .", "");
}

#[test]
fn regression_char_codes() {
    verify_program("1114112 \"", "");
    verify_program("55296 \"", "");
    verify_program("0 1 - \"", "");
}

#[test]
fn regression_division_by_zero() {
    verify_program("0 0 /", "");
    verify_program("5 0 %", "");
}

#[test]
fn regression_huge_values() {
    let source = "9".repeat(1000) + " : * : * .";
    verify_program(&source, "");
    verify_program("2 10 [ \\ : * \\ 1 - ] $ .", "");
}

#[test]
fn regression_odd_text() {
    verify_program("\r\n1\r\n2 +", "");
    verify_program("١٢٣ .", "");
    verify_program("# [\n]", "");
}
