//! Parser fuzz target: feed arbitrary UTF-8 to the MPL front end and, when it parses,
//! run the remaining passes. Nothing may panic; every failure must be a CompileError.
//! Build with: cargo fuzz run parser_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    let mut c = mplc::Compiler::new();
    if mplc::parse_str(&mut c, s, "fuzz.mpl").is_ok() && c.finish(&mplc::NoLocalTags).is_ok() {
        let _ = mplc::backend::render(&c, mplc::CodegenMode::Mpl);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run parser_fuzz");
}
