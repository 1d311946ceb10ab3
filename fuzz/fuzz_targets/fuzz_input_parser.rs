#![no_main]

use libfuzzer_sys::fuzz_target;
use tapdrag_web::input_parser::parse_encoded_input;

fuzz_target!(|data: &[u8]| {
    // Arbitrary text must parse or fail cleanly, never panic.
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = parse_encoded_input(text);
    }
});
