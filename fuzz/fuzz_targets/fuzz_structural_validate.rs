#![no_main]

use libfuzzer_sys::fuzz_target;
use notafiscal::xml::StructuralValidator;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Arbitrary XML must produce a report, never a panic.
        let _ = StructuralValidator::new().validate(s);
    }
});
