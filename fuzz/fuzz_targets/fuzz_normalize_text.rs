#![no_main]

use libfuzzer_sys::fuzz_target;
use notafiscal::core::normalize_text;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let out = normalize_text(s, 255);
        assert!(out.chars().count() <= 255);
    }
});
