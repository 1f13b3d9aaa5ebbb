#![no_main]

use libfuzzer_sys::fuzz_target;
use notafiscal::sefaz::SefazResponse;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Webservice replies are untrusted input.
        let _ = SefazResponse::parse(s);
    }
});
