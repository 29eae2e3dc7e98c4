#![no_main]

use aaa_service::validators::parse_basic_credentials;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(encoded) = std::str::from_utf8(data) {
        if let Ok(credentials) = parse_basic_credentials(encoded) {
            assert!(!credentials.username().contains(':'));
            assert!(!credentials.domain().contains(':'));
        }
    }
});
