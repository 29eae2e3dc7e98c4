#![no_main]

use aaa_service::crypto::{decode_public_key, encode_public_key};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    // Decoding arbitrary input must never panic, and anything accepted
    // must survive a second trip through the codec unchanged
    if let Ok(key) = decode_public_key(line) {
        let encoded = encode_public_key(&key);
        let again = decode_public_key(&encoded).expect("re-encoded key must decode");
        assert_eq!(again, key);
    }
});
