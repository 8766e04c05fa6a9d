#![no_main]

use heirloom_core::SealedKit;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parsing arbitrary bytes must return Ok or Err, never panic
    if let Ok(kit) = SealedKit::from_bytes(data) {
        let bytes = kit.to_bytes();
        assert_eq!(bytes, data);
        let _ = SealedKit::from_base64(&kit.to_base64());
    }

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = SealedKit::from_base64(text);
    }
});
