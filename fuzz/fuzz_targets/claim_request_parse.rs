#![no_main]

use heirloom_vault::ClaimRequest;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(request) = serde_json::from_slice::<ClaimRequest>(data) {
        let json = serde_json::to_vec(&request).unwrap();
        let back: ClaimRequest = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, request);
    }
});
