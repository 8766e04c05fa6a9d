#![no_main]

use heirloom_core::analyze_claim_code;
use heirloom_core::code::normalize_claim_code;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let normalized = normalize_claim_code(data);
    // Idempotent
    assert_eq!(*normalize_claim_code(&normalized), *normalized);

    let analysis = analyze_claim_code(data);
    assert!(analysis.entropy_bits >= 0.0);
});
