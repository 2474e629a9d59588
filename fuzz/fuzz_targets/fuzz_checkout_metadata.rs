#![no_main]
use libfuzzer_sys::fuzz_target;
use stay_booking::domain::checkout::CheckoutMetadata;

// Input is newline-separated `key=value` lines, as a gateway webhook would echo them.
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let pairs: Vec<(&str, &str)> = text
            .lines()
            .filter_map(|line| line.split_once('='))
            .collect();
        if let Ok(metadata) = CheckoutMetadata::from_pairs(&pairs) {
            let _ = metadata.to_pairs();
        }
    }
});
