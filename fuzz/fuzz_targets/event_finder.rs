#![no_main]

use bf_inference::{EventFinderConfig, EventFitConfig, extract_events, find_events, fit_events};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Keep series short so each input stays fast.
    let q: Vec<f64> = data
        .chunks_exact(8)
        .take(512)
        .map(|c| {
            let mut b = [0u8; 8];
            b.copy_from_slice(c);
            f64::from_le_bytes(b)
        })
        .collect();
    if q.is_empty() {
        return;
    }

    let Ok(series) = bf_core::TimeSeries::uniform(1.0, q, None) else {
        return;
    };
    let Ok(info) = find_events(&series, &EventFinderConfig::default()) else {
        return;
    };
    let events = extract_events(&series, &info);
    let _ = fit_events(&events, &EventFitConfig::default());
});
