#![no_main]
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Treat the input as a usage response body
    let Ok(body) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    let historical = alliant_energy::usage::parse_historical(&body);
    let projected = alliant_energy::usage::parse_projected(&body);
    let Some(now) = Utc.with_ymd_and_hms(2024, 2, 15, 18, 0, 0).single() else {
        return;
    };

    // Exercise the derivation with whatever survived parsing
    let snapshot = alliant_energy::derive::derive_snapshot(
        historical.as_deref(),
        projected.as_ref(),
        now,
        alliant_energy::config::DEFAULT_CUSTOMER_CHARGE,
    );
    let _ = snapshot.period_days();
});
