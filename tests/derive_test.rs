use alliant_energy::config::DEFAULT_CUSTOMER_CHARGE;
use alliant_energy::derive::{average_period_days, derive_snapshot, sorted_periods};
use alliant_energy::usage::{HistoricalReading, ProjectedUsage};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};

fn reading(from: &str, to: &str, amount: Value, consumption: Value) -> HistoricalReading {
    HistoricalReading {
        reading_from: Some(from.to_string()),
        reading_to: Some(to.to_string()),
        amount,
        consumption,
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
}

fn history() -> Vec<HistoricalReading> {
    vec![
        reading("2023-11-30T00:00:00", "2023-12-29T00:00:00", json!(98.4), json!(640)),
        reading("2023-12-29T00:00:00", "2024-01-31T00:00:00", json!("131.20"), json!("905")),
        reading("2024-01-31T00:00:00", "2024-02-29T00:00:00", json!(117.05), json!(790)),
    ]
}

fn projected(so_far_amount: Value, projected_amount: Value) -> ProjectedUsage {
    ProjectedUsage {
        so_far_this_month_projected_consumption: json!(210.0),
        projected_consumption: json!(700.0),
        average_this_year_consumption: json!(750.0),
        so_far_this_month_projected_amount: so_far_amount,
        projected_amount,
        average_this_year_amount: json!(110.25),
    }
}

#[test]
fn single_period_rate() {
    let readings = vec![reading(
        "2024-01-01T00:00:00",
        "2024-02-01T00:00:00",
        json!(120.00),
        json!(800),
    )];
    let snap = derive_snapshot(Some(readings.as_slice()), None, now(), DEFAULT_CUSTOMER_CHARGE);
    let rate = snap.cost_per_kwh.unwrap();
    let energy_cost = rate * 800.0;
    assert!((energy_cost - 104.7108).abs() < 1e-9);
    assert!((rate - 0.1309).abs() < 5e-5);
}

#[test]
fn average_length_rounds_half_to_even() {
    // 28 + 31 days -> 29.5 -> 30
    let readings = vec![
        reading("2024-01-01", "2024-01-29", json!(50), json!(300)),
        reading("2024-01-29", "2024-02-29", json!(60), json!(400)),
    ];
    let periods = sorted_periods(&readings);
    assert_eq!(average_period_days(&periods), Some(30));

    let snap = derive_snapshot(Some(readings.as_slice()), None, now(), DEFAULT_CUSTOMER_CHARGE);
    assert_eq!(
        snap.end_date,
        Some(Utc.with_ymd_and_hms(2024, 3, 30, 0, 0, 0).unwrap())
    );

    // 30 + 31 days -> 30.5 -> 30
    let readings = vec![
        reading("2024-03-01", "2024-03-31", json!(50), json!(300)),
        reading("2024-03-31", "2024-05-01", json!(60), json!(400)),
    ];
    assert_eq!(average_period_days(&sorted_periods(&readings)), Some(30));
}

#[test]
fn output_ignores_input_order() {
    let ordered = history();
    let expected = derive_snapshot(
        Some(ordered.as_slice()),
        Some(&projected(json!(0), json!(0))),
        now(),
        DEFAULT_CUSTOMER_CHARGE,
    );

    let permutations = [[2, 0, 1], [1, 2, 0], [2, 1, 0], [0, 2, 1]];
    for order in permutations {
        let shuffled: Vec<_> = order.iter().map(|&i| ordered[i].clone()).collect();
        let snap = derive_snapshot(
            Some(shuffled.as_slice()),
            Some(&projected(json!(0), json!(0))),
            now(),
            DEFAULT_CUSTOMER_CHARGE,
        );
        assert_eq!(snap, expected);
    }
}

#[test]
fn sorting_is_idempotent() {
    let mut readings = history();
    readings.reverse();
    let once = sorted_periods(&readings);
    let twice_input: Vec<_> = once
        .iter()
        .map(|p| {
            reading(
                &p.start.to_rfc3339(),
                &p.end.to_rfc3339(),
                json!(p.amount),
                json!(p.consumption),
            )
        })
        .collect();
    assert_eq!(sorted_periods(&twice_input), once);
}

#[test]
fn latest_period_drives_the_window() {
    let snap = derive_snapshot(Some(history().as_slice()), None, now(), DEFAULT_CUSTOMER_CHARGE);
    let feb_29 = Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap();
    assert_eq!(snap.start_date, Some(feb_29));
    assert_eq!(snap.last_meter_read, Some(feb_29));
    // (29 + 33 + 29) / 3 = 30.33 -> 30
    assert_eq!(snap.period_days(), Some(30));
    let expected_rate = (117.05 - 29.0 * DEFAULT_CUSTOMER_CHARGE) / 790.0;
    assert!((snap.cost_per_kwh.unwrap() - expected_rate).abs() < 1e-12);
}

#[test]
fn provider_costs_are_not_estimated() {
    let snap = derive_snapshot(
        Some(history().as_slice()),
        Some(&projected(json!(30.5), json!("101.75"))),
        now(),
        DEFAULT_CUSTOMER_CHARGE,
    );
    assert_eq!(snap.cost_to_date, Some(30.5));
    assert_eq!(snap.forecasted_cost, Some(101.75));
    assert!(!snap.is_cost_estimated);
}

#[test]
fn missing_costs_are_estimated() {
    let snap = derive_snapshot(
        Some(history().as_slice()),
        Some(&projected(json!(0), json!(null))),
        now(),
        DEFAULT_CUSTOMER_CHARGE,
    );
    let rate = snap.cost_per_kwh.unwrap();
    // 2024-02-29 -> 2024-03-10 12:00 is 10 whole days
    let to_date = 210.0 * rate + 10.0 * DEFAULT_CUSTOMER_CHARGE;
    let forecast = 700.0 * rate + 30.0 * DEFAULT_CUSTOMER_CHARGE;
    assert!((snap.cost_to_date.unwrap() - to_date).abs() < 1e-9);
    assert!((snap.forecasted_cost.unwrap() - forecast).abs() < 1e-9);
    assert!(snap.is_cost_estimated);
}

#[test]
fn one_fallback_sets_the_flag() {
    let snap = derive_snapshot(
        Some(history().as_slice()),
        Some(&projected(json!(42.0), json!(-3.0))),
        now(),
        DEFAULT_CUSTOMER_CHARGE,
    );
    assert_eq!(snap.cost_to_date, Some(42.0));
    assert!(snap.forecasted_cost.unwrap() > 0.0);
    assert!(snap.is_cost_estimated);
}

#[test]
fn no_rate_means_no_estimate() {
    let snap = derive_snapshot(
        None,
        Some(&projected(json!(0), json!(0))),
        now(),
        DEFAULT_CUSTOMER_CHARGE,
    );
    assert!(snap.cost_to_date.is_none());
    assert!(snap.forecasted_cost.is_none());
    assert!(!snap.is_cost_estimated);
}

#[test]
fn zero_usage_skips_the_fallback() {
    let mut p = projected(json!(0), json!(0));
    p.so_far_this_month_projected_consumption = json!(0);
    let snap = derive_snapshot(Some(history().as_slice()), Some(&p), now(), DEFAULT_CUSTOMER_CHARGE);
    assert!(snap.cost_to_date.is_none());
    // Forecast still estimated from 700 kWh
    assert!(snap.forecasted_cost.is_some());
    assert!(snap.is_cost_estimated);
}

#[test]
fn non_numeric_field_only_blanks_itself() {
    let clean = projected(json!(30.5), json!(101.75));
    let baseline = derive_snapshot(Some(history().as_slice()), Some(&clean), now(), DEFAULT_CUSTOMER_CHARGE);

    let mut dirty = clean.clone();
    dirty.average_this_year_consumption = json!("N/A");
    let snap = derive_snapshot(Some(history().as_slice()), Some(&dirty), now(), DEFAULT_CUSTOMER_CHARGE);

    assert!(snap.typical_usage.is_none());
    let restored = alliant_energy::snapshot::UsageSnapshot {
        typical_usage: baseline.typical_usage,
        ..snap
    };
    assert_eq!(restored, baseline);
}

#[test]
fn zero_consumption_has_no_rate() {
    let readings = vec![reading("2024-01-01", "2024-02-01", json!(15.29), json!(0))];
    let snap = derive_snapshot(Some(readings.as_slice()), None, now(), DEFAULT_CUSTOMER_CHARGE);
    assert!(snap.cost_per_kwh.is_none());
    assert!(snap.start_date.is_some());
}

#[test]
fn unparseable_dates_are_dropped() {
    let mut readings = history();
    readings.push(reading("yesterday", "today", json!(1), json!(1)));
    readings.push(HistoricalReading::default());
    assert_eq!(sorted_periods(&readings).len(), 3);
}

#[test]
fn empty_history_leaves_window_absent() {
    let snap = derive_snapshot(Some(&[][..]), None, now(), DEFAULT_CUSTOMER_CHARGE);
    assert!(snap.cost_per_kwh.is_none());
    assert!(snap.start_date.is_none());
    assert!(snap.end_date.is_none());
    assert!(snap.last_meter_read.is_none());
    assert_eq!(snap.last_api_update, now());
}
