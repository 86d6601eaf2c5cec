use alliant_energy::sensors::{ELEC_SENSORS, SensorValue, attributes, readings};
use alliant_energy::snapshot::UsageSnapshot;
use chrono::{TimeZone, Utc};
use chrono_tz::America::Chicago;
use serde_json::json;

fn snapshot() -> UsageSnapshot {
    let mut snap = UsageSnapshot::empty(Utc.with_ymd_and_hms(2024, 2, 15, 18, 0, 0).unwrap(), 0.4932);
    snap.usage_to_date = Some(400.0);
    snap.cost_to_date = Some(59.26);
    snap.cost_per_kwh = Some(0.1309);
    snap.is_cost_estimated = true;
    snap.start_date = Some(Utc.with_ymd_and_hms(2024, 2, 1, 6, 0, 0).unwrap());
    snap.end_date = Some(Utc.with_ymd_and_hms(2024, 3, 3, 6, 0, 0).unwrap());
    snap.last_meter_read = snap.start_date;
    snap
}

fn describe(key: &str) -> &'static alliant_energy::sensors::SensorDescription {
    ELEC_SENSORS.iter().find(|d| d.key == key).unwrap()
}

#[test]
fn one_reading_per_description() {
    let rendered = readings(&snapshot(), Chicago);
    assert_eq!(rendered.len(), ELEC_SENSORS.len());
    let usage = &rendered[0];
    assert_eq!(usage.key, "elec_usage_to_date");
    assert_eq!(usage.value, Some(SensorValue::Number(400.0)));
    assert_eq!(usage.unit, Some("kWh"));
    assert_eq!(usage.precision, Some(1));

    let forecast = rendered.iter().find(|r| r.key == "elec_forecasted_usage").unwrap();
    assert_eq!(forecast.value, None);
}

#[test]
fn common_attributes_are_local_iso() {
    let attrs = attributes(describe("elec_usage_to_date"), &snapshot(), Chicago);
    assert_eq!(attrs["last_api_update"], json!("2024-02-15T12:00:00-06:00"));
    assert_eq!(attrs["last_meter_read"], json!("2024-02-01T00:00:00-06:00"));
    assert_eq!(attrs["billing_period_start"], json!("2024-02-01T00:00:00-06:00"));
    assert_eq!(attrs["billing_period_end"], json!("2024-03-03T00:00:00-06:00"));
    assert!(!attrs.contains_key("is_estimated"));
}

#[test]
fn cost_points_carry_estimated_flag() {
    for key in ["elec_cost_to_date", "elec_forecasted_cost"] {
        let attrs = attributes(describe(key), &snapshot(), Chicago);
        assert_eq!(attrs["is_estimated"], json!(true));
    }
    let typical = attributes(describe("elec_typical_cost"), &snapshot(), Chicago);
    assert!(!typical.contains_key("is_estimated"));
}

#[test]
fn rate_point_carries_calculation_period() {
    let attrs = attributes(describe("elec_cost_per_kwh"), &snapshot(), Chicago);
    assert_eq!(attrs["calculation_period_start"], json!("2023-11-03T01:00:00-05:00"));
    assert_eq!(attrs["calculation_period_end"], json!("2024-02-01T00:00:00-06:00"));
    assert_eq!(attrs["customer_charge_per_day"], json!(0.4932));
}

#[test]
fn rate_point_without_meter_read_still_shows_charge() {
    let snap = UsageSnapshot::empty(Utc::now(), 0.5);
    let attrs = attributes(describe("elec_cost_per_kwh"), &snap, Chicago);
    assert!(!attrs.contains_key("calculation_period_start"));
    assert_eq!(attrs["customer_charge_per_day"], json!(0.5));
    assert!(attrs.contains_key("last_api_update"));
    assert!(!attrs.contains_key("billing_period_start"));
}

#[test]
fn date_points_render_as_dates() {
    let rendered = readings(&snapshot(), Chicago);
    let end = rendered.iter().find(|r| r.key == "elec_end_date").unwrap();
    assert!(!end.enabled_by_default);
    assert_eq!(serde_json::to_value(end.value).unwrap(), json!("2024-03-03"));
}
