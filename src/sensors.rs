//! Output surface
//!
//! Static table of the data points published from each snapshot, plus the
//! auxiliary attributes a host shows alongside them.

use crate::snapshot::UsageSnapshot;
use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// What a data point measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Energy,
    Monetary,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Total,
    Measurement,
}

/// Value of one data point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Number(f64),
    Date(NaiveDate),
}

type ValueFn = fn(&UsageSnapshot, Tz) -> Option<SensorValue>;

/// Static description of one published data point
#[derive(Debug, Clone, Copy)]
pub struct SensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub device_class: DeviceClass,
    pub state_class: Option<StateClass>,
    pub unit: Option<&'static str>,
    pub precision: Option<u8>,
    pub diagnostic: bool,
    pub enabled_by_default: bool,
    pub value_fn: ValueFn,
}

fn number(value: Option<f64>) -> Option<SensorValue> {
    value.map(SensorValue::Number)
}

fn local_date(value: Option<DateTime<Utc>>, tz: Tz) -> Option<SensorValue> {
    value.map(|dt| SensorValue::Date(dt.with_timezone(&tz).date_naive()))
}

fn usage_to_date(s: &UsageSnapshot, _: Tz) -> Option<SensorValue> {
    number(s.usage_to_date)
}

fn forecasted_usage(s: &UsageSnapshot, _: Tz) -> Option<SensorValue> {
    number(s.forecasted_usage)
}

fn typical_usage(s: &UsageSnapshot, _: Tz) -> Option<SensorValue> {
    number(s.typical_usage)
}

fn cost_to_date(s: &UsageSnapshot, _: Tz) -> Option<SensorValue> {
    number(s.cost_to_date)
}

fn forecasted_cost(s: &UsageSnapshot, _: Tz) -> Option<SensorValue> {
    number(s.forecasted_cost)
}

fn typical_cost(s: &UsageSnapshot, _: Tz) -> Option<SensorValue> {
    number(s.typical_cost)
}

fn cost_per_kwh(s: &UsageSnapshot, _: Tz) -> Option<SensorValue> {
    number(s.cost_per_kwh)
}

fn start_date(s: &UsageSnapshot, tz: Tz) -> Option<SensorValue> {
    local_date(s.start_date, tz)
}

fn end_date(s: &UsageSnapshot, tz: Tz) -> Option<SensorValue> {
    local_date(s.end_date, tz)
}

pub const COST_TO_DATE: &str = "elec_cost_to_date";
pub const FORECASTED_COST: &str = "elec_forecasted_cost";
pub const COST_PER_KWH: &str = "elec_cost_per_kwh";

/// Window shown as the rate's calculation period, ending at the last meter read
const CALCULATION_WINDOW_DAYS: i64 = 90;

pub static ELEC_SENSORS: [SensorDescription; 9] = [
    SensorDescription {
        key: "elec_usage_to_date",
        name: "Current Bill Electric Usage To Date",
        device_class: DeviceClass::Energy,
        state_class: Some(StateClass::Total),
        unit: Some("kWh"),
        precision: Some(1),
        diagnostic: false,
        enabled_by_default: true,
        value_fn: usage_to_date,
    },
    SensorDescription {
        key: "elec_forecasted_usage",
        name: "Current Bill Electric Forecasted Usage",
        device_class: DeviceClass::Energy,
        state_class: Some(StateClass::Total),
        unit: Some("kWh"),
        precision: Some(1),
        diagnostic: false,
        enabled_by_default: true,
        value_fn: forecasted_usage,
    },
    SensorDescription {
        key: "elec_typical_usage",
        name: "Typical Monthly Electric Usage",
        device_class: DeviceClass::Energy,
        state_class: Some(StateClass::Total),
        unit: Some("kWh"),
        precision: Some(1),
        diagnostic: false,
        enabled_by_default: true,
        value_fn: typical_usage,
    },
    SensorDescription {
        key: COST_TO_DATE,
        name: "Current Bill Electric Cost To Date",
        device_class: DeviceClass::Monetary,
        state_class: Some(StateClass::Total),
        unit: Some("USD"),
        precision: Some(2),
        diagnostic: false,
        enabled_by_default: true,
        value_fn: cost_to_date,
    },
    SensorDescription {
        key: FORECASTED_COST,
        name: "Current Bill Electric Forecasted Cost",
        device_class: DeviceClass::Monetary,
        state_class: Some(StateClass::Total),
        unit: Some("USD"),
        precision: Some(2),
        diagnostic: false,
        enabled_by_default: true,
        value_fn: forecasted_cost,
    },
    SensorDescription {
        key: "elec_typical_cost",
        name: "Typical Monthly Electric Cost",
        device_class: DeviceClass::Monetary,
        state_class: Some(StateClass::Total),
        unit: Some("USD"),
        precision: Some(2),
        diagnostic: false,
        enabled_by_default: true,
        value_fn: typical_cost,
    },
    SensorDescription {
        key: COST_PER_KWH,
        name: "Electric Cost per kWh",
        device_class: DeviceClass::Monetary,
        state_class: Some(StateClass::Measurement),
        unit: Some("USD/kWh"),
        precision: Some(4),
        diagnostic: true,
        enabled_by_default: true,
        value_fn: cost_per_kwh,
    },
    SensorDescription {
        key: "elec_start_date",
        name: "Current Bill Electric Start Date",
        device_class: DeviceClass::Date,
        state_class: None,
        unit: None,
        precision: None,
        diagnostic: true,
        enabled_by_default: false,
        value_fn: start_date,
    },
    SensorDescription {
        key: "elec_end_date",
        name: "Current Bill Electric End Date",
        device_class: DeviceClass::Date,
        state_class: None,
        unit: None,
        precision: None,
        diagnostic: true,
        enabled_by_default: false,
        value_fn: end_date,
    },
];

fn local_iso(dt: DateTime<Utc>, tz: Tz) -> Value {
    Value::String(dt.with_timezone(&tz).to_rfc3339_opts(SecondsFormat::Secs, false))
}

/// Auxiliary attributes for one data point
pub fn attributes(
    description: &SensorDescription,
    snapshot: &UsageSnapshot,
    tz: Tz,
) -> BTreeMap<String, Value> {
    let mut attrs = BTreeMap::new();
    attrs.insert(
        "last_api_update".to_string(),
        local_iso(snapshot.last_api_update, tz),
    );
    if let Some(read) = snapshot.last_meter_read {
        attrs.insert("last_meter_read".to_string(), local_iso(read, tz));
    }
    if let Some(start) = snapshot.start_date {
        attrs.insert("billing_period_start".to_string(), local_iso(start, tz));
    }
    if let Some(end) = snapshot.end_date {
        attrs.insert("billing_period_end".to_string(), local_iso(end, tz));
    }

    match description.key {
        COST_TO_DATE | FORECASTED_COST => {
            attrs.insert(
                "is_estimated".to_string(),
                Value::Bool(snapshot.is_cost_estimated),
            );
        }
        COST_PER_KWH => {
            if let Some(read) = snapshot.last_meter_read {
                if let Some(from) = read.checked_sub_signed(Duration::days(CALCULATION_WINDOW_DAYS)) {
                    attrs.insert("calculation_period_start".to_string(), local_iso(from, tz));
                }
                attrs.insert("calculation_period_end".to_string(), local_iso(read, tz));
            }
            attrs.insert(
                "customer_charge_per_day".to_string(),
                Value::from(snapshot.customer_charge),
            );
        }
        _ => {}
    }
    attrs
}

/// One data point rendered from a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    pub key: &'static str,
    pub name: &'static str,
    pub value: Option<SensorValue>,
    pub unit: Option<&'static str>,
    pub precision: Option<u8>,
    pub enabled_by_default: bool,
    pub attributes: BTreeMap<String, Value>,
}

/// Render every data point in table order
pub fn readings(snapshot: &UsageSnapshot, tz: Tz) -> Vec<SensorReading> {
    ELEC_SENSORS
        .iter()
        .map(|desc| SensorReading {
            key: desc.key,
            name: desc.name,
            value: (desc.value_fn)(snapshot, tz),
            unit: desc.unit,
            precision: desc.precision,
            enabled_by_default: desc.enabled_by_default,
            attributes: attributes(desc, snapshot, tz),
        })
        .collect()
}
