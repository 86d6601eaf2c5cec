//! Derivation engine
//!
//! Pure functions turning the raw historical and projected payloads into a
//! [`UsageSnapshot`]: the energy rate of the last completed period, the
//! current billing window, and locally estimated costs where the provider
//! reports none.

use crate::snapshot::UsageSnapshot;
use crate::usage::{HistoricalReading, ProjectedUsage};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;

/// Defensive numeric parse: numbers and numeric strings, anything else is absent
pub fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Parse an upstream timestamp; offset-less values are taken as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Whole days in a signed duration, rounded towards negative infinity
pub fn whole_days(duration: Duration) -> i64 {
    duration.num_milliseconds().div_euclid(86_400_000)
}

/// Round half to even (29.5 -> 30, 30.5 -> 30)
pub fn round_half_even(value: f64) -> i64 {
    let floor = value.floor();
    let diff = value - floor;
    let rounded = if diff > 0.5 {
        floor + 1.0
    } else if diff < 0.5 {
        floor
    } else if floor % 2.0 == 0.0 {
        floor
    } else {
        floor + 1.0
    };
    rounded as i64
}

/// A historical reading with parsed bounds
#[derive(Debug, Clone, PartialEq)]
pub struct BillingPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub amount: Option<f64>,
    pub consumption: Option<f64>,
}

impl BillingPeriod {
    pub fn from_reading(reading: &HistoricalReading) -> Option<Self> {
        Some(Self {
            start: parse_timestamp(reading.reading_from.as_deref()?)?,
            end: parse_timestamp(reading.reading_to.as_deref()?)?,
            amount: parse_number(&reading.amount),
            consumption: parse_number(&reading.consumption),
        })
    }

    pub fn days(&self) -> i64 {
        whole_days(self.end - self.start)
    }
}

fn cmp_opt(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Parse and sort readings ascending by period start.
///
/// Readings with unparseable bounds are dropped. Ties on start are broken on
/// the remaining fields so the result never depends on input order.
pub fn sorted_periods(readings: &[HistoricalReading]) -> Vec<BillingPeriod> {
    let mut periods: Vec<BillingPeriod> = readings
        .iter()
        .filter_map(BillingPeriod::from_reading)
        .collect();
    let dropped = readings.len() - periods.len();
    if dropped > 0 {
        tracing::warn!("Dropped {} historical readings with unparseable dates", dropped);
    }
    periods.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(a.end.cmp(&b.end))
            .then(cmp_opt(a.amount, b.amount))
            .then(cmp_opt(a.consumption, b.consumption))
    });
    periods
}

/// Energy rate of a completed period with the customer charge taken out.
///
/// Absent unless both figures parse and consumption is positive.
pub fn cost_per_kwh(period: &BillingPeriod, customer_charge: f64) -> Option<f64> {
    let total_cost = period.amount?;
    let total_usage = period.consumption?;
    if total_usage <= 0.0 {
        return None;
    }
    let energy_cost = total_cost - period.days() as f64 * customer_charge;
    Some(energy_cost / total_usage)
}

/// Mean period length in days, rounded half to even
pub fn average_period_days(periods: &[BillingPeriod]) -> Option<i64> {
    if periods.is_empty() {
        return None;
    }
    let total: i64 = periods.iter().map(BillingPeriod::days).sum();
    Some(round_half_even(total as f64 / periods.len() as f64))
}

fn nonzero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

/// Provider cost when strictly positive, otherwise the local estimate
fn cost_or_estimate(
    provider: Option<f64>,
    usage: Option<f64>,
    days: Option<i64>,
    snapshot: &UsageSnapshot,
) -> (Option<f64>, bool) {
    if let Some(cost) = provider.filter(|c| *c > 0.0) {
        return (Some(cost), false);
    }
    match (nonzero(snapshot.cost_per_kwh), nonzero(usage), days) {
        (Some(_), Some(kwh), Some(days)) => (snapshot.calculate_cost(kwh, days), true),
        _ => (None, false),
    }
}

/// Build the snapshot for one fetch cycle
pub fn derive_snapshot(
    historical: Option<&[HistoricalReading]>,
    projected: Option<&ProjectedUsage>,
    now: DateTime<Utc>,
    customer_charge: f64,
) -> UsageSnapshot {
    let mut snapshot = UsageSnapshot::empty(now, customer_charge);

    let periods = historical.map(sorted_periods).unwrap_or_default();
    if let Some(latest) = periods.last() {
        snapshot.cost_per_kwh = cost_per_kwh(latest, customer_charge);
        snapshot.start_date = Some(latest.end);
        snapshot.last_meter_read = Some(latest.end);
        snapshot.end_date = average_period_days(&periods)
            .and_then(Duration::try_days)
            .and_then(|length| latest.end.checked_add_signed(length));
    }

    let Some(projected) = projected else {
        return snapshot;
    };

    snapshot.usage_to_date = parse_number(&projected.so_far_this_month_projected_consumption);
    snapshot.forecasted_usage = parse_number(&projected.projected_consumption);
    snapshot.typical_usage = parse_number(&projected.average_this_year_consumption);
    snapshot.typical_cost = parse_number(&projected.average_this_year_amount);

    let elapsed_days = snapshot.start_date.map(|start| whole_days(now - start));
    let (cost_to_date, estimated_to_date) = cost_or_estimate(
        parse_number(&projected.so_far_this_month_projected_amount),
        snapshot.usage_to_date,
        elapsed_days,
        &snapshot,
    );
    let (forecasted_cost, estimated_forecast) = cost_or_estimate(
        parse_number(&projected.projected_amount),
        snapshot.forecasted_usage,
        snapshot.period_days(),
        &snapshot,
    );

    snapshot.cost_to_date = cost_to_date;
    snapshot.forecasted_cost = forecasted_cost;
    snapshot.is_cost_estimated = estimated_to_date || estimated_forecast;
    snapshot
}
