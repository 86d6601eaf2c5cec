//! Usage snapshot produced by one fetch cycle

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Immutable result of one fetch cycle.
///
/// Every `Option` field is `None` when the provider did not supply a usable
/// value and no local estimate could be made.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSnapshot {
    /// kWh used so far in the current billing period
    pub usage_to_date: Option<f64>,
    /// Provider forecast of kWh for the whole period
    pub forecasted_usage: Option<f64>,
    /// Average monthly kWh over the past year
    pub typical_usage: Option<f64>,
    pub cost_to_date: Option<f64>,
    pub forecasted_cost: Option<f64>,
    pub typical_cost: Option<f64>,
    /// Current billing period start (end of the last completed period)
    pub start_date: Option<DateTime<Utc>>,
    /// Projected end of the current billing period
    pub end_date: Option<DateTime<Utc>>,
    pub last_api_update: DateTime<Utc>,
    pub last_meter_read: Option<DateTime<Utc>>,
    /// Energy rate of the last completed period, customer charge excluded
    pub cost_per_kwh: Option<f64>,
    /// Fixed daily customer charge
    pub customer_charge: f64,
    /// At least one cost figure was estimated locally
    pub is_cost_estimated: bool,
}

impl UsageSnapshot {
    /// Snapshot with nothing known yet
    pub fn empty(now: DateTime<Utc>, customer_charge: f64) -> Self {
        Self {
            usage_to_date: None,
            forecasted_usage: None,
            typical_usage: None,
            cost_to_date: None,
            forecasted_cost: None,
            typical_cost: None,
            start_date: None,
            end_date: None,
            last_api_update: now,
            last_meter_read: None,
            cost_per_kwh: None,
            customer_charge,
            is_cost_estimated: false,
        }
    }

    /// Cost of `kwh` at the derived rate plus `days` of customer charge
    pub fn calculate_cost(&self, kwh: f64, days: i64) -> Option<f64> {
        self.cost_per_kwh
            .map(|rate| kwh * rate + days as f64 * self.customer_charge)
    }

    /// Length of the current billing period in whole days
    pub fn period_days(&self) -> Option<i64> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some(crate::derive::whole_days(end - start)),
            _ => None,
        }
    }
}
