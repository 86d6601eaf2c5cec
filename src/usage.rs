//! Usage data fetcher
//!
//! Two independent reads per cycle: completed billing periods (historical)
//! and the provider's month-to-date projection. Non-success statuses are
//! reported back as [`Fetched`] variants so the caller decides the retry
//! policy; only transport failures become errors.

use crate::account::AccountIds;
use crate::api::{HISTORICAL_PATH, PROJECTED_PATH, ProviderHttp};
use crate::error::Result;
use crate::logging::get_logger;
use chrono::{Datelike, NaiveDate};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One completed billing period as returned by the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalReading {
    #[serde(default)]
    pub reading_from: Option<String>,
    #[serde(default)]
    pub reading_to: Option<String>,
    /// Billed amount, numeric or string
    #[serde(default)]
    pub amount: Value,
    /// kWh consumed, numeric or string
    #[serde(default)]
    pub consumption: Value,
}

/// Month-to-date projection for the open billing period.
///
/// Fields stay raw JSON; the derivation engine parses each one on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedUsage {
    #[serde(default)]
    pub so_far_this_month_projected_consumption: Value,
    #[serde(default)]
    pub projected_consumption: Value,
    #[serde(default)]
    pub average_this_year_consumption: Value,
    #[serde(default)]
    pub so_far_this_month_projected_amount: Value,
    #[serde(default)]
    pub projected_amount: Value,
    #[serde(default)]
    pub average_this_year_amount: Value,
}

/// Outcome of a usage request that reached the provider
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Data(T),
    /// 401: the bearer token was rejected
    Unauthorized,
    /// Any other failure; the affected fields stay absent
    Unavailable,
}

impl<T> Fetched<T> {
    pub fn into_data(self) -> Option<T> {
        match self {
            Fetched::Data(d) => Some(d),
            _ => None,
        }
    }
}

/// Calendar dates bounding the usage queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub year_ago: NaiveDate,
    pub month_start: NaiveDate,
    pub month_end: NaiveDate,
    pub next_month_start: NaiveDate,
}

impl QueryWindow {
    /// Window for the calendar month containing `today`
    pub fn for_today(today: NaiveDate) -> Option<Self> {
        let year_ago = today
            .with_year(today.year() - 1)
            // 29 February has no counterpart a year earlier
            .or_else(|| NaiveDate::from_ymd_opt(today.year() - 1, today.month(), 28))?;
        let month_start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)?;
        let next_month_start = if today.month() == 12 {
            NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)?
        };
        let month_end = next_month_start.pred_opt()?;
        Some(Self {
            year_ago,
            month_start,
            month_end,
            next_month_start,
        })
    }
}

/// Extract `Result.electricUsages` from a historical response body
pub fn parse_historical(body: &Value) -> Option<Vec<HistoricalReading>> {
    let usages = body.get("Result")?.get("electricUsages")?;
    if usages.is_null() {
        return Some(Vec::new());
    }
    let readings = usages
        .as_array()?
        .iter()
        .filter_map(|entry| serde_json::from_value::<HistoricalReading>(entry.clone()).ok())
        .collect();
    Some(readings)
}

/// Extract `Result.projectedElectric` from a projected response body
pub fn parse_projected(body: &Value) -> Option<ProjectedUsage> {
    let projected = body.get("Result")?.get("projectedElectric")?;
    if !projected.is_object() {
        return None;
    }
    serde_json::from_value(projected.clone()).ok()
}

/// Issues the historical and projected usage requests
pub struct UsageFetcher {
    logger: crate::logging::StructuredLogger,
}

impl Default for UsageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageFetcher {
    pub fn new() -> Self {
        Self {
            logger: get_logger("usage"),
        }
    }

    /// Monthly readings from a year ago through the first day of next month
    pub async fn fetch_historical(
        &self,
        http: &ProviderHttp,
        token: &str,
        ids: &AccountIds,
        window: &QueryWindow,
    ) -> Result<Fetched<Vec<HistoricalReading>>> {
        let params = [
            ("AccountNumber", ids.usage_key()),
            ("MeterNumber", ids.meter_number.clone()),
            ("From", window.year_ago.format(DATE_FORMAT).to_string()),
            ("To", window.next_month_start.format(DATE_FORMAT).to_string()),
            ("Uom", "kWh".to_string()),
            ("Periodicity", "MO".to_string()),
        ];

        let response = http.get(HISTORICAL_PATH, token).query(&params).send().await?;
        match response.status() {
            StatusCode::OK => {
                let body: Value = match response.json().await {
                    Ok(body) => body,
                    Err(e) => {
                        self.logger
                            .warn(&format!("Historical usage body was not JSON: {}", e));
                        return Ok(Fetched::Unavailable);
                    }
                };
                match parse_historical(&body) {
                    Some(readings) => {
                        self.logger.debug(&format!(
                            "Received {} historical readings",
                            readings.len()
                        ));
                        Ok(Fetched::Data(readings))
                    }
                    None => {
                        self.logger
                            .warn("Historical usage response missing Result.electricUsages");
                        Ok(Fetched::Unavailable)
                    }
                }
            }
            StatusCode::UNAUTHORIZED => {
                self.logger.error(
                    "Authentication failed for historical data. Token may have expired.",
                );
                Ok(Fetched::Unauthorized)
            }
            status => {
                self.logger
                    .error(&format!("Failed to get historical data: {}", status));
                Ok(Fetched::Unavailable)
            }
        }
    }

    /// Provider projection for the current calendar month
    pub async fn fetch_projected(
        &self,
        http: &ProviderHttp,
        token: &str,
        ids: &AccountIds,
        window: &QueryWindow,
    ) -> Result<Fetched<ProjectedUsage>> {
        let params = [
            ("AccountNumber", ids.usage_key()),
            ("MeterNumber", ids.meter_number.clone()),
            ("StartDate", window.month_start.format(DATE_FORMAT).to_string()),
            ("EndDate", window.month_end.format(DATE_FORMAT).to_string()),
            ("Type", "0".to_string()),
        ];

        let response = http.get(PROJECTED_PATH, token).query(&params).send().await?;
        match response.status() {
            StatusCode::OK => {
                let body: Value = match response.json().await {
                    Ok(body) => body,
                    Err(e) => {
                        self.logger
                            .warn(&format!("Projected usage body was not JSON: {}", e));
                        return Ok(Fetched::Unavailable);
                    }
                };
                match parse_projected(&body) {
                    Some(projected) => Ok(Fetched::Data(projected)),
                    None => {
                        self.logger
                            .warn("Projected usage response missing Result.projectedElectric");
                        Ok(Fetched::Unavailable)
                    }
                }
            }
            StatusCode::UNAUTHORIZED => {
                // No retry here, unlike the historical request
                self.logger.error(
                    "Authentication failed for projected data. Token may have expired.",
                );
                Ok(Fetched::Unauthorized)
            }
            status => {
                self.logger
                    .error(&format!("Failed to get projected data: {}", status));
                Ok(Fetched::Unavailable)
            }
        }
    }
}
