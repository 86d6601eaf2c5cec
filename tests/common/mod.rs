#![allow(dead_code)]

use alliant_energy::client::AlliantClient;
use alliant_energy::config::Config;
use alliant_energy::session::SessionState;
use alliant_energy::account::AccountIds;
use chrono::{DateTime, TimeZone, Utc};
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::{Value, json};

pub const LOGIN: &str = "/UsermanagementAPI/api/1/Login/auth";
pub const REFRESH: &str = "/UsermanagementAPI/api/1/Login/refreshtoken";
pub const ADDRESSES: &str = "/Services/api/1/Addresses/User/user-1";
pub const METER: &str = "/Services/api/1/Usages/GetMeterAndPremise";
pub const HISTORICAL: &str = "/UsageAPI/api/V1/Electric";
pub const PROJECTED: &str = "/UsageAPI/api/V1/ProjectedElectric";

/// 2024-02-15 12:00 in Chicago
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 15, 18, 0, 0).unwrap()
}

pub fn fixed_epoch() -> f64 {
    fixed_now().timestamp() as f64
}

pub fn config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.account.username = "user@example.com".into();
    config.account.password = "hunter2".into();
    config.api.base_url = base_url.to_string();
    config.api.timeout_seconds = 5;
    config
}

pub fn client(server: &ServerGuard) -> AlliantClient {
    AlliantClient::new(&config(&server.url()), None)
        .unwrap()
        .with_clock(fixed_now)
}

pub fn ids() -> AccountIds {
    AccountIds {
        account_number: "1234".into(),
        premise_number: "987".into(),
        meter_number: "M-55".into(),
    }
}

/// Cached record valid for `lifetime` seconds after the fixed clock
pub fn cached_state(token: &str, lifetime: f64) -> SessionState {
    SessionState {
        token: token.into(),
        refresh_token: Some("refresh-0".into()),
        expires_at: fixed_epoch() + lifetime,
        user_id: "user-1".into(),
        account: Some(ids()),
    }
}

pub fn grant(token: &str) -> Value {
    json!({
        "status": {"type": "success", "message": "OK"},
        "data": {
            "accessToken": token,
            "refreshToken": "refresh-1",
            "expiresIn": 30,
            "user": {"uuid": "user-1"}
        }
    })
}

pub fn one_period_history() -> Value {
    json!({"Result": {"electricUsages": [
        {"readingFrom": "2024-01-01T00:00:00", "readingTo": "2024-02-01T00:00:00",
         "amount": 120.00, "consumption": 800}
    ]}})
}

pub fn projection() -> Value {
    json!({"Result": {"projectedElectric": {
        "soFarThisMonthProjectedConsumption": 400,
        "projectedConsumption": "850",
        "averageThisYearConsumption": 780.5,
        "soFarThisMonthProjectedAmount": 0,
        "projectedAmount": "95.10",
        "averageThisYearAmount": 101.5
    }}})
}

pub async fn mock_login(server: &mut ServerGuard, token: &str, hits: usize) -> Mock {
    server
        .mock("POST", LOGIN)
        .match_header("uid", "1")
        .match_header("st", "PL")
        .match_body(Matcher::PartialJson(json!({
            "username": "user@example.com",
            "password": "hunter2"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(grant(token).to_string())
        .expect(hits)
        .create_async()
        .await
}

pub async fn mock_discovery(server: &mut ServerGuard, hits: usize) -> (Mock, Mock) {
    let accounts = server
        .mock("GET", ADDRESSES)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"data": [{"accountNumber": "1234", "premiseNumber": 987}]}).to_string())
        .expect(hits)
        .create_async()
        .await;
    let meter = server
        .mock("POST", METER)
        .match_body(Matcher::Json(json!({
            "accountNumber": "1234",
            "premiseNumber": "987"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"data": [{"meterNumber": "M-55"}]}).to_string())
        .expect(hits)
        .create_async()
        .await;
    (accounts, meter)
}

pub async fn mock_usage(
    server: &mut ServerGuard,
    path: &str,
    token: &str,
    status: usize,
    body: Value,
    hits: usize,
) -> Mock {
    server
        .mock("GET", path)
        .match_query(Matcher::Any)
        .match_header("authorization", format!("Bearer {}", token).as_str())
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .expect(hits)
        .create_async()
        .await
}
