//! Account resolver
//!
//! Usage queries are keyed by premise, account and meter number, none of
//! which the login response carries. They are discovered in two calls:
//! user → (account, premise), then (account, premise) → meter.

use crate::api::{ADDRESSES_PATH, METER_PATH, ProviderHttp};
use crate::error::{AlliantError, Result};
use crate::logging::get_logger;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Identifiers required by every usage query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIds {
    pub account_number: String,
    pub premise_number: String,
    pub meter_number: String,
}

impl AccountIds {
    /// `AccountNumber` query value: `{premise}-{account}`
    pub fn usage_key(&self) -> String {
        format!("{}-{}", self.premise_number, self.account_number)
    }
}

/// Identifiers arrive as strings or bare numbers
fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First element of the `data` array, if any
fn first_entry(body: &Value) -> Option<&Value> {
    body.get("data")?.as_array()?.first()
}

/// Runs the account → premise → meter discovery chain
pub struct AccountResolver {
    logger: crate::logging::StructuredLogger,
}

impl Default for AccountResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountResolver {
    pub fn new() -> Self {
        Self {
            logger: get_logger("account"),
        }
    }

    /// Resolve all three identifiers; any gap is an auth failure
    pub async fn resolve_account(
        &self,
        http: &ProviderHttp,
        token: &str,
        user_id: &str,
    ) -> Result<AccountIds> {
        let (account_number, premise_number) = self.lookup_account(http, token, user_id).await?;
        let meter_number = self
            .lookup_meter(http, token, &account_number, &premise_number)
            .await?;

        self.logger.info(&format!(
            "Resolved account {} premise {} meter {}",
            account_number, premise_number, meter_number
        ));
        Ok(AccountIds {
            account_number,
            premise_number,
            meter_number,
        })
    }

    async fn lookup_account(
        &self,
        http: &ProviderHttp,
        token: &str,
        user_id: &str,
    ) -> Result<(String, String)> {
        let path = format!("{}/{}", ADDRESSES_PATH, user_id);
        let response = http.get(&path, token).send().await?;
        if response.status() != StatusCode::OK {
            self.logger.error(&format!(
                "Address lookup returned {}",
                response.status()
            ));
            return Err(AlliantError::auth("Failed to get account details"));
        }

        let body: Value = response.json().await?;
        let account = first_entry(&body).ok_or_else(|| AlliantError::auth("No account found"))?;
        let account_number = id_string(account.get("accountNumber"))
            .ok_or_else(|| AlliantError::auth("No account found"))?;
        let premise_number = id_string(account.get("premiseNumber"))
            .ok_or_else(|| AlliantError::auth("No premise found"))?;
        Ok((account_number, premise_number))
    }

    async fn lookup_meter(
        &self,
        http: &ProviderHttp,
        token: &str,
        account_number: &str,
        premise_number: &str,
    ) -> Result<String> {
        let payload = json!({
            "accountNumber": account_number,
            "premiseNumber": premise_number,
        });
        let response = http.post(METER_PATH, token).json(&payload).send().await?;
        if response.status() != StatusCode::OK {
            self.logger.error(&format!(
                "Meter lookup returned {}",
                response.status()
            ));
            return Err(AlliantError::auth("Failed to get meter details"));
        }

        let body: Value = response.json().await?;
        first_entry(&body)
            .and_then(|meter| id_string(meter.get("meterNumber")))
            .ok_or_else(|| AlliantError::auth("No meter found"))
    }
}
