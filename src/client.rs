//! Alliant Energy client
//!
//! One [`AlliantClient::fetch`] call is one poll cycle: make sure the session
//! is valid, read historical and projected usage, derive the snapshot.

use crate::api::ProviderHttp;
use crate::cache::CredentialStore;
use crate::config::Config;
use crate::derive::derive_snapshot;
use crate::error::{AlliantError, Result};
use crate::logging::{LogContext, get_logger_with_context};
use crate::session::SessionManager;
use crate::snapshot::UsageSnapshot;
use crate::usage::{Fetched, QueryWindow, UsageFetcher};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;

/// Source of "now"; swapped out in tests
pub type Clock = fn() -> DateTime<Utc>;

/// Provider client for a single account
pub struct AlliantClient {
    http: Option<ProviderHttp>,
    base_url: String,
    timeout: Duration,
    customer_charge: f64,
    tz: Tz,
    session: SessionManager,
    fetcher: UsageFetcher,
    clock: Clock,
    logger: crate::logging::StructuredLogger,
}

impl AlliantClient {
    /// Build a client from configuration; the connection pool is created on first use
    pub fn new(config: &Config, store: Option<Arc<dyn CredentialStore>>) -> Result<Self> {
        let tz = config.tz()?;
        let session = SessionManager::new(
            &config.account.username,
            &config.account.password,
            &config.api.refresh_path,
            store,
        );
        let context = LogContext::new("client").with_installation(&config.account.installation_id);

        Ok(Self {
            http: None,
            base_url: config.api.base_url.clone(),
            timeout: Duration::from_secs(config.api.timeout_seconds),
            customer_charge: config.pricing.customer_charge_per_day,
            tz,
            session,
            fetcher: UsageFetcher::new(),
            clock: Utc::now,
            logger: get_logger_with_context(context),
        })
    }

    /// Use a caller-owned connection pool
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(ProviderHttp::new(client, &self.base_url));
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn customer_charge(&self) -> f64 {
        self.customer_charge
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    fn http(&mut self) -> Result<ProviderHttp> {
        if let Some(http) = &self.http {
            return Ok(http.clone());
        }
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| AlliantError::network(format!("Failed to build HTTP client: {}", e)))?;
        let http = ProviderHttp::new(client, &self.base_url);
        self.http = Some(http.clone());
        Ok(http)
    }

    /// Run one poll cycle.
    ///
    /// A 401 on the historical request triggers one full re-authentication
    /// and one retry of the cycle; a second 401 is an auth error. A 401 on
    /// the projected request is only logged.
    pub async fn fetch(&mut self) -> Result<UsageSnapshot> {
        let http = self.http()?;
        let now = (self.clock)();
        let epoch = now.timestamp_millis() as f64 / 1000.0;
        let today = now.with_timezone(&self.tz).date_naive();
        let window = QueryWindow::for_today(today)
            .ok_or_else(|| AlliantError::api(format!("No query window for {}", today)))?;

        let mut retried = false;
        let (historical, active) = loop {
            let active = self.session.ensure_valid_token(&http, epoch).await?;
            match self
                .fetcher
                .fetch_historical(&http, &active.token, &active.account, &window)
                .await?
            {
                Fetched::Unauthorized if !retried => {
                    retried = true;
                    self.logger
                        .warn("Historical request unauthorized, re-authenticating");
                    self.session.authenticate(&http, epoch).await?;
                }
                Fetched::Unauthorized => {
                    return Err(AlliantError::auth(
                        "Historical request unauthorized after re-authentication",
                    ));
                }
                other => break (other.into_data(), active),
            }
        };

        let projected = self
            .fetcher
            .fetch_projected(&http, &active.token, &active.account, &window)
            .await?
            .into_data();

        let snapshot = derive_snapshot(
            historical.as_deref(),
            projected.as_ref(),
            now,
            self.customer_charge,
        );
        self.logger.debug(&format!(
            "Cycle complete: usage_to_date={:?} cost_to_date={:?} estimated={}",
            snapshot.usage_to_date, snapshot.cost_to_date, snapshot.is_cost_estimated
        ));
        Ok(snapshot)
    }

    /// Release the connection pool; a later fetch builds a new one
    pub fn close(&mut self) {
        if self.http.take().is_some() {
            self.logger.debug("HTTP session closed");
        }
    }
}

/// Outcome of a setup-time credential check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialCheck {
    Valid,
    InvalidAuth,
    Unknown(String),
}

/// Try one full fetch with a cache-less client and classify the result
pub async fn validate_credentials(config: &Config) -> CredentialCheck {
    let mut client = match AlliantClient::new(config, None) {
        Ok(client) => client,
        Err(e) => return CredentialCheck::Unknown(e.to_string()),
    };
    validate_with(&mut client).await
}

/// [`validate_credentials`] against an already-built client
pub async fn validate_with(client: &mut AlliantClient) -> CredentialCheck {
    let outcome = client.fetch().await;
    client.close();
    match outcome {
        Ok(_) => CredentialCheck::Valid,
        Err(e) if e.is_auth() => CredentialCheck::InvalidAuth,
        Err(e) => CredentialCheck::Unknown(e.to_string()),
    }
}
