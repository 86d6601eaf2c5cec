//! Session token manager
//!
//! Owns the bearer token and the resolved account identifiers. Tokens are
//! refreshed shortly before expiry, with a full login as the fallback, and
//! every accepted change is written through to the credential store.

use crate::account::{AccountIds, AccountResolver};
use crate::api::{LOGIN_PATH, ProviderHttp};
use crate::cache::CredentialStore;
use crate::derive::parse_number;
use crate::error::{AlliantError, Result};
use crate::logging::get_logger;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

/// Tokens within this many seconds of expiry are treated as expired
pub const TOKEN_REFRESH_MARGIN_SECS: f64 = 60.0;

/// True once `now` is inside the refresh margin of `expires_at`
pub fn needs_refresh(expires_at: f64, now: f64) -> bool {
    now >= expires_at - TOKEN_REFRESH_MARGIN_SECS
}

/// Persisted session record.
///
/// Serializes flat: `token`, `refresh_token`, `expires_at`, `uuid` and, once
/// resolved, the three account identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Epoch seconds
    #[serde(default)]
    pub expires_at: f64,
    #[serde(default, rename = "uuid")]
    pub user_id: String,
    #[serde(flatten)]
    pub account: Option<AccountIds>,
}

impl SessionState {
    /// A record is only worth reusing with a token and a resolved meter
    pub fn is_usable(&self) -> bool {
        !self.token.is_empty() && self.account.is_some()
    }
}

/// Token plus identifiers for one round of usage requests
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub token: String,
    pub account: AccountIds,
}

/// Fields lifted from a login or refresh response
#[derive(Debug, Clone, PartialEq)]
struct TokenGrant {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: f64,
    user_id: Option<String>,
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Validate a login envelope; `expiresIn` is in minutes
fn parse_grant(body: &Value, now: f64) -> Result<TokenGrant> {
    let status = body.get("status");
    let kind = status.and_then(|s| s.get("type")).and_then(Value::as_str);
    if kind != Some("success") {
        let message = status
            .and_then(|s| s.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(AlliantError::auth(format!(
            "Authentication failed: {}",
            message
        )));
    }

    let data = body
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| AlliantError::auth("Authentication response missing data"))?;
    let access_token = non_empty_str(data.get("accessToken"))
        .ok_or_else(|| AlliantError::auth("Authentication response missing access token"))?;
    let expires_in = data
        .get("expiresIn")
        .and_then(parse_number)
        .ok_or_else(|| AlliantError::auth("Authentication response missing token lifetime"))?;

    Ok(TokenGrant {
        access_token,
        refresh_token: non_empty_str(data.get("refreshToken")),
        expires_at: now + expires_in * 60.0,
        user_id: non_empty_str(data.get("user").and_then(|u| u.get("uuid"))),
    })
}

fn login_payload(username: &str, password: &str) -> Value {
    json!({
        "username": username,
        "password": password,
        "guestToken": "",
        "customattributes": {
            "ip": "",
            "client": "Web",
            "version": "10_15_7",
            "deviceId": "||Chrome||130||Mac OS X||10_15_7||",
            "deviceName": "Chrome",
            "deviceType": 0,
            "os": "Mac OS X"
        }
    })
}

/// Keeps one account's session valid across fetch cycles
pub struct SessionManager {
    username: String,
    password: String,
    refresh_path: String,
    store: Option<Arc<dyn CredentialStore>>,
    state: Option<SessionState>,
    resolver: AccountResolver,
    logger: crate::logging::StructuredLogger,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("username", &self.username)
            .field("refresh_path", &self.refresh_path)
            .field("has_store", &self.store.is_some())
            .field("has_session", &self.state.is_some())
            .finish()
    }
}

impl SessionManager {
    pub fn new(
        username: &str,
        password: &str,
        refresh_path: &str,
        store: Option<Arc<dyn CredentialStore>>,
    ) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            refresh_path: refresh_path.to_string(),
            store,
            state: None,
            resolver: AccountResolver::new(),
            logger: get_logger("session"),
        }
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    /// Make sure a live token and resolved account are in hand.
    ///
    /// Order: in-memory session, cached record, refresh near expiry, full
    /// login. A failed refresh falls through to a full login.
    pub async fn ensure_valid_token(
        &mut self,
        http: &ProviderHttp,
        now: f64,
    ) -> Result<ActiveSession> {
        if self.state.is_none() && !self.load_cached(now).await {
            self.authenticate(http, now).await?;
        } else if let Some(state) = &self.state
            && needs_refresh(state.expires_at, now)
        {
            self.logger.debug("Token near expiry, refreshing");
            if let Err(e) = self.refresh(http, now).await {
                self.logger
                    .warn(&format!("Token refresh failed, logging in again: {}", e));
                self.authenticate(http, now).await?;
            }
        }

        if self.state.as_ref().is_some_and(|s| s.account.is_none()) {
            self.resolve_missing_account(http).await?;
        }
        self.active()
    }

    /// Current token and identifiers
    pub fn active(&self) -> Result<ActiveSession> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| AlliantError::auth("Not authenticated"))?;
        let account = state
            .account
            .clone()
            .ok_or_else(|| AlliantError::auth("Account details not resolved"))?;
        Ok(ActiveSession {
            token: state.token.clone(),
            account,
        })
    }

    /// Full login followed by account discovery
    pub async fn authenticate(&mut self, http: &ProviderHttp, now: f64) -> Result<()> {
        self.logger.debug("Authenticating with Alliant Energy");

        let response = http
            .login(LOGIN_PATH)
            .json(&login_payload(&self.username, &self.password))
            .send()
            .await?;
        if response.status() != StatusCode::OK {
            self.logger
                .error(&format!("Login returned {}", response.status()));
            return Err(AlliantError::auth("Failed to authenticate"));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|_| AlliantError::auth("Authentication response was not JSON"))?;
        let grant = parse_grant(&body, now)?;
        let user_id = grant
            .user_id
            .ok_or_else(|| AlliantError::auth("Authentication response missing user id"))?;
        let account = self
            .resolver
            .resolve_account(http, &grant.access_token, &user_id)
            .await?;

        self.state = Some(SessionState {
            token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_at: grant.expires_at,
            user_id,
            account: Some(account),
        });
        self.persist().await;
        self.logger.info("Authenticated");
        Ok(())
    }

    /// Exchange the refresh token for a new access token
    pub async fn refresh(&mut self, http: &ProviderHttp, now: f64) -> Result<()> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| AlliantError::auth("No session to refresh"))?;
        let refresh_token = state
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AlliantError::auth("No refresh token available"))?;

        let response = http
            .post(&self.refresh_path, &state.token)
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await?;
        if response.status() != StatusCode::OK {
            return Err(AlliantError::auth(format!(
                "Token refresh returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|_| AlliantError::auth("Refresh response was not JSON"))?;
        let grant = parse_grant(&body, now)?;

        let user_id = grant.user_id.unwrap_or_else(|| state.user_id.clone());
        let account = match state.account.clone() {
            Some(account) => account,
            None => {
                self.resolver
                    .resolve_account(http, &grant.access_token, &user_id)
                    .await?
            }
        };

        self.state = Some(SessionState {
            token: grant.access_token,
            refresh_token: grant.refresh_token.or(Some(refresh_token)),
            expires_at: grant.expires_at,
            user_id,
            account: Some(account),
        });
        self.persist().await;
        self.logger.debug("Token refreshed");
        Ok(())
    }

    async fn resolve_missing_account(&mut self, http: &ProviderHttp) -> Result<()> {
        let Some(state) = &self.state else {
            return Ok(());
        };
        let account = self
            .resolver
            .resolve_account(http, &state.token, &state.user_id)
            .await?;
        if let Some(state) = self.state.as_mut() {
            state.account = Some(account);
        }
        self.persist().await;
        Ok(())
    }

    /// Adopt a cached record if it is complete and not near expiry
    async fn load_cached(&mut self, now: f64) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        match store.load().await {
            Ok(Some(state)) => {
                if needs_refresh(state.expires_at, now) {
                    self.logger.debug("Cached token expired");
                    return false;
                }
                if !state.is_usable() {
                    self.logger.debug("Cached session incomplete");
                    return false;
                }
                self.logger.debug("Loaded cached authentication data");
                self.state = Some(state);
                true
            }
            Ok(None) => false,
            Err(e) => {
                self.logger
                    .warn(&format!("Ignoring unreadable cached session: {}", e));
                false
            }
        }
    }

    /// Write-through; a failed save only costs a login on next start
    async fn persist(&self) {
        let (Some(store), Some(state)) = (&self.store, &self.state) else {
            return;
        };
        if let Err(e) = store.save(state).await {
            self.logger
                .warn(&format!("Failed to save authentication data: {}", e));
        }
    }
}
