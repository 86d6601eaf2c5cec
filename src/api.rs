//! Shared HTTP plumbing for the provider API
//!
//! The provider only answers requests that look like they come from its own
//! web portal, so every request carries the same browser headers.

use reqwest::RequestBuilder;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

pub const LOGIN_PATH: &str = "/UsermanagementAPI/api/1/Login/auth";
pub const ADDRESSES_PATH: &str = "/Services/api/1/Addresses/User";
pub const METER_PATH: &str = "/Services/api/1/Usages/GetMeterAndPremise";
pub const HISTORICAL_PATH: &str = "/UsageAPI/api/V1/Electric";
pub const PROJECTED_PATH: &str = "/UsageAPI/api/V1/ProjectedElectric";

const BROWSER_HEADERS: [(&str, &str); 15] = [
    ("accept", "application/json, text/plain, */*"),
    ("accept-language", "en-US,en;q=0.9"),
    ("dnt", "1"),
    ("origin", "https://myaccount.alliantenergy.com"),
    ("priority", "u=1, i"),
    ("pt", "1"),
    ("referer", "https://myaccount.alliantenergy.com/"),
    ("sec-ch-ua", "\"Not?A_Brand\";v=\"99\", \"Chromium\";v=\"130\""),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"macOS\""),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "cross-site"),
    ("uid", "2"),
    (
        "user-agent",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    ),
];

/// Browser-impersonation headers sent with every request
pub fn base_headers() -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(BROWSER_HEADERS.len() + 3);
    for (name, value) in BROWSER_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers
}

/// Headers for the login endpoint, which identifies itself as a different portal user
pub fn login_headers() -> HeaderMap {
    let mut headers = base_headers();
    headers.insert(HeaderName::from_static("st"), HeaderValue::from_static("PL"));
    headers.insert(HeaderName::from_static("uid"), HeaderValue::from_static("1"));
    headers
}

/// Connection pool bound to the provider base URL
#[derive(Debug, Clone)]
pub struct ProviderHttp {
    client: reqwest::Client,
    base_url: String,
}

impl ProviderHttp {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Unauthenticated POST to the login endpoint
    pub fn login(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path)).headers(login_headers())
    }

    /// Authenticated GET
    pub fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.client
            .get(self.url(path))
            .headers(base_headers())
            .bearer_auth(token)
    }

    /// Authenticated POST
    pub fn post(&self, path: &str, token: &str) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .headers(base_headers())
            .bearer_auth(token)
    }
}
