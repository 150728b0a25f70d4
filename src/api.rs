//! Thin bearer-authenticated client for the host's HTTP API.
//!
//! The solving loop operates purely on DOM state and never depends on this;
//! it exists for callers that want account data. Transport errors and non-2xx
//! responses collapse uniformly to `None`, logged — callers handle absence,
//! not errors.

use crate::auth;
use crate::page::ChallengePage;
use crate::{Error, Result};
use reqwest::Method;
use serde_json::Value;
use tracing::warn;

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Build a client from the page's cookie store.
    pub async fn from_page(page: &dyn ChallengePage, base_url: impl Into<String>) -> Result<Self> {
        let token = auth::auth_token(page)
            .await
            .ok_or(Error::NotAuthenticated)?;
        Ok(Self::new(base_url, token))
    }

    /// Issue a request against the host API.
    pub async fn request(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Option<Value> {
        let url = join_url(&self.base_url, endpoint);
        let mut req = self.http.request(method, &url).bearer_auth(&self.token);
        if let Some(body) = body {
            req = req.json(body);
        }
        match req.send().await {
            Ok(resp) if resp.status().is_success() => match resp.json().await {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("api response parse failed: {e}");
                    None
                }
            },
            Ok(resp) => {
                warn!("api error {} for {url}", resp.status());
                None
            }
            Err(e) => {
                warn!("api request failed: {e}");
                None
            }
        }
    }
}

fn join_url(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}
