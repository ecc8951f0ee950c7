//! Authenticated HTTP client for the Campus REST API
//!
//! Wraps reqwest::Client with automatic token injection and refresh.

use anyhow::{bail, Context, Result};

use crate::config::Config;

/// Authenticated client for the Campus backend.
pub struct ApiClient {
    http: reqwest::Client,
    config: Config,
}

impl ApiClient {
    /// Load config and build a client. Refreshes the access token first if
    /// it is missing or expired and a refresh token is available.
    pub async fn new() -> Result<Self> {
        let mut config = Config::load()?;

        let needs_refresh = config.access_token.as_ref().map_or(true, |t| t.is_expired());
        if needs_refresh {
            if config.refresh_token.is_some() {
                tracing::info!("Access token missing or expired, refreshing...");
                match crate::auth::session::refresh().await {
                    Ok(true) => {
                        config = Config::load()?;
                    }
                    Ok(false) => {
                        bail!("No refresh token available. Run 'campus-cli login'.");
                    }
                    Err(e) => {
                        bail!("Token refresh failed: {:#}. Run 'campus-cli login'.", e);
                    }
                }
            } else {
                bail!("Not logged in. Run 'campus-cli login'.");
            }
        }

        Ok(Self {
            http: reqwest::Client::new(),
            config,
        })
    }

    pub fn server_url(&self) -> Result<&str> {
        self.config.require_server_url()
    }

    pub fn access_token(&self) -> Result<String> {
        let token = self
            .config
            .access_token
            .as_ref()
            .context("No access token. Run 'campus-cli login' first.")?;
        if token.is_expired() {
            bail!("Access token expired. Run 'campus-cli login'.");
        }
        Ok(token.token.clone())
    }

    /// Our own user id, as recorded at login.
    pub fn self_id(&self) -> &str {
        self.config.user_id.as_deref().unwrap_or("")
    }

    fn url(&self, path: &str) -> Result<String> {
        Ok(format!(
            "{}{}",
            self.server_url()?.trim_end_matches('/'),
            path
        ))
    }

    /// GET request with bearer auth.
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = self.url(path)?;
        let token = self.access_token()?;
        tracing::debug!("GET {}", url);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        check_response(resp, &url).await
    }

    /// POST request with bearer auth and a JSON body.
    pub async fn post(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        let url = self.url(path)?;
        let token = self.access_token()?;
        tracing::debug!("POST {}", url);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        check_response(resp, &url).await
    }

    /// POST a multipart form (uploads).
    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<reqwest::Response> {
        let url = self.url(path)?;
        let token = self.access_token()?;
        tracing::debug!("POST (multipart) {}", url);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        check_response(resp, &url).await
    }
}

/// Check HTTP response status code and return a clear error on failure.
async fn check_response(resp: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        bail!(
            "401 Unauthorized for {}. Session may be invalid -- run 'campus-cli login'.",
            url
        );
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("HTTP {} for {}: {}", status.as_u16(), url, body);
    }
    Ok(resp)
}
