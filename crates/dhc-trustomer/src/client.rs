//! HTTP client for the trustomer API

use std::time::Duration;

use crate::config::TrustomerConfig;
use crate::TrustomerError;

/// Client for fetching trustomer configuration
pub struct TrustomerClient {
    http: reqwest::Client,
    base_url: String,
    customer_code: String,
    api_key: String,
}

impl TrustomerClient {
    /// Create a new client
    ///
    /// `base_url` is the trustomer API host, e.g. `https://trustomer.example.com`.
    pub fn new(
        base_url: impl Into<String>,
        customer_code: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, TrustomerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(TrustomerError::Network)?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            customer_code: customer_code.into(),
            api_key: api_key.into(),
        })
    }

    /// Fetch the configuration for the configured customer code
    pub async fn fetch(&self) -> Result<TrustomerConfig, TrustomerError> {
        let url = format!(
            "{}/dhos/v1/trustomer/{}",
            self.base_url, self.customer_code
        );
        tracing::debug!(%url, "Fetching trustomer configuration");

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .header("X-Trustomer", &self.customer_code)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(TrustomerError::Network)?;

        if !response.status().is_success() {
            return Err(TrustomerError::UnexpectedStatus(response.status().as_u16()));
        }

        response
            .json::<TrustomerConfig>()
            .await
            .map_err(TrustomerError::Network)
    }
}
