//! EPR service adapter transport
//!
//! The outbound pipeline talks to the adapter through [`EprTransport`] so
//! the ACK-correlation logic is testable without a network. The wired
//! implementation is a reqwest POST with a hard 15 second timeout.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request body for `POST {EPR_BASE}/epr/v1/hl7_message`
#[derive(Debug, Clone, Serialize)]
pub struct EprRequest {
    #[serde(rename = "type")]
    pub message_type: String,
    pub body: String,
}

impl EprRequest {
    /// An HL7 v2 payload, already base64 encoded
    pub fn hl7v2(body_b64: String) -> Self {
        Self {
            message_type: "hl7v2".to_string(),
            body: body_b64,
        }
    }
}

/// Response body from the adapter; `body` carries the base64 ACK
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EprResponse {
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection failure or timeout; the message stays unprocessed and is
    /// eligible for an external re-drive
    #[error("EPR service adapter unavailable: {0}")]
    Unavailable(String),

    /// The adapter answered with a non-2xx status
    #[error("EPR service adapter returned HTTP {0}")]
    Status(u16),

    /// The adapter answered 2xx but the body was not parseable
    #[error("EPR service adapter response malformed: {0}")]
    Malformed(String),
}

/// Transport to the EPR service adapter
#[async_trait]
pub trait EprTransport: Send + Sync {
    async fn post_hl7_message(
        &self,
        url: &str,
        headers: &[(String, String)],
        request: &EprRequest,
    ) -> Result<EprResponse, TransportError>;
}

/// reqwest-backed transport with the adapter's 15 second timeout
pub struct ReqwestEprTransport {
    http: reqwest::Client,
}

impl ReqwestEprTransport {
    pub fn new() -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl EprTransport for ReqwestEprTransport {
    async fn post_hl7_message(
        &self,
        url: &str,
        headers: &[(String, String)],
        request: &EprRequest,
    ) -> Result<EprResponse, TransportError> {
        let mut builder = self.http.post(url).json(request);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                TransportError::Unavailable(e.to_string())
            } else {
                TransportError::Malformed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response
            .json::<EprResponse>()
            .await
            .map_err(|e| TransportError::Malformed(e.to_string()))
    }
}
