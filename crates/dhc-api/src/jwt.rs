//! Bearer token generation for the EPR service adapter
//!
//! Outbound calls attach a short-lived HS512 token with
//! `{iss, aud, scope, exp}` claims. The scope is read from a process-local
//! cache filled by the platform's auth machinery; in production a missing
//! scope fails the request rather than sending an under-scoped token.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiError, Result};

#[derive(Debug, Serialize)]
struct Claims {
    iss: String,
    aud: String,
    scope: String,
    exp: i64,
}

/// Process-local scope cache with a short TTL
#[derive(Default)]
pub struct ScopeCache {
    state: RwLock<Option<(String, Instant)>>,
    ttl: Option<Duration>,
}

impl ScopeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: RwLock::new(None),
            ttl: Some(ttl),
        }
    }

    /// Store the adapter scope
    pub fn set(&self, scope: &str) {
        let mut state = self.state.write().expect("scope cache lock poisoned");
        *state = Some((scope.to_string(), Instant::now()));
    }

    /// The cached scope, if present and not expired
    pub fn get(&self) -> Option<String> {
        let state = self.state.read().expect("scope cache lock poisoned");
        let (scope, stored_at) = state.as_ref()?;
        if let Some(ttl) = self.ttl {
            if stored_at.elapsed() >= ttl {
                return None;
            }
        }
        Some(scope.clone())
    }
}

/// Token and header provider for the EPR service adapter
pub struct EprTokenProvider {
    hs_key: String,
    issuer: String,
    expiry: Duration,
    scope_cache: ScopeCache,
    mock_scope: Option<String>,
    is_production: bool,
}

impl EprTokenProvider {
    pub fn new(
        hs_key: &str,
        issuer: &str,
        expiry_seconds: u64,
        mock_scope: Option<String>,
        is_production: bool,
    ) -> Self {
        Self {
            hs_key: hs_key.to_string(),
            issuer: issuer.to_string(),
            expiry: Duration::from_secs(expiry_seconds),
            scope_cache: ScopeCache::new(Duration::from_secs(60)),
            mock_scope,
            is_production,
        }
    }

    /// The scope cache, for the platform machinery that fills it
    pub fn scope_cache(&self) -> &ScopeCache {
        &self.scope_cache
    }

    fn scope(&self) -> Result<String> {
        if let Some(scope) = self.scope_cache.get() {
            return Ok(scope);
        }

        match &self.mock_scope {
            Some(mock) if !self.is_production => {
                tracing::warn!("Scope cache empty, using the configured mock adapter scope");
                Ok(mock.clone())
            }
            _ => Err(ApiError::ServiceUnavailable(
                "Could not retrieve system scope from cache".to_string(),
            )),
        }
    }

    /// Encode a fresh bearer token
    pub fn token(&self) -> Result<String> {
        let claims = Claims {
            iss: self.issuer.clone(),
            aud: self.issuer.clone(),
            scope: self.scope()?,
            exp: (Utc::now() + self.expiry).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(self.hs_key.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Could not encode EPR bearer token: {e}")))
    }

    /// Full header set for an EPR service adapter request
    pub fn headers(&self) -> Result<Vec<(String, String)>> {
        let token = self.token()?;
        Ok(vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("Authorization".to_string(), format!("Bearer {token}")),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("X-Request-ID".to_string(), Uuid::new_v4().to_string()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct DecodedClaims {
        iss: String,
        aud: String,
        scope: String,
        exp: i64,
    }

    fn provider(mock_scope: Option<&str>, is_production: bool) -> EprTokenProvider {
        EprTokenProvider::new(
            "secret",
            "http://epr/",
            600,
            mock_scope.map(str::to_string),
            is_production,
        )
    }

    #[test]
    fn test_token_claims() {
        let provider = provider(None, false);
        provider.scope_cache().set("read:epr write:epr");

        let token = provider.token().unwrap();

        let mut validation = Validation::new(Algorithm::HS512);
        validation.set_audience(&["http://epr/"]);
        let decoded = decode::<DecodedClaims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims.iss, "http://epr/");
        assert_eq!(decoded.claims.aud, "http://epr/");
        assert_eq!(decoded.claims.scope, "read:epr write:epr");
        assert!(decoded.claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_missing_scope_in_production_is_unavailable() {
        let provider = provider(Some("mock"), true);
        let err = provider.token().unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_missing_scope_without_mock_is_unavailable() {
        let provider = provider(None, false);
        let err = provider.token().unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_mock_scope_fallback_outside_production() {
        let provider = provider(Some("mock-scope"), false);
        assert!(provider.token().is_ok());
    }

    #[test]
    fn test_headers_include_request_id() {
        let provider = provider(Some("mock"), false);
        let headers = provider.headers().unwrap();
        assert!(headers.iter().any(|(k, _)| k == "X-Request-ID"));
        assert!(headers
            .iter()
            .any(|(k, v)| k == "Authorization" && v.starts_with("Bearer ")));
    }
}
