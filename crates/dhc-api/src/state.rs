//! Shared application state

use std::sync::Arc;

use dhc_store::MessageStore;
use dhc_trustomer::TrustomerCache;

use crate::config::Config;
use crate::epr::EprTransport;
use crate::jwt::EprTokenProvider;
use crate::publisher::EventPublisher;

/// Everything the request handlers need
///
/// The store pool, the publisher, the trustomer cache and the token
/// provider are the only long-lived singletons; each request is otherwise
/// self-contained.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn MessageStore>,
    pub publisher: Arc<dyn EventPublisher>,
    pub trustomer: Arc<TrustomerCache>,
    pub epr: Arc<dyn EprTransport>,
    pub epr_auth: Arc<EprTokenProvider>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn MessageStore>,
        publisher: Arc<dyn EventPublisher>,
        trustomer: Arc<TrustomerCache>,
        epr: Arc<dyn EprTransport>,
    ) -> Self {
        let epr_auth = Arc::new(EprTokenProvider::new(
            &config.epr_service_adapter_hs_key,
            &config.epr_service_adapter_issuer,
            config.jwt_expiry_seconds,
            config.mock_epr_service_adapter_scope.clone(),
            config.is_production,
        ));

        Self {
            config,
            store,
            publisher,
            trustomer,
            epr,
            epr_auth,
        }
    }
}
