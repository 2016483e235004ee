#![allow(dead_code)]

//! Shared harness for pipeline tests: in-memory store, recording publisher,
//! pinned trustomer configuration, stubbed EPR transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use dhc_api::epr::{EprRequest, EprResponse, EprTransport, TransportError};
use dhc_api::publisher::{EventPublisher, PublishError};
use dhc_api::{AppState, Config};
use dhc_store::InMemoryMessageStore;
use dhc_trustomer::{Hl7Config, OxygenMask, SendConfig, TrustomerCache, TrustomerConfig};

/// Publisher that records every event instead of sending it anywhere
#[derive(Default)]
pub struct RecordingPublisher {
    pub events: Mutex<Vec<(String, Value)>>,
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, routing_key: &str, body: &Value) -> Result<(), PublishError> {
        self.events
            .lock()
            .await
            .push((routing_key.to_string(), body.clone()));
        Ok(())
    }
}

/// What the stubbed EPR adapter should answer with
#[derive(Clone)]
pub enum EprBehaviour {
    /// 2xx with the given base64 ACK body
    Ack(String),
    /// 2xx with no body
    EmptyBody,
    /// Connection failure / timeout
    Unavailable,
    /// Non-2xx status
    Status(u16),
}

pub struct StubEprTransport {
    pub behaviour: EprBehaviour,
    pub calls: Mutex<Vec<(String, EprRequest)>>,
}

impl StubEprTransport {
    pub fn new(behaviour: EprBehaviour) -> Self {
        Self {
            behaviour,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EprTransport for StubEprTransport {
    async fn post_hl7_message(
        &self,
        url: &str,
        _headers: &[(String, String)],
        request: &EprRequest,
    ) -> Result<EprResponse, TransportError> {
        self.calls
            .lock()
            .await
            .push((url.to_string(), request.clone()));

        match &self.behaviour {
            EprBehaviour::Ack(body) => Ok(EprResponse {
                body: Some(body.clone()),
            }),
            EprBehaviour::EmptyBody => Ok(EprResponse { body: None }),
            EprBehaviour::Unavailable => {
                Err(TransportError::Unavailable("connection refused".to_string()))
            }
            EprBehaviour::Status(status) => Err(TransportError::Status(*status)),
        }
    }
}

pub fn test_config() -> Config {
    Config {
        epr_service_adapter_url_base: "http://epr-adapter".to_string(),
        epr_service_adapter_hs_key: "secret".to_string(),
        epr_service_adapter_issuer: "http://epr/".to_string(),
        jwt_expiry_seconds: 600,
        mirth_host_url_base: String::new(),
        mirth_username: String::new(),
        mirth_password: String::new(),
        server_timezone: chrono_tz::UTC,
        hl7_transformer: "identity".to_string(),
        customer_code: "test".to_string(),
        trustomer_api_host: "http://trustomer".to_string(),
        trustomer_api_key: "secret".to_string(),
        trustomer_cache_ttl: Duration::from_secs(3600),
        mock_epr_service_adapter_scope: Some("read:send write:send".to_string()),
        is_production: false,
        database_url: String::new(),
        listen_address: "127.0.0.1:0".to_string(),
    }
}

pub fn trustomer_config(generate_oru_messages: bool) -> TrustomerConfig {
    TrustomerConfig {
        hl7_config: Hl7Config {
            outgoing_timestamp_format: "%Y%m%d%H%M%S.%L%z".to_string(),
            outgoing_sending_application: "DHOS".to_string(),
            outgoing_sending_facility: "SENSYNE".to_string(),
            outgoing_receiving_application: "TRUST_TIE_ADT".to_string(),
            outgoing_receiving_facility: "TRUST".to_string(),
            outgoing_processing_id: "P".to_string(),
        },
        send_config: SendConfig {
            generate_oru_messages,
            oxygen_masks: vec![OxygenMask {
                code: "H{mask_percent}".to_string(),
                name: "Humidified".to_string(),
            }],
        },
    }
}

pub struct TestHarness {
    pub state: Arc<AppState>,
    pub store: Arc<InMemoryMessageStore>,
    pub publisher: Arc<RecordingPublisher>,
    pub epr: Arc<StubEprTransport>,
}

pub fn harness(config: Config, generate_oru: bool, behaviour: EprBehaviour) -> TestHarness {
    let store = Arc::new(InMemoryMessageStore::new());
    let publisher = Arc::new(RecordingPublisher::default());
    let epr = Arc::new(StubEprTransport::new(behaviour));
    let trustomer = Arc::new(TrustomerCache::fixed(trustomer_config(generate_oru)));

    let state = Arc::new(AppState::new(
        config,
        store.clone(),
        publisher.clone(),
        trustomer,
        epr.clone(),
    ));

    TestHarness {
        state,
        store,
        publisher,
        epr,
    }
}

/// Sample A01: STEPHEN ZZZEDUCATION, MRN 654321, NHS 1239874560,
/// encounter 909127805, ward NOC-Ward B, admitted 2017-07-31T14:13:00Z
pub const A01: &str = "MSH|^~\\&|OXON_TIE_ADT|OXON|DHOS|SENSYNE|20170731141348||ADT^A01|Q54356818T76757911|P|2.3\r\
EVN|A01|20170731141300\r\
PID|1|654321^^^^MRN|654321^^^^MRN~1239874560^^^^NHSNBR||ZZZEDUCATION^STEPHEN^^^^^CURRENT||19821103|1\r\
PV1|1|INPATIENT|NOC-Ward B^Day Room^Chair 6||||||||||||||||909127805|||||||||||||||||||||||||201707311413";

/// Sample A05 with a blacklisted WAITLIST encounter
pub const A05: &str = "MSH|^~\\&|OXON_TIE_ADT|OXON|DHOS|SENSYNE|20170731141348||ADT^A05|Q54356818T76757915|P|2.3\r\
PID|1|654321^^^^MRN|654321^^^^MRN~1239874560^^^^NHSNBR||ZZZEDUCATION^STEPHEN||19821103|1\r\
PV1|1|WAITLIST|NOC-Ward B^Day Room^Chair 6||||||||||||||||909127805|||||||||||||||||||||||||201707311413";

/// Sample A34 merge: new MRN 90532398, merged MRN 90532399
pub const A34: &str = "MSH|^~\\&|OXON_TIE_ADT|OXON|DHOS|SENSYNE|20170731141348||ADT^A34|Q54356818T76757912|P|2.3\r\
PID|1|90532398^^^^MRN|90532398^^^^MRN||ZZZTEST^MERGE||19821103|1\r\
MRG|90532399^^^^MRN";

pub fn b64(raw: &str) -> String {
    use base64::prelude::*;
    BASE64_STANDARD.encode(raw.as_bytes())
}

pub fn b64_decode(encoded: &str) -> String {
    use base64::prelude::*;
    String::from_utf8(BASE64_STANDARD.decode(encoded).unwrap()).unwrap()
}
