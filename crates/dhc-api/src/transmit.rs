//! Outbound pipelines: ORU to the EPR service adapter, CDA to Mirth
//!
//! ORU path: config gate, generate, transform, persist, POST, correlate the
//! returned ACK. A transport failure leaves the record unprocessed so an
//! external queue can re-drive it.

use base64::prelude::*;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use dhc_oru::{Clinician, Encounter, ObservationSet, OruGenerator, Patient};
use dhc_store::{Hl7Message, MessagePatch, DEST_MIRTH, SOURCE_DHOS, SOURCE_TIE};
use dhc_wrapper::Hl7Wrapper;

use crate::epr::{EprRequest, TransportError};
use crate::error::{ApiError, Result};
use crate::soap::MirthClient;
use crate::state::AppState;

/// The `process_observation_set` action payload
#[derive(Debug, Deserialize)]
pub struct OruActionData {
    pub patient: Option<Patient>,
    pub encounter: Option<Encounter>,
    pub observation_set: Option<ObservationSet>,
    pub clinician: Option<Clinician>,
}

/// Generate, persist and transmit an ORU message for an observation set
///
/// A no-op when the trustomer has ORU generation disabled.
pub async fn create_oru_message(state: &AppState, data: Value) -> Result<()> {
    let trustomer_config = state
        .trustomer
        .get()
        .await
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

    if !trustomer_config.send_config.generate_oru_messages {
        tracing::debug!("Not sending ORU message due to config");
        return Ok(());
    }

    let action: OruActionData = serde_json::from_value(data)
        .map_err(|e| ApiError::BadRequest(format!("Malformed action data: {e}")))?;

    let (patient, encounter, observation_set) =
        match (action.patient, action.encounter, action.observation_set) {
            (Some(patient), Some(encounter), Some(observation_set)) => {
                (patient, encounter, observation_set)
            }
            (patient, encounter, observation_set) => {
                let missing: Vec<&str> = [
                    ("patient", patient.is_none()),
                    ("encounter", encounter.is_none()),
                    ("observation_set", observation_set.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, is_missing)| is_missing.then_some(name))
                .collect();
                return Err(ApiError::BadRequest(format!(
                    "Missing data in action: {}",
                    missing.join(", ")
                )));
            }
        };

    let generator = OruGenerator::new(&trustomer_config, state.config.server_timezone);
    let oru_message = generator
        .generate(
            &patient,
            &encounter,
            &observation_set,
            action.clinician.as_ref(),
        )
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    tracing::debug!("Generated ORU message");

    tracing::debug!("Transforming outgoing ORU message");
    let transformer = dhc_transform::lookup(&state.config.hl7_transformer)
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;
    let oru_message = transformer.transform_outgoing(&oru_message);

    let message = create_and_save_hl7_message(state, &oru_message).await?;
    post_hl7_message(state, &message).await
}

/// Persist an outbound ORU message record
async fn create_and_save_hl7_message(state: &AppState, hl7_message: &str) -> Result<Hl7Message> {
    tracing::debug!("Saving HL7 message in database");
    let wrapper = Hl7Wrapper::parse(hl7_message)
        .map_err(|e| ApiError::Internal(format!("Generated message unparseable: {e}")))?;

    let mut message = Hl7Message::new(SOURCE_DHOS, SOURCE_TIE);
    message.content = Some(wrapper.raw().to_string());
    message.patient_identifiers = Some(
        serde_json::to_value(wrapper.patient_identifiers())
            .map_err(|e| ApiError::Internal(e.to_string()))?,
    );
    message.message_type = wrapper.message_type();
    message.sent_at = wrapper
        .message_datetime_iso8601(state.config.server_timezone)
        .ok()
        .flatten()
        .and_then(|iso| {
            dhc_wrapper::datetime::parse_iso8601(&iso)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        });
    message.message_control_id = wrapper.message_control_id();

    state.store.create(&message).await?;
    tracing::debug!("HL7 message saved with UUID {}", message.uuid);
    Ok(message)
}

/// Transmit a persisted outbound message and correlate the returned ACK
pub async fn post_hl7_message(state: &AppState, message: &Hl7Message) -> Result<()> {
    // The same table carries HL7v2 messages for the TIE and HL7v3 CDA
    // documents for Mirth; the destination picks the transport.
    if message.dst_description.as_deref() == Some(DEST_MIRTH) {
        return post_cda_message(state, message).await;
    }

    tracing::debug!("POSTing HL7 message to EPR service adapter");
    let url = format!(
        "{}/epr/v1/hl7_message",
        state.config.epr_service_adapter_url_base
    );
    let headers = state.epr_auth.headers()?;
    let content = message.content.clone().unwrap_or_default();
    let request = EprRequest::hl7v2(BASE64_STANDARD.encode(content.as_bytes()));

    tracing::info!(
        "Sending message '{}'",
        message.message_control_id.as_deref().unwrap_or("")
    );
    let response = state
        .epr
        .post_hl7_message(&url, &headers, &request)
        .await
        .map_err(|error| match error {
            TransportError::Unavailable(reason) => {
                tracing::error!(
                    "Couldn't send HL7 message {} - connection error: {reason}",
                    message.uuid
                );
                ApiError::ServiceUnavailable(reason)
            }
            TransportError::Status(status) => {
                tracing::error!(
                    "Couldn't send HL7 message {} - received HTTP error {status}",
                    message.uuid
                );
                ApiError::BadRequest(format!("EPR service adapter returned HTTP {status}"))
            }
            TransportError::Malformed(reason) => ApiError::BadRequest(reason),
        })?;

    let Some(ack_b64) = response.body.filter(|b| !b.is_empty()) else {
        return Err(ApiError::BadRequest(format!(
            "ACK response message expected from EPR, none received for '{}'",
            message.uuid
        )));
    };

    let ack_text = BASE64_STANDARD
        .decode(&ack_b64)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "ACK response from EPR could not be decoded for '{}'",
                message.uuid
            ))
        })?;

    let ack_status = Hl7Wrapper::parse(&ack_text)
        .ok()
        .and_then(|w| w.field("MSA.F1"));
    match ack_status.as_deref() {
        Some("AA") => tracing::info!(
            "Message '{}' has been successfully received",
            message.message_control_id.as_deref().unwrap_or("")
        ),
        other => tracing::error!(
            "Message '{}' did not receive a successful acknowledgement. ({})",
            message.message_control_id.as_deref().unwrap_or(""),
            other.unwrap_or("none")
        ),
    }

    state
        .store
        .update(
            &message.uuid,
            MessagePatch {
                is_processed: Some(true),
                ack: Some(ack_text),
            },
        )
        .await?;

    Ok(())
}

/// Persist an outbound CDA document record
pub async fn create_and_save_cda_message(state: &AppState, cda_message: &str) -> Result<Hl7Message> {
    tracing::debug!("Saving HL7 CDA message in database");

    let mut message = Hl7Message::new(SOURCE_DHOS, DEST_MIRTH);
    message.content = Some(cda_message.to_string());
    message.sent_at = Some(Utc::now());

    state.store.create(&message).await?;
    tracing::debug!("HL7 CDA message saved with UUID {}", message.uuid);
    Ok(message)
}

/// Transmit a CDA record over SOAP and mark it processed
async fn post_cda_message(state: &AppState, message: &Hl7Message) -> Result<()> {
    if state.config.mirth_host_url_base.is_empty() {
        tracing::warn!("Post CDA message called, Mirth host not configured");
        return Ok(());
    }

    let client = MirthClient::new(
        &state.config.mirth_host_url_base,
        &state.config.mirth_username,
        &state.config.mirth_password,
    )?;
    client
        .send_cda(message.content.as_deref().unwrap_or(""))
        .await?;

    state
        .store
        .update(
            &message.uuid,
            MessagePatch {
                is_processed: Some(true),
                ack: None,
            },
        )
        .await?;

    tracing::debug!("Processed and sent CDA message");
    Ok(())
}
