//! Inbound ADT pipeline
//!
//! Order matters: decode, transform, parse, validate, generate actions and
//! the ACK, commit, publish. Once a wrapper exists, every failure becomes
//! an HL7-level NACK rather than an HTTP error; failures before that point
//! persist the raw content for forensics and surface as HTTP 400.

use base64::prelude::*;
use chrono::{DateTime, Utc};
use serde::Serialize;

use dhc_actions::ActionError;
use dhc_store::{Hl7Message, MessagePatch, MessageResponse, SOURCE_DHOS, SOURCE_TIE};
use dhc_validator::validate_hl7_message;
use dhc_wrapper::{AckCode, Hl7Wrapper};

use crate::error::{ApiError, Result};
use crate::publisher::INBOUND_ROUTING_KEY;
use crate::state::AppState;

/// Response for a submitted inbound message: the ACK, base64 encoded
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InboundMessageResponse {
    pub uuid: String,
    pub body: String,
    #[serde(rename = "type")]
    pub message_type: String,
}

/// A validation or processing failure that must answer with a NACK
struct Nack {
    code: AckCode,
    error_code: &'static str,
    reason: String,
}

/// Process a base64-encoded inbound HL7 message end to end
pub async fn create_and_process_hl7_message(
    state: &AppState,
    body_b64: &str,
) -> Result<InboundMessageResponse> {
    tracing::info!("Received base64 encoded HL7 message");

    let mut message = Hl7Message::new(SOURCE_TIE, SOURCE_DHOS);
    // Stash the encoded content so a decode failure still leaves a record.
    message.content = Some(body_b64.to_string());

    let decoded = match decode_b64_message(body_b64) {
        Ok(decoded) => decoded,
        Err(reason) => {
            tracing::error!("Failed to parse incoming HL7 message: {reason}");
            state.store.create(&message).await?;
            return Err(ApiError::BadRequest(reason));
        }
    };
    message.content = Some(decoded.clone());
    tracing::debug!("Decoded HL7 message");

    let transformer = match dhc_transform::lookup(&state.config.hl7_transformer) {
        Ok(transformer) => transformer,
        Err(error) => {
            tracing::error!("Failed to parse incoming HL7 message: {error}");
            state.store.create(&message).await?;
            return Err(ApiError::BadRequest(error.to_string()));
        }
    };
    let transformed = transformer.transform_incoming(&decoded);
    message.content = Some(transformed.clone());
    tracing::debug!("Transformed incoming HL7 message");

    let wrapper = match Hl7Wrapper::parse(&transformed) {
        Ok(wrapper) => wrapper,
        Err(error) => {
            tracing::error!("Failed to parse incoming HL7 message: {error}");
            state.store.create(&message).await?;
            return Err(ApiError::BadRequest(
                "Could not parse HL7 message".to_string(),
            ));
        }
    };
    tracing::debug!("Parsed HL7 message");

    // From here on, failures answer with a NACK referencing the original MSH.
    let mut is_message_valid = true;
    let actions = match validate_and_extract(state, &mut message, &wrapper) {
        Ok(actions) => Some(actions),
        Err(nack) => {
            tracing::warn!("Failed to process message: {}", nack.reason);
            message.ack = Some(wrapper.generate_ack(
                nack.code,
                Some(nack.error_code),
                Some(&nack.reason),
            ));
            is_message_valid = false;
            None
        }
    };

    match state.store.create(&message).await {
        Ok(()) => {}
        Err(dhc_store::StoreError::DuplicateControlId) => {
            // The unique index caught a replayed control id. Keep the record
            // for forensics, but answer AR; the stored row's control id is
            // nulled while the returned ACK still names the original.
            tracing::warn!("Failed to process message: duplicate message control ID");
            message.ack = Some(wrapper.generate_ack(
                AckCode::Reject,
                Some("Hl7ApplicationRejectException"),
                Some("HL7 message appears to be duplicate"),
            ));
            message.message_control_id = None;
            is_message_valid = false;
            state.store.create(&message).await?;
        }
        Err(other) => return Err(other.into()),
    }

    if is_message_valid {
        if let Some(actions) = actions {
            let event = serde_json::json!({
                "dhos_connector_message_uuid": message.uuid,
                "actions": actions,
            });
            tracing::debug!("Publishing internal message to DHOS");
            state
                .publisher
                .publish(INBOUND_ROUTING_KEY, &event)
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            tracing::debug!("Published internal message to DHOS");
        }
    }

    let ack = message.ack.clone().unwrap_or_default();
    tracing::debug!("Responding to HTTP request with ACK: {ack}");

    Ok(InboundMessageResponse {
        uuid: message.uuid,
        body: BASE64_STANDARD.encode(ack.as_bytes()),
        message_type: "HL7v2".to_string(),
    })
}

/// Validate the message, fill the record's metadata, and build the actions
fn validate_and_extract(
    state: &AppState,
    message: &mut Hl7Message,
    wrapper: &Hl7Wrapper,
) -> std::result::Result<Vec<dhc_actions::Action>, Nack> {
    let server_tz = state.config.server_timezone;

    validate_hl7_message(wrapper).map_err(|e| Nack {
        code: e.ack_code(),
        error_code: e.error_code(),
        reason: e.reason().to_string(),
    })?;
    tracing::debug!("Validated HL7 message");

    // Field extraction only happens after a successful validation pass.
    message.patient_identifiers =
        Some(serde_json::to_value(wrapper.patient_identifiers()).map_err(unexpected("Serialize"))?);
    message.message_type = wrapper.message_type();
    message.sent_at = wrapper
        .message_datetime_iso8601(server_tz)
        .map_err(unexpected("Datetime"))?
        .as_deref()
        .and_then(parse_instant);
    message.message_control_id = wrapper.message_control_id();
    message.ack = Some(wrapper.generate_ack(AckCode::Accept, None, None));
    tracing::info!(
        "Received message '{}' for processing",
        message.message_control_id.as_deref().unwrap_or("")
    );

    dhc_actions::generate_actions(wrapper, server_tz).map_err(|error| match error {
        ActionError::NoPatientIdentifiers => Nack {
            code: AckCode::Error,
            error_code: "Hl7ApplicationErrorException",
            reason: error.to_string(),
        },
        ActionError::Datetime(_) => unexpected("Datetime")(error),
        ActionError::Serialize(_) => unexpected("Serialize")(error),
    })
}

/// Any unexpected failure after parsing becomes an AE naming the error kind
fn unexpected<E: std::fmt::Display>(kind: &'static str) -> impl Fn(E) -> Nack {
    move |error| {
        tracing::error!(
            "Failed to process message: unexpected error, check the HL7 message contents: {error}"
        );
        Nack {
            code: AckCode::Error,
            error_code: "Hl7ApplicationErrorException",
            reason: format!("Unexpected error: {kind}Error"),
        }
    }
}

fn parse_instant(iso: &str) -> Option<DateTime<Utc>> {
    dhc_wrapper::datetime::parse_iso8601(iso)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn decode_b64_message(body_b64: &str) -> std::result::Result<String, String> {
    BASE64_STANDARD
        .decode(body_b64)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| format!("Message body could not be decoded as base64: {body_b64}"))
}

/// Patch an existing record (only `is_processed` is updatable)
pub async fn update_hl7_message(
    state: &AppState,
    message_uuid: &str,
    is_processed: bool,
) -> Result<()> {
    tracing::info!("Updating HL7 message with uuid {message_uuid}");
    state
        .store
        .update(
            message_uuid,
            MessagePatch {
                is_processed: Some(is_processed),
                ack: None,
            },
        )
        .await?;
    Ok(())
}

/// Fetch a single message by uuid
pub async fn get_hl7_message(state: &AppState, message_uuid: &str) -> Result<MessageResponse> {
    let message = state.store.get(message_uuid).await?;
    Ok(message.to_response())
}

/// Fetch messages by MSH-10, newest first
pub async fn get_hl7_message_by_control_id(
    state: &AppState,
    message_control_id: &str,
) -> Result<Vec<MessageResponse>> {
    let messages = state.store.get_by_control_id(message_control_id).await?;
    Ok(messages.iter().map(Hl7Message::to_response).collect())
}

/// Fetch messages by stored patient identifier
pub async fn get_hl7_message_by_identifier(
    state: &AppState,
    identifier_type: &str,
    identifier: &str,
) -> Result<Vec<MessageResponse>> {
    let messages = state
        .store
        .search_by_identifier(identifier_type, identifier)
        .await?;
    Ok(messages.iter().map(Hl7Message::to_response).collect())
}
