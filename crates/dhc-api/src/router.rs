//! REST surface for the connector

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::{receive, transmit};

/// JSON body for an inbound HL7 submission
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    /// Base64-encoded HL7 v2 message
    pub body: String,
}

/// JSON body for a message update (only `is_processed` is updatable)
#[derive(Debug, Deserialize)]
pub struct MessageUpdate {
    pub is_processed: bool,
}

/// JSON body for a CDA submission
#[derive(Debug, Deserialize)]
pub struct CdaMessageRequest {
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: String,
}

#[derive(Debug, Deserialize)]
pub struct IdentifierQuery {
    pub identifier_type: String,
    pub identifier: String,
}

/// Build the axum router for the `/dhos/v1` surface
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/dhos/v1/message", post(create_and_process_message))
        .route(
            "/dhos/v1/message/search",
            get(get_hl7_message_by_identifier),
        )
        .route(
            "/dhos/v1/message/search/{message_control_id}",
            get(get_hl7_message_by_message_control_id),
        )
        .route(
            "/dhos/v1/message/{message_uuid}",
            get(get_hl7_message).patch(update_message),
        )
        .route("/dhos/v1/oru_message", post(create_oru_message))
        .route("/dhos/v1/cda_message", post(create_cda_message))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn create_and_process_message(
    State(state): State<Arc<AppState>>,
    Json(message_details): Json<MessageRequest>,
) -> Result<Json<receive::InboundMessageResponse>> {
    let response =
        receive::create_and_process_hl7_message(&state, &message_details.body).await?;
    Ok(Json(response))
}

async fn update_message(
    State(state): State<Arc<AppState>>,
    Path(message_uuid): Path<String>,
    Json(update): Json<MessageUpdate>,
) -> Result<StatusCode> {
    receive::update_hl7_message(&state, &message_uuid, update.is_processed).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_hl7_message(
    State(state): State<Arc<AppState>>,
    Path(message_uuid): Path<String>,
) -> Result<Json<dhc_store::MessageResponse>> {
    Ok(Json(receive::get_hl7_message(&state, &message_uuid).await?))
}

async fn get_hl7_message_by_message_control_id(
    State(state): State<Arc<AppState>>,
    Path(message_control_id): Path<String>,
) -> Result<Json<Vec<dhc_store::MessageResponse>>> {
    Ok(Json(
        receive::get_hl7_message_by_control_id(&state, &message_control_id).await?,
    ))
}

async fn get_hl7_message_by_identifier(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IdentifierQuery>,
) -> Result<Json<Vec<dhc_store::MessageResponse>>> {
    Ok(Json(
        receive::get_hl7_message_by_identifier(&state, &query.identifier_type, &query.identifier)
            .await?,
    ))
}

async fn create_oru_message(
    State(state): State<Arc<AppState>>,
    Json(message_details): Json<Value>,
) -> Result<StatusCode> {
    let data = message_details
        .get("actions")
        .and_then(Value::as_array)
        .and_then(|actions| {
            actions
                .iter()
                .find(|a| a.get("name").and_then(Value::as_str) == Some("process_observation_set"))
        })
        .and_then(|action| action.get("data"))
        .cloned()
        .ok_or_else(|| {
            ApiError::BadRequest(
                "Request requires a 'process_observation_set' action with data".to_string(),
            )
        })?;

    transmit::create_oru_message(&state, data).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_cda_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CdaMessageRequest>,
) -> Result<StatusCode> {
    if request.message_type != "HL7v3CDA" {
        return Err(ApiError::BadRequest(format!(
            "Unsupported CDA message type {}",
            request.message_type
        )));
    }

    if state.config.mirth_host_url_base.is_empty() {
        tracing::warn!("Not sending CDA message due to config");
        return Ok(StatusCode::NOT_IMPLEMENTED);
    }

    let message = transmit::create_and_save_cda_message(&state, &request.content).await?;

    // A connection-class failure is swallowed: the record stays unprocessed
    // and the failed-request queue retries it later.
    match transmit::post_hl7_message(&state, &message).await {
        Ok(()) => {}
        Err(ApiError::ServiceUnavailable(reason)) => {
            tracing::warn!(
                hl7_message_uuid = %message.uuid,
                "Failed to send CDA message, will be handled by failed request queue: {reason}"
            );
        }
        Err(other) => return Err(other),
    }

    Ok(StatusCode::CREATED)
}
