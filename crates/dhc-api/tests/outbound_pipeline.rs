//! End-to-end outbound ORU pipeline behaviour over the in-memory store.

mod common;

use common::*;
use dhc_api::transmit::create_oru_message;
use dhc_api::ApiError;
use serde_json::json;

fn oru_action_data() -> serde_json::Value {
    json!({
        "patient": {
            "uuid": "25e9c6e7-1b22-496d-9eda-6af919d7f254",
            "hospital_number": "111111",
            "nhs_number": "2222222222",
            "first_name": "Ugi",
            "last_name": "Maroon",
            "dob": "2002-11-23",
            "sex": "248152002"
        },
        "encounter": {
            "epr_encounter_id": "2018L86699800",
            "location_ods_code": "J-WD 5A^Bay A^Bed 1",
            "admitted_at": "2018-07-25T11:00:00.000Z"
        },
        "clinician": {
            "send_entry_identifier": 123456,
            "first_name": "Jane",
            "last_name": "Deer"
        },
        "observation_set": {
            "uuid": "0324e62b-88fb-4aef-b15c-ee0454ce997f",
            "record_time": "2019-01-30T13:06:26.870Z",
            "score_system": "news2",
            "score_value": 2,
            "score_severity": "medium",
            "spo2_scale": 1,
            "observations": [
                {
                    "observation_type": "spo2",
                    "observation_value": 94,
                    "observation_unit": "%",
                    "score_value": 0,
                    "measured_time": "2019-01-30T13:07:26.870Z"
                }
            ]
        }
    })
}

fn aa_ack_b64() -> String {
    b64("MSH|^~\\&|TRUST_TIE_ADT|TRUST|DHOS|SENSYNE|20190130130700||ACK|224ddf783bc4cc6c158f|P|2.6\rMSA|AA|224ddf783bc4cc6c158f")
}

#[tokio::test]
async fn test_oru_generation_disabled_is_noop() {
    let h = harness(test_config(), false, EprBehaviour::Ack(aa_ack_b64()));

    create_oru_message(&h.state, oru_action_data()).await.unwrap();

    assert!(h.store.is_empty().await);
    assert!(h.epr.calls.lock().await.is_empty());
}

#[tokio::test]
async fn test_oru_sent_and_ack_correlated() {
    let h = harness(test_config(), true, EprBehaviour::Ack(aa_ack_b64()));

    create_oru_message(&h.state, oru_action_data()).await.unwrap();

    // The adapter was called with a base64 hl7v2 body.
    let calls = h.epr.calls.lock().await;
    assert_eq!(calls.len(), 1);
    let (url, request) = &calls[0];
    assert_eq!(url, "http://epr-adapter/epr/v1/hl7_message");
    assert_eq!(request.message_type, "hl7v2");
    let sent_text = b64_decode(&request.body);
    assert!(sent_text.starts_with("MSH|^~\\&|DHOS|SENSYNE|TRUST_TIE_ADT|TRUST|"));
    assert!(sent_text.contains("|ORU^R01^ORU_R01|224ddf783bc4cc6c158f|P|2.6"));
    assert!(sent_text.contains("OBX|1|ST|ScoringSystem||NEWS2|"));

    // The record is processed with the remote ACK stored verbatim.
    let records = h.store.all().await;
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.src_description.as_deref(), Some("dhos"));
    assert_eq!(record.dst_description.as_deref(), Some("tie"));
    assert_eq!(
        record.message_control_id.as_deref(),
        Some("224ddf783bc4cc6c158f")
    );
    assert!(record.is_processed);
    assert_eq!(record.ack_status().as_deref(), Some("AA"));
    assert_eq!(record.status(), "processed");
}

#[tokio::test]
async fn test_adapter_unavailable_leaves_record_unprocessed() {
    let h = harness(test_config(), true, EprBehaviour::Unavailable);

    let err = create_oru_message(&h.state, oru_action_data())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ServiceUnavailable(_)));

    // The record exists for an external re-drive, without an ACK.
    let records = h.store.all().await;
    assert_eq!(records.len(), 1);
    assert!(!records[0].is_processed);
    assert!(records[0].ack.is_none());
    assert_eq!(records[0].status(), "sent");
}

#[tokio::test]
async fn test_adapter_rejection_is_value_error() {
    let h = harness(test_config(), true, EprBehaviour::Status(422));

    let err = create_oru_message(&h.state, oru_action_data())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
    assert!(!h.store.all().await[0].is_processed);
}

#[tokio::test]
async fn test_empty_ack_body_is_malformed() {
    let h = harness(test_config(), true, EprBehaviour::EmptyBody);

    let err = create_oru_message(&h.state, oru_action_data())
        .await
        .unwrap_err();
    match err {
        ApiError::BadRequest(reason) => {
            assert!(reason.contains("ACK response message expected from EPR"))
        }
        other => panic!("expected BadRequest, got {other:?}"),
    }
    assert!(!h.store.all().await[0].is_processed);
}

#[tokio::test]
async fn test_missing_entities_rejected() {
    let h = harness(test_config(), true, EprBehaviour::EmptyBody);

    let mut data = oru_action_data();
    data.as_object_mut().unwrap().remove("patient");
    data.as_object_mut().unwrap().remove("encounter");

    let err = create_oru_message(&h.state, data).await.unwrap_err();
    match err {
        ApiError::BadRequest(reason) => {
            assert_eq!(reason, "Missing data in action: patient, encounter")
        }
        other => panic!("expected BadRequest, got {other:?}"),
    }
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn test_unknown_score_system_rejected_before_store() {
    let h = harness(test_config(), true, EprBehaviour::EmptyBody);

    let mut data = oru_action_data();
    data["observation_set"]["score_system"] = json!("qsofa");

    let err = create_oru_message(&h.state, data).await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
    assert!(h.store.is_empty().await);
    assert!(h.epr.calls.lock().await.is_empty());
}
