//! In-memory message store
//!
//! Implements the same trait semantics as the Postgres store, including the
//! unique message-control-id contract. Used by tests and local development.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::message::{Hl7Message, MessagePatch};
use crate::store::MessageStore;
use crate::StoreError;

/// Message store backed by a process-local vector
#[derive(Default)]
pub struct InMemoryMessageStore {
    messages: Mutex<Vec<Hl7Message>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored records, in insertion order
    pub async fn all(&self) -> Vec<Hl7Message> {
        self.messages.lock().await.clone()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    /// True when the store is empty
    pub async fn is_empty(&self) -> bool {
        self.messages.lock().await.is_empty()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn create(&self, message: &Hl7Message) -> Result<(), StoreError> {
        let mut messages = self.messages.lock().await;

        if let Some(control_id) = &message.message_control_id {
            if messages
                .iter()
                .any(|m| m.message_control_id.as_ref() == Some(control_id))
            {
                return Err(StoreError::DuplicateControlId);
            }
        }

        messages.push(message.clone());
        Ok(())
    }

    async fn update(&self, uuid: &str, patch: MessagePatch) -> Result<Hl7Message, StoreError> {
        let mut messages = self.messages.lock().await;
        let message = messages
            .iter_mut()
            .find(|m| m.uuid == uuid)
            .ok_or_else(|| StoreError::NotFound(uuid.to_string()))?;

        if let Some(is_processed) = patch.is_processed {
            message.is_processed = is_processed;
        }
        if let Some(ack) = patch.ack {
            message.ack = Some(ack);
        }
        message.modified = Utc::now();

        Ok(message.clone())
    }

    async fn get(&self, uuid: &str) -> Result<Hl7Message, StoreError> {
        self.messages
            .lock()
            .await
            .iter()
            .find(|m| m.uuid == uuid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(uuid.to_string()))
    }

    async fn get_by_control_id(&self, control_id: &str) -> Result<Vec<Hl7Message>, StoreError> {
        let messages = self.messages.lock().await;
        // Insertion order doubles as creation order; newest first.
        Ok(messages
            .iter()
            .rev()
            .filter(|m| m.message_control_id.as_deref() == Some(control_id))
            .cloned()
            .collect())
    }

    async fn search_by_identifier(
        &self,
        identifier_type: &str,
        identifier: &str,
    ) -> Result<Vec<Hl7Message>, StoreError> {
        let messages = self.messages.lock().await;
        Ok(messages
            .iter()
            .rev()
            .filter(|m| {
                m.patient_identifiers
                    .as_ref()
                    .and_then(|ids| ids.get(identifier_type))
                    .and_then(|v| v.as_str())
                    == Some(identifier)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{SOURCE_DHOS, SOURCE_TIE};

    fn message_with_control_id(control_id: Option<&str>) -> Hl7Message {
        let mut m = Hl7Message::new(SOURCE_TIE, SOURCE_DHOS);
        m.message_control_id = control_id.map(str::to_string);
        m
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryMessageStore::new();
        let message = message_with_control_id(Some("Q1"));
        store.create(&message).await.unwrap();

        let fetched = store.get(&message.uuid).await.unwrap();
        assert_eq!(fetched.message_control_id.as_deref(), Some("Q1"));
    }

    #[tokio::test]
    async fn test_get_unknown_uuid() {
        let store = InMemoryMessageStore::new();
        assert!(matches!(
            store.get("nope").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_control_id_rejected() {
        let store = InMemoryMessageStore::new();
        store
            .create(&message_with_control_id(Some("Q1")))
            .await
            .unwrap();

        let err = store
            .create(&message_with_control_id(Some("Q1")))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateControlId));
    }

    #[tokio::test]
    async fn test_null_control_ids_do_not_collide() {
        let store = InMemoryMessageStore::new();
        store.create(&message_with_control_id(None)).await.unwrap();
        store.create(&message_with_control_id(None)).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_update_patch() {
        let store = InMemoryMessageStore::new();
        let message = message_with_control_id(Some("Q1"));
        store.create(&message).await.unwrap();

        let updated = store
            .update(
                &message.uuid,
                MessagePatch {
                    is_processed: Some(true),
                    ack: Some("MSA|AA|Q1".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(updated.is_processed);
        assert_eq!(updated.ack.as_deref(), Some("MSA|AA|Q1"));
    }

    #[tokio::test]
    async fn test_get_by_control_id_newest_first() {
        let store = InMemoryMessageStore::new();
        let first = message_with_control_id(Some("Q1"));
        store.create(&first).await.unwrap();
        let second = message_with_control_id(None);
        store.create(&second).await.unwrap();

        let found = store.get_by_control_id("Q1").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].uuid, first.uuid);
    }

    #[tokio::test]
    async fn test_search_by_identifier() {
        let store = InMemoryMessageStore::new();
        let mut message = message_with_control_id(Some("Q1"));
        message.patient_identifiers = Some(serde_json::json!({
            "NHS number": "1239874560",
            "MRN": "654321",
            "Visit ID": "909127805"
        }));
        store.create(&message).await.unwrap();

        let found = store.search_by_identifier("MRN", "654321").await.unwrap();
        assert_eq!(found.len(), 1);

        let none = store.search_by_identifier("MRN", "999999").await.unwrap();
        assert!(none.is_empty());
    }
}
