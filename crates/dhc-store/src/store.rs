//! The message store trait

use async_trait::async_trait;

use crate::message::{Hl7Message, MessagePatch};
use crate::StoreError;

/// Persistence operations over the `hl7_message` table
///
/// Implementations must enforce the unique `message_control_id` contract:
/// inserting a record whose non-NULL control id already exists fails with
/// [`StoreError::DuplicateControlId`]. Duplicate detection deliberately
/// relies on this rather than on any cross-request locking.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert a new record
    async fn create(&self, message: &Hl7Message) -> Result<(), StoreError>;

    /// Patch named fields of an existing record
    async fn update(&self, uuid: &str, patch: MessagePatch) -> Result<Hl7Message, StoreError>;

    /// Fetch a record by uuid
    async fn get(&self, uuid: &str) -> Result<Hl7Message, StoreError>;

    /// Fetch all records with the given control id, newest first
    async fn get_by_control_id(&self, control_id: &str) -> Result<Vec<Hl7Message>, StoreError>;

    /// Fetch records whose stored identifier map carries the given value
    async fn search_by_identifier(
        &self,
        identifier_type: &str,
        identifier: &str,
    ) -> Result<Vec<Hl7Message>, StoreError>;
}
