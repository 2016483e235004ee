//! Postgres-backed message store

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::message::{Hl7Message, MessagePatch};
use crate::store::MessageStore;
use crate::StoreError;

const COLUMNS: &str = "uuid, created, created_by, modified, modified_by, content, \
                       message_type, sent_at_, is_processed, src_description, \
                       dst_description, message_control_id, ack, patient_identifiers";

/// Message store over a Postgres connection pool
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    /// Create a store over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded schema migrations
    pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))
    }

    fn row_to_message(row: &sqlx::postgres::PgRow) -> Result<Hl7Message, sqlx::Error> {
        Ok(Hl7Message {
            uuid: row.try_get("uuid")?,
            created: row.try_get("created")?,
            created_by: row.try_get("created_by")?,
            modified: row.try_get("modified")?,
            modified_by: row.try_get("modified_by")?,
            content: row.try_get("content")?,
            message_type: row.try_get("message_type")?,
            sent_at: row.try_get("sent_at_")?,
            is_processed: row.try_get("is_processed")?,
            src_description: row.try_get("src_description")?,
            dst_description: row.try_get("dst_description")?,
            message_control_id: row.try_get("message_control_id")?,
            ack: row.try_get("ack")?,
            patient_identifiers: row.try_get("patient_identifiers")?,
        })
    }
}

fn map_insert_error(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &error {
        if db.is_unique_violation() {
            return StoreError::DuplicateControlId;
        }
    }
    StoreError::Database(error)
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn create(&self, message: &Hl7Message) -> Result<(), StoreError> {
        let query = format!(
            "INSERT INTO hl7_message ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        );

        sqlx::query(&query)
            .bind(&message.uuid)
            .bind(message.created)
            .bind(&message.created_by)
            .bind(message.modified)
            .bind(&message.modified_by)
            .bind(&message.content)
            .bind(&message.message_type)
            .bind(message.sent_at)
            .bind(message.is_processed)
            .bind(&message.src_description)
            .bind(&message.dst_description)
            .bind(&message.message_control_id)
            .bind(&message.ack)
            .bind(&message.patient_identifiers)
            .execute(&self.pool)
            .await
            .map_err(map_insert_error)?;

        Ok(())
    }

    async fn update(&self, uuid: &str, patch: MessagePatch) -> Result<Hl7Message, StoreError> {
        let query = format!(
            "UPDATE hl7_message \
             SET is_processed = COALESCE($2, is_processed), \
                 ack = COALESCE($3, ack), \
                 modified = NOW() \
             WHERE uuid = $1 \
             RETURNING {COLUMNS}"
        );

        let row = sqlx::query(&query)
            .bind(uuid)
            .bind(patch.is_processed)
            .bind(&patch.ack)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Database)?
            .ok_or_else(|| StoreError::NotFound(uuid.to_string()))?;

        Self::row_to_message(&row).map_err(StoreError::Database)
    }

    async fn get(&self, uuid: &str) -> Result<Hl7Message, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM hl7_message WHERE uuid = $1");

        let row = sqlx::query(&query)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Database)?
            .ok_or_else(|| StoreError::NotFound(uuid.to_string()))?;

        Self::row_to_message(&row).map_err(StoreError::Database)
    }

    async fn get_by_control_id(&self, control_id: &str) -> Result<Vec<Hl7Message>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM hl7_message \
             WHERE message_control_id = $1 \
             ORDER BY created DESC"
        );

        let rows = sqlx::query(&query)
            .bind(control_id)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Database)?;

        rows.iter()
            .map(|row| Self::row_to_message(row).map_err(StoreError::Database))
            .collect()
    }

    async fn search_by_identifier(
        &self,
        identifier_type: &str,
        identifier: &str,
    ) -> Result<Vec<Hl7Message>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM hl7_message \
             WHERE patient_identifiers ->> $1 = $2 \
             ORDER BY created DESC"
        );

        let rows = sqlx::query(&query)
            .bind(identifier_type)
            .bind(identifier)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Database)?;

        rows.iter()
            .map(|row| Self::row_to_message(row).map_err(StoreError::Database))
            .collect()
    }
}
