//! Persistence for inbound and outbound HL7 messages.
//!
//! A single `hl7_message` table holds every message the connector touches.
//! The unique index on `message_control_id` is the duplicate-detection
//! mechanism: concurrent arrivals of the same message race on the insert,
//! and exactly one wins.

pub mod memory;
pub mod message;
pub mod postgres;
pub mod store;

use thiserror::Error;

pub use memory::InMemoryMessageStore;
pub use message::{
    Hl7Message, MessagePatch, MessageResponse, DEST_MIRTH, SOURCE_DHOS, SOURCE_TIE,
};
pub use postgres::PgMessageStore;
pub use store::MessageStore;

#[derive(Error, Debug)]
pub enum StoreError {
    /// The record's message control id collides with an existing row
    #[error("Duplicate message control id")]
    DuplicateControlId,

    #[error("No hl7_message with uuid {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
