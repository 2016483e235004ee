//! REST surface and message pipelines for the DHOS connector.
//!
//! Inbound, base64-encoded HL7 v2 ADT messages are decoded, transformed,
//! parsed, validated and turned into platform actions; the record is
//! persisted before the event is published, and the sender always gets a
//! well-formed ACK/NACK for anything parseable. Outbound, observation sets
//! are rendered as ORU^R01 and POSTed to the EPR service adapter (or, for
//! CDA documents, sent to Mirth over SOAP), with the returned ACK
//! correlated back onto the stored record.

pub mod config;
pub mod epr;
pub mod error;
pub mod jwt;
pub mod publisher;
pub mod receive;
pub mod router;
pub mod soap;
pub mod state;
pub mod transmit;

pub use config::Config;
pub use error::{ApiError, Result};
pub use router::router;
pub use state::AppState;
