//! Addressable wrapper over parsed HL7 messages.
//!
//! This crate is the connector's working surface for HL7 content:
//!
//! - [`Hl7Wrapper`]: field access by dotted path (`PID.F3.R1.C5`), patient
//!   identifier scans, message metadata, ACK generation
//! - [`FieldPath`]: the path grammar parser
//! - [`AckBuilder`]: AA/AE/AR acknowledgement construction
//! - [`datetime`]: HL7 <-> ISO8601 conversion and the trustomer-configured
//!   outgoing timestamp format (including the `%L` millisecond directive)

pub mod ack;
pub mod datetime;
pub mod path;
pub mod wrapper;

pub use ack::{AckBuilder, AckCode};
pub use datetime::DatetimeError;
pub use path::FieldPath;
pub use wrapper::{Hl7Wrapper, PatientIdentifiers};
