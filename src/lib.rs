//! # dhos-connector - HL7 v2.x clinical-messaging connector
//!
//! A bidirectional connector between a hospital's patient-administration
//! (EPR) feed and the DHOS clinical platform.
//!
//! - **Inbound**: base64-encoded HL7 v2 ADT messages are parsed, validated,
//!   persisted and turned into platform events, with a correctly-formed
//!   ACK/NACK returned to the sender.
//! - **Outbound**: observation sets are rendered into HL7 v2.6 ORU^R01
//!   messages (or HL7 v3 CDA documents forwarded over SOAP), persisted,
//!   transmitted, and the returning ACK is correlated.
//!
//! ## Quick start
//!
//! ```rust
//! use dhos_connector::wrapper::Hl7Wrapper;
//!
//! let hl7 = "MSH|^~\\&|TIE|TRUST|DHOS|SENSYNE|20170731141348||ADT^A01|Q5435681|P|2.3\r\
//!            PID|1||654321^^^^MRN||DOE^JOHN||19821103|1";
//!
//! let message = Hl7Wrapper::parse(hl7).unwrap();
//! assert_eq!(message.field("PID.F5.R1.C2").as_deref(), Some("JOHN"));
//! assert_eq!(message.patient_identifier("MRN").as_deref(), Some("654321"));
//! ```

pub use dhc_actions as actions;
pub use dhc_api as api;
pub use dhc_core as core;
pub use dhc_oru as oru;
pub use dhc_parser as parser;
pub use dhc_store as store;
pub use dhc_transform as transform;
pub use dhc_trustomer as trustomer;
pub use dhc_validator as validator;
pub use dhc_wrapper as wrapper;

// Re-export commonly used types
pub use dhc_core::{
    delimiters::Delimiters,
    encoding::Encoding,
    error::{Error, Result},
    field::{Component, Field, Repetition, SubComponent},
    message::Message,
    segment::Segment,
};
pub use dhc_wrapper::{AckBuilder, AckCode, Hl7Wrapper};
