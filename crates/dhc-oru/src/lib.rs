//! ORU^R01 generation from observation sets.
//!
//! Renders an internal observation-set record into an HL7 v2.6 ORU^R01
//! message for the hospital EPR: MSH routing from trustomer configuration,
//! PID identifiers, an optional PV1, the OBR request, and the OBX ladder
//! (overall score block, then one block per vital) with continuous OBX-1
//! numbering.

pub mod generator;
pub mod obx;
pub mod sex;
pub mod types;

use dhc_wrapper::DatetimeError;
use thiserror::Error;

pub use generator::{derive_message_control_id, OruGenerator};
pub use obx::VALID_EWS_SCORE_SYSTEMS;
pub use sex::parse_sct_to_sex;
pub use types::{Clinician, Encounter, Observation, ObservationMetadata, ObservationSet, Patient};

/// Result type alias for ORU generation
pub type Result<T> = std::result::Result<T, OruError>;

#[derive(Error, Debug)]
pub enum OruError {
    #[error("Unexpected score system '{0}'")]
    UnexpectedScoreSystem(String),

    #[error("Missing data in action: {0}")]
    MissingField(&'static str),

    #[error("Could not parse date '{0}'")]
    InvalidDate(String),

    #[error(transparent)]
    Datetime(#[from] DatetimeError),
}
