//! Core data structures for HL7 v2.x message handling.
//!
//! The in-memory model mirrors the HL7 hierarchy: a [`Message`] is a list of
//! [`Segment`]s, each segment an ordered list of [`Field`]s, and each field
//! splits into repetitions, components and subcomponents.
//!
//! Values are stored exactly as they appear on the wire; escape sequences are
//! neither decoded on parse nor applied on encode. [`Encoding`] provides the
//! connector's escape/unescape rules for call sites that insert free text
//! into a segment.

pub mod delimiters;
pub mod encoding;
pub mod error;
pub mod field;
pub mod message;
pub mod segment;

pub use delimiters::Delimiters;
pub use encoding::Encoding;
pub use error::{Error, Result};
pub use field::{Component, Field, Repetition, SubComponent};
pub use message::Message;
pub use segment::Segment;
