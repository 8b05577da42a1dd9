//! Stream Keys and Registry
//!
//! Every logical channel between the station and the host is identified by a
//! role tag plus a small positive stream number:
//!
//! ```text
//!   CR1   card reader 1  (input, station -> host)
//!   LP2   line printer 2 (output, host -> station)
//!   CP1   card punch 1   (output, host -> station)
//! ```
//!
//! The [`StreamTable`] maps those keys to per-stream state and is the single
//! owner of every spool file handle. The [`SpoolNamer`] decides where output
//! segments are written.

mod namer;
mod table;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use namer::SpoolNamer;
pub use table::{InputState, InputStream, OutputStream, ReaderState, StreamRecord, StreamTable};

// ============================================================================
// Stream Id
// ============================================================================

/// Error returned when a stream number of zero is supplied
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("stream id must be a positive integer, got {0}")]
pub struct InvalidStreamId(pub u8);

/// Host stream number (always non-zero)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StreamId(u8);

impl StreamId {
    /// Create a stream id, rejecting zero
    #[must_use]
    pub fn new(id: u8) -> Option<Self> {
        (id != 0).then_some(Self(id))
    }

    /// Raw stream number
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for StreamId {
    type Error = InvalidStreamId;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidStreamId(value))
    }
}

impl From<StreamId> for u8 {
    fn from(id: StreamId) -> Self {
        id.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Roles and Keys
// ============================================================================

/// Device role of a stream
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Card reader: decks submitted to the host
    CardReader,
    /// Line printer: print output from the host
    LinePrinter,
    /// Card punch: punch output from the host
    CardPunch,
}

impl Role {
    /// Two-letter tag used in keys and spool file names
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::CardReader => "CR",
            Self::LinePrinter => "LP",
            Self::CardPunch => "CP",
        }
    }

    /// Whether data flows from the host to the station on this role
    #[must_use]
    pub fn is_output(self) -> bool {
        !matches!(self, Self::CardReader)
    }
}

/// Logical key of one stream (role + id)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamKey {
    /// Device role
    pub role: Role,
    /// Host stream number
    pub id: StreamId,
}

impl StreamKey {
    /// Create a key from its parts
    #[must_use]
    pub fn new(role: Role, id: StreamId) -> Self {
        Self { role, id }
    }

    /// `CR<id>`
    #[must_use]
    pub fn reader(id: StreamId) -> Self {
        Self::new(Role::CardReader, id)
    }

    /// `LP<id>`
    #[must_use]
    pub fn printer(id: StreamId) -> Self {
        Self::new(Role::LinePrinter, id)
    }

    /// `CP<id>`
    #[must_use]
    pub fn punch(id: StreamId) -> Self {
        Self::new(Role::CardPunch, id)
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.role.tag(), self.id)
    }
}
