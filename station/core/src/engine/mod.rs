//! Host Protocol Engine Boundary
//!
//! The station never speaks HASP itself. A protocol engine handles signon,
//! framing, flow control and record typing, and talks to the station through
//! two narrow channels:
//!
//! ```text
//!   engine ── EngineEvent (mpsc) ──────────────▶ Station
//!   engine ◀── HostEngine::request_to_send ───── Station
//!   engine ◀── HostEngine::send(AsyncRead) ───── Station
//! ```
//!
//! Two engines ship with the crate:
//! - [`ChannelEngine`]: in-process, for embedding and tests
//! - [`RemoteEngine`]: framed TCP bridge to an out-of-process engine

pub mod channel;
pub mod frame;
pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::streams::StreamId;

pub use channel::{ChannelEngine, ChannelHost, EngineCall};
pub use frame::{encode_command, encode_event, FrameDecoder};
pub use remote::RemoteEngine;

/// Readable byte source handed to the engine for one card reader stream
///
/// The engine pulls from it at its own pace.
pub type InputSource = Box<dyn AsyncRead + Send + Unpin>;

/// Errors raised at the engine boundary
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine side of the connection is gone
    #[error("host engine connection closed")]
    Closed,

    /// I/O failure on the engine connection
    #[error("host engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload could not be serialized or deserialized
    #[error("frame codec error: {0}")]
    Codec(String),

    /// Frame checksum did not match its payload
    #[error("frame checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        /// Checksum carried in the frame header
        expected: u32,
        /// Checksum computed over the payload
        actual: u32,
    },

    /// Frame length exceeds the configured maximum
    #[error("frame of {size} bytes exceeds maximum {max}")]
    FrameTooLarge {
        /// Declared or encoded payload size
        size: usize,
        /// Maximum allowed payload size
        max: usize,
    },
}

/// Commands sent from the station to an out-of-process engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineCommand {
    /// A deck is queued on this card reader stream
    RequestToSend {
        /// Card reader stream number
        stream_id: StreamId,
    },
    /// One card image of the deck
    CardImage {
        /// Card reader stream number
        stream_id: StreamId,
        /// Card text without the trailing newline
        data: String,
    },
    /// No more cards on this stream
    EndOfDeck {
        /// Card reader stream number
        stream_id: StreamId,
    },
}

/// Station-to-engine operations
///
/// Implement this trait to plug a protocol engine into the station.
#[async_trait]
pub trait HostEngine: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &str;

    /// Announce that `stream_id` has a deck ready to send
    async fn request_to_send(&self, stream_id: StreamId) -> Result<(), EngineError>;

    /// Hand over the readable deck for `stream_id`
    ///
    /// Ownership of `source` moves to the engine, which is responsible for
    /// pacing the transfer.
    async fn send(&self, stream_id: StreamId, source: InputSource) -> Result<(), EngineError>;
}
