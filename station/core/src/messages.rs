//! Operator Notices
//!
//! Everything the station wants the operator to see goes through
//! [`OperatorNotice`]. The console renders notices with `Display`; the text
//! matches the classic station console so operators' habits carry over.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::streams::StreamKey;

/// Severity of a notice
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyLevel {
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
    /// Success
    Success,
}

/// Operator-facing messages from the station
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorNotice {
    /// Station process is starting
    Starting,

    /// Host session is up
    Connected {
        /// Host name or address
        host: String,
        /// Host port
        port: u16,
    },

    /// Text relayed from the host operator console
    HostMessage {
        /// Message text
        text: String,
    },

    /// A new output segment was opened
    SegmentCreated {
        /// Output stream
        key: StreamKey,
        /// Spool file path
        path: PathBuf,
    },

    /// An output segment could not be opened; the triggering record is lost
    SegmentCreateFailed {
        /// Output stream
        key: StreamKey,
        /// Spool file path that was attempted
        path: PathBuf,
        /// Underlying reason
        reason: String,
    },

    /// A record could not be appended to an open segment
    SegmentWriteFailed {
        /// Output stream
        key: StreamKey,
        /// Spool file path
        path: PathBuf,
        /// Underlying reason
        reason: String,
    },

    /// An output segment was closed
    SegmentClosed {
        /// Output stream
        key: StreamKey,
        /// Spool file path
        path: PathBuf,
        /// Records in the segment
        records: u64,
    },

    /// Submission rejected: the card reader is mid-transfer
    StreamBusy {
        /// Card reader stream
        key: StreamKey,
    },

    /// A deck could not be opened for reading
    OpenFailed {
        /// Deck path
        path: PathBuf,
        /// Underlying reason
        reason: String,
    },

    /// Deck accepted and queued for the host
    Loading {
        /// Card reader stream
        key: StreamKey,
        /// Deck path
        path: PathBuf,
    },

    /// Host started pulling the deck
    Reading {
        /// Card reader stream
        key: StreamKey,
        /// Deck path
        path: PathBuf,
    },

    /// Host finished reading the deck
    Done {
        /// Card reader stream
        key: StreamKey,
        /// Deck path
        path: PathBuf,
    },

    /// A deck reached the host only in part
    TransferFailed {
        /// Card reader stream
        key: StreamKey,
        /// Underlying reason
        reason: String,
    },

    /// The protocol engine reported a failure
    EngineFailure {
        /// Underlying reason
        reason: String,
    },

    /// `load_cards` without an argument
    MissingFileName,

    /// Unknown console command
    UnrecognizedCommand,

    /// Console is shutting down
    Exiting,
}

impl OperatorNotice {
    /// Severity of this notice
    #[must_use]
    pub fn level(&self) -> NotifyLevel {
        match self {
            Self::SegmentCreateFailed { .. }
            | Self::SegmentWriteFailed { .. }
            | Self::OpenFailed { .. }
            | Self::TransferFailed { .. }
            | Self::EngineFailure { .. } => NotifyLevel::Error,
            Self::StreamBusy { .. } | Self::MissingFileName | Self::UnrecognizedCommand => {
                NotifyLevel::Warning
            }
            Self::Connected { .. } | Self::SegmentClosed { .. } | Self::Done { .. } => {
                NotifyLevel::Success
            }
            Self::Starting
            | Self::HostMessage { .. }
            | Self::SegmentCreated { .. }
            | Self::Loading { .. }
            | Self::Reading { .. }
            | Self::Exiting => NotifyLevel::Info,
        }
    }
}

impl fmt::Display for OperatorNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "RJE CLI starting ..."),
            Self::Connected { host, port } => write!(f, "Connected to HASP host at {host}:{port}"),
            Self::HostMessage { text } => write!(f, "{text}"),
            Self::SegmentCreated { path, .. } => write!(f, "Created {}", path.display()),
            Self::SegmentCreateFailed { path, reason, .. } => {
                write!(f, "Failed to create {}: {reason}", path.display())
            }
            Self::SegmentWriteFailed { path, reason, .. } => {
                write!(f, "Failed to write {}: {reason}", path.display())
            }
            Self::SegmentClosed { path, .. } => write!(f, "Closed {}", path.display()),
            Self::StreamBusy { key } => write!(f, "{key} is busy"),
            Self::OpenFailed { path, reason } => {
                write!(f, "Failed to open {}: {reason}", path.display())
            }
            Self::Loading { key, path } => write!(f, "Loading {} on {key} ...", path.display()),
            Self::Reading { key, path } => write!(f, "Reading {} on {key} ...", path.display()),
            Self::Done { key, path } => write!(f, "Done    {} on {key} ...", path.display()),
            Self::TransferFailed { key, reason } => {
                write!(f, "Deck transfer on {key} failed: {reason}")
            }
            Self::EngineFailure { reason } => write!(f, "Host engine failure: {reason}"),
            Self::MissingFileName => write!(f, "Please provide a file name"),
            Self::UnrecognizedCommand => write!(f, "Unrecognized command"),
            Self::Exiting => write!(f, "RJE CLI exiting"),
        }
    }
}

/// Sink for operator notices
///
/// Every notice is logged at a level matching its severity and forwarded to
/// the console. A console that has gone away is not an error.
#[derive(Clone, Debug)]
pub struct Notifier {
    tx: mpsc::Sender<OperatorNotice>,
}

impl Notifier {
    /// Wrap the console's notice channel
    #[must_use]
    pub fn new(tx: mpsc::Sender<OperatorNotice>) -> Self {
        Self { tx }
    }

    /// Log and forward a notice
    pub async fn notify(&self, notice: OperatorNotice) {
        match notice.level() {
            NotifyLevel::Error => error!(notice = %notice, "Operator notice"),
            NotifyLevel::Warning => warn!(notice = %notice, "Operator notice"),
            NotifyLevel::Info | NotifyLevel::Success => info!(notice = %notice, "Operator notice"),
        }

        if self.tx.send(notice).await.is_err() {
            debug!("Operator console closed, notice dropped");
        }
    }
}
