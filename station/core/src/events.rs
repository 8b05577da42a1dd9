//! Engine Events
//!
//! Events delivered by the host protocol engine to the station. The engine
//! owns the wire protocol (signon, framing, record typing); by the time an
//! event reaches the station it is already classified by record kind.

use serde::{Deserialize, Serialize};

use crate::streams::{StreamId, StreamKey};

/// Events from the protocol engine to the station
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Host session established; the operator console may start
    Signon,

    /// Console message from the host operator
    OperatorMessage {
        /// Message text
        text: String,
    },

    /// Line printer record; `None` ends the current segment
    PrintRecord {
        /// Printer stream number
        stream_id: StreamId,
        /// Print line, or `None` for end of segment
        data: Option<String>,
    },

    /// Card punch record; `None` ends the current segment
    PunchRecord {
        /// Punch stream number
        stream_id: StreamId,
        /// Card image, or `None` for end of segment
        data: Option<String>,
    },

    /// Host finished consuming a submitted deck
    StreamEnd {
        /// Card reader stream number
        stream_id: StreamId,
    },

    /// Host is ready to pull the deck queued on a card reader stream
    ReadRequest {
        /// Card reader stream number
        stream_id: StreamId,
    },

    /// A submitted deck could not be delivered in full
    ///
    /// The engine still closes the deck, so a stream-end is expected to
    /// follow.
    TransferFailed {
        /// Card reader stream number
        stream_id: StreamId,
        /// What went wrong
        reason: String,
    },

    /// Engine lost its host connection or shut down
    Disconnected {
        /// Reason, if known
        reason: Option<String>,
    },
}

impl EngineEvent {
    /// Short event name for logs and diagnostics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Signon => "signon",
            Self::OperatorMessage { .. } => "operator-message",
            Self::PrintRecord { .. } => "print-record",
            Self::PunchRecord { .. } => "punch-record",
            Self::StreamEnd { .. } => "stream-end",
            Self::ReadRequest { .. } => "read-request",
            Self::TransferFailed { .. } => "transfer-failed",
            Self::Disconnected { .. } => "disconnected",
        }
    }

    /// Stream key this event addresses, if any
    #[must_use]
    pub fn stream_key(&self) -> Option<StreamKey> {
        match self {
            Self::PrintRecord { stream_id, .. } => Some(StreamKey::printer(*stream_id)),
            Self::PunchRecord { stream_id, .. } => Some(StreamKey::punch(*stream_id)),
            Self::StreamEnd { stream_id }
            | Self::ReadRequest { stream_id }
            | Self::TransferFailed { stream_id, .. } => Some(StreamKey::reader(*stream_id)),
            Self::Signon | Self::OperatorMessage { .. } | Self::Disconnected { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(n: u8) -> StreamId {
        StreamId::new(n).unwrap()
    }

    #[test]
    fn test_stream_key_by_kind() {
        let print = EngineEvent::PrintRecord {
            stream_id: id(2),
            data: None,
        };
        let punch = EngineEvent::PunchRecord {
            stream_id: id(2),
            data: Some("X".to_string()),
        };

        assert_eq!(print.stream_key().unwrap().to_string(), "LP2");
        assert_eq!(punch.stream_key().unwrap().to_string(), "CP2");
        assert_eq!(
            EngineEvent::ReadRequest { stream_id: id(1) }
                .stream_key()
                .unwrap()
                .to_string(),
            "CR1"
        );
        assert_eq!(
            EngineEvent::TransferFailed {
                stream_id: id(3),
                reason: "broken pipe".to_string()
            }
            .stream_key()
            .unwrap()
            .to_string(),
            "CR3"
        );
        assert!(EngineEvent::Signon.stream_key().is_none());
    }

    #[test]
    fn test_wire_shape() {
        let event = EngineEvent::PrintRecord {
            stream_id: id(1),
            data: Some("HELLO".to_string()),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"type": "print_record", "stream_id": 1, "data": "HELLO"})
        );
    }

    #[test]
    fn test_null_data_is_end_of_segment() {
        let event: EngineEvent =
            serde_json::from_str(r#"{"type":"punch_record","stream_id":3,"data":null}"#).unwrap();

        assert_eq!(
            event,
            EngineEvent::PunchRecord {
                stream_id: id(3),
                data: None
            }
        );
    }

    #[test]
    fn test_zero_stream_id_rejected() {
        let result = serde_json::from_str::<EngineEvent>(r#"{"type":"stream_end","stream_id":0}"#);
        assert!(result.is_err());
    }
}
