//! In-Process Engine
//!
//! Channel-based engine for embedding a protocol engine in the same process,
//! and for driving the station from tests.
//!
//! # Usage
//!
//! ```ignore
//! let (engine, events_rx, mut host) = ChannelEngine::new_pair(100);
//!
//! // Give `engine` and `events_rx` to the Station.
//! // The protocol side emits events and observes calls:
//! host.emit(EngineEvent::Signon).await?;
//! while let Some(call) = host.next_call().await { /* ... */ }
//! ```

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{EngineError, HostEngine, InputSource};
use crate::events::EngineEvent;
use crate::streams::StreamId;

/// A station-to-engine call observed by the host half
pub enum EngineCall {
    /// `request_to_send(stream_id)`
    RequestToSend(StreamId),
    /// `send(stream_id, source)`
    Send(StreamId, InputSource),
}

impl fmt::Debug for EngineCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestToSend(id) => f.debug_tuple("RequestToSend").field(id).finish(),
            Self::Send(id, _) => f.debug_tuple("Send").field(id).field(&"<source>").finish(),
        }
    }
}

/// Station half of an in-process engine
pub struct ChannelEngine {
    calls: mpsc::Sender<EngineCall>,
}

/// Protocol half of an in-process engine
pub struct ChannelHost {
    events: mpsc::Sender<EngineEvent>,
    calls: mpsc::Receiver<EngineCall>,
}

impl ChannelEngine {
    /// Create a connected engine pair
    ///
    /// Returns:
    /// - `ChannelEngine`: give this to the station
    /// - `mpsc::Receiver<EngineEvent>`: the station's event source
    /// - `ChannelHost`: the protocol side
    #[must_use]
    pub fn new_pair(capacity: usize) -> (Self, mpsc::Receiver<EngineEvent>, ChannelHost) {
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let (call_tx, call_rx) = mpsc::channel(capacity);

        let engine = Self { calls: call_tx };
        let host = ChannelHost {
            events: event_tx,
            calls: call_rx,
        };

        (engine, event_rx, host)
    }
}

#[async_trait]
impl HostEngine for ChannelEngine {
    fn name(&self) -> &str {
        "in-process"
    }

    async fn request_to_send(&self, stream_id: StreamId) -> Result<(), EngineError> {
        self.calls
            .send(EngineCall::RequestToSend(stream_id))
            .await
            .map_err(|_| EngineError::Closed)
    }

    async fn send(&self, stream_id: StreamId, source: InputSource) -> Result<(), EngineError> {
        self.calls
            .send(EngineCall::Send(stream_id, source))
            .await
            .map_err(|_| EngineError::Closed)
    }
}

impl ChannelHost {
    /// Deliver an event to the station
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] if the station dropped its receiver.
    pub async fn emit(&self, event: EngineEvent) -> Result<(), EngineError> {
        self.events.send(event).await.map_err(|_| EngineError::Closed)
    }

    /// Wait for the next station call
    pub async fn next_call(&mut self) -> Option<EngineCall> {
        self.calls.recv().await
    }

    /// Next station call, if one is already queued
    pub fn try_next_call(&mut self) -> Option<EngineCall> {
        self.calls.try_recv().ok()
    }

    /// Event sender, for protocol tasks that outlive this handle
    #[must_use]
    pub fn event_sender(&self) -> mpsc::Sender<EngineEvent> {
        self.events.clone()
    }
}
