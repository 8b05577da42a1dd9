//! Remote Engine
//!
//! TCP client for a protocol engine running in its own process. Inbound
//! frames carry [`EngineEvent`]s, outbound frames carry [`EngineCommand`]s.
//! Decks are streamed one card image per frame; the socket's own
//! backpressure paces the transfer. Card bytes that are not UTF-8 are sent
//! with replacement characters rather than cutting the deck short.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use super::frame::{encode_command, FrameDecoder};
use super::{EngineCommand, EngineError, HostEngine, InputSource};
use crate::events::EngineEvent;
use crate::streams::StreamId;

const READ_CHUNK: usize = 8192;

/// Station half of a TCP-attached protocol engine
pub struct RemoteEngine {
    peer: String,
    writer: Arc<Mutex<OwnedWriteHalf>>,
    // Weak so the event channel still closes when the reader task ends
    events: mpsc::WeakSender<EngineEvent>,
}

impl RemoteEngine {
    /// Connect to the engine at `host:port`
    ///
    /// Returns the engine and the receiver the station reads events from.
    /// A [`EngineEvent::Disconnected`] is delivered when the connection ends.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] if the connection cannot be established.
    pub async fn connect(
        host: &str,
        port: u16,
        capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>), EngineError> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        let peer = format!("{host}:{port}");
        info!(peer = %peer, "Connected to protocol engine");

        let (read_half, write_half) = stream.into_split();
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let weak = event_tx.downgrade();
        tokio::spawn(read_events(read_half, event_tx, peer.clone()));

        let engine = Self {
            peer,
            writer: Arc::new(Mutex::new(write_half)),
            events: weak,
        };
        Ok((engine, event_rx))
    }

    /// Address of the engine
    #[must_use]
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

#[async_trait]
impl HostEngine for RemoteEngine {
    fn name(&self) -> &str {
        "remote"
    }

    async fn request_to_send(&self, stream_id: StreamId) -> Result<(), EngineError> {
        write_command(&self.writer, &EngineCommand::RequestToSend { stream_id }).await
    }

    async fn send(&self, stream_id: StreamId, source: InputSource) -> Result<(), EngineError> {
        let writer = Arc::clone(&self.writer);
        let events = self.events.clone();
        tokio::spawn(async move {
            match pump_deck(&writer, stream_id, source).await {
                Ok(cards) => debug!(stream_id = %stream_id, cards, "Deck sent"),
                Err(e) => {
                    warn!(stream_id = %stream_id, error = %e, "Deck transfer failed");
                    let failed = EngineEvent::TransferFailed {
                        stream_id,
                        reason: e.to_string(),
                    };
                    let delivered = match events.upgrade() {
                        Some(events) => events.send(failed).await.is_ok(),
                        None => false,
                    };
                    if !delivered {
                        debug!(stream_id = %stream_id, "Station gone before transfer failure");
                    }
                }
            }
        });
        Ok(())
    }
}

async fn write_command(
    writer: &Mutex<OwnedWriteHalf>,
    command: &EngineCommand,
) -> Result<(), EngineError> {
    let frame = encode_command(command)?;
    let mut writer = writer.lock().await;
    writer.write_all(&frame).await?;
    Ok(())
}

/// Card text for one raw line: line ending removed, invalid UTF-8 replaced
fn card_image(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

/// Stream a deck as card-image frames followed by end-of-deck
///
/// End-of-deck is written even when reading the deck fails part way, so the
/// engine closes the stream; the read error is still returned.
async fn pump_deck(
    writer: &Mutex<OwnedWriteHalf>,
    stream_id: StreamId,
    source: InputSource,
) -> Result<u64, EngineError> {
    let mut reader = BufReader::new(source);
    let mut line = Vec::new();
    let mut cards = 0u64;

    let read_result = loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break Ok(()),
            Ok(_) => {
                let data = card_image(&line);
                write_command(writer, &EngineCommand::CardImage { stream_id, data }).await?;
                cards += 1;
            }
            Err(e) => break Err(EngineError::from(e)),
        }
    };

    write_command(writer, &EngineCommand::EndOfDeck { stream_id }).await?;
    read_result.map(|()| cards)
}

/// Decode inbound frames until the connection ends
async fn read_events(mut reader: OwnedReadHalf, tx: mpsc::Sender<EngineEvent>, peer: String) {
    let mut decoder = FrameDecoder::new();
    let mut buf = vec![0u8; READ_CHUNK];

    let reason = 'read: loop {
        match reader.read(&mut buf).await {
            Ok(0) => break None,
            Ok(n) => {
                decoder.extend(&buf[..n]);
                loop {
                    match decoder.next_event() {
                        Ok(Some(event)) => {
                            if tx.send(event).await.is_err() {
                                debug!(peer = %peer, "Station stopped listening");
                                return;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            error!(peer = %peer, error = %e, "Dropping engine connection");
                            break 'read Some(e.to_string());
                        }
                    }
                }
            }
            Err(e) => break Some(e.to_string()),
        }
    };

    info!(peer = %peer, reason = ?reason, "Protocol engine disconnected");
    let _ = tx.send(EngineEvent::Disconnected { reason }).await;
}
