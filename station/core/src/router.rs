//! Inbound Record Router
//!
//! Applies one engine event at a time to the stream table.
//!
//! ```text
//!   print/punch record, data   ──▶ open segment if absent, append "data\n"
//!   print/punch record, None   ──▶ open segment if absent, close, remove
//!   stream-end(id)             ──▶ CR<id> busy -> idle
//!   read-request(id)           ──▶ open CR<id> deck, hand it to the engine
//!   transfer-failed(id)        ──▶ tell the operator; CR<id> stays busy
//! ```
//!
//! Output keys follow `absent -> open -> absent`; the null-data sentinel is
//! the only way a segment closes. A segment that cannot be created costs the
//! record that triggered it and nothing else; the next record for the key
//! tries again with a fresh name.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tracing::{debug, warn};

use crate::engine::HostEngine;
use crate::events::EngineEvent;
use crate::messages::{Notifier, OperatorNotice};
use crate::streams::{
    OutputStream, ReaderState, SpoolNamer, StreamId, StreamKey, StreamRecord, StreamTable,
};

/// Spool file creation settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpoolPolicy {
    /// Permission bits for new spool files (before umask)
    pub file_mode: u32,
    /// Highest `.<n>` suffix tried when a spool name is already taken
    pub max_name_suffix: u32,
}

impl Default for SpoolPolicy {
    fn default() -> Self {
        Self {
            file_mode: 0o660,
            max_name_suffix: 100,
        }
    }
}

/// Output segment could not be opened
#[derive(Debug, Error)]
#[error("failed to create {}: {source}", path.display())]
pub struct SpoolCreateError {
    /// Last path attempted
    pub path: PathBuf,
    /// Underlying I/O error
    #[source]
    pub source: io::Error,
}

/// The engine referenced a card reader stream the station never submitted
///
/// The station and the engine disagree about which streams exist, which no
/// amount of retrying repairs.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{event} for {key} with no stream record")]
pub struct Desync {
    /// Stream the event addressed
    pub key: StreamKey,
    /// Event kind
    pub event: &'static str,
}

/// Turns engine events into stream table mutations and spool file I/O
pub struct InboundRouter {
    namer: SpoolNamer,
    policy: SpoolPolicy,
    engine: Arc<dyn HostEngine>,
    notifier: Notifier,
}

impl InboundRouter {
    /// Create a router writing segments through `namer`
    pub fn new(
        namer: SpoolNamer,
        policy: SpoolPolicy,
        engine: Arc<dyn HostEngine>,
        notifier: Notifier,
    ) -> Self {
        Self {
            namer,
            policy,
            engine,
            notifier,
        }
    }

    /// Spool namer in use
    #[must_use]
    pub fn namer(&self) -> &SpoolNamer {
        &self.namer
    }

    /// Apply one event
    ///
    /// Recoverable failures become operator notices.
    ///
    /// # Errors
    ///
    /// Returns [`Desync`] when a stream-end or read-request names a card
    /// reader with no record.
    pub async fn route(&self, table: &mut StreamTable, event: EngineEvent) -> Result<(), Desync> {
        match event {
            EngineEvent::OperatorMessage { text } => {
                self.notifier.notify(OperatorNotice::HostMessage { text }).await;
            }
            EngineEvent::PrintRecord { stream_id, data } => {
                self.output_record(table, StreamKey::printer(stream_id), data)
                    .await;
            }
            EngineEvent::PunchRecord { stream_id, data } => {
                self.output_record(table, StreamKey::punch(stream_id), data)
                    .await;
            }
            EngineEvent::StreamEnd { stream_id } => self.stream_end(table, stream_id).await?,
            EngineEvent::ReadRequest { stream_id } => {
                self.read_request(table, stream_id).await?;
            }
            EngineEvent::TransferFailed { stream_id, reason } => {
                // Busy is left alone: stream-end still clears it
                let key = StreamKey::reader(stream_id);
                self.notifier
                    .notify(OperatorNotice::TransferFailed { key, reason })
                    .await;
            }
            other @ (EngineEvent::Signon | EngineEvent::Disconnected { .. }) => {
                debug!(event = other.kind(), "Session event ignored by router");
            }
        }
        Ok(())
    }

    async fn output_record(&self, table: &mut StreamTable, key: StreamKey, data: Option<String>) {
        if !table.contains(&key) {
            match self.open_segment(&key).await {
                Ok(output) => {
                    let path = output.path().to_path_buf();
                    table.create(key, StreamRecord::Output(output));
                    self.notifier
                        .notify(OperatorNotice::SegmentCreated { key, path })
                        .await;
                }
                Err(e) => {
                    self.notifier
                        .notify(OperatorNotice::SegmentCreateFailed {
                            key,
                            path: e.path,
                            reason: e.source.to_string(),
                        })
                        .await;
                    return;
                }
            }
        }

        match data {
            Some(data) => {
                let Some(output) = table.get_mut(&key).and_then(StreamRecord::as_output_mut)
                else {
                    return;
                };
                if let Err(e) = output.write_record(&data).await {
                    let path = output.path().to_path_buf();
                    self.notifier
                        .notify(OperatorNotice::SegmentWriteFailed {
                            key,
                            path,
                            reason: e.to_string(),
                        })
                        .await;
                }
            }
            None => {
                if let Some(StreamRecord::Output(output)) = table.remove(&key) {
                    self.close_segment(key, output).await;
                }
            }
        }
    }

    /// Flush and close a segment that has already left the table
    pub(crate) async fn close_segment(&self, key: StreamKey, output: OutputStream) {
        let path = output.path().to_path_buf();
        let records = output.records_written();

        if let Err(e) = output.close().await {
            self.notifier
                .notify(OperatorNotice::SegmentWriteFailed {
                    key,
                    path: path.clone(),
                    reason: e.to_string(),
                })
                .await;
        }

        debug!(key = %key, records, "Segment closed");
        self.notifier
            .notify(OperatorNotice::SegmentClosed { key, path, records })
            .await;
    }

    async fn open_segment(&self, key: &StreamKey) -> Result<OutputStream, SpoolCreateError> {
        let base = self.namer.path_now(key);
        let mut path = base.clone();
        let mut suffix = 0;

        loop {
            match self.create_file(&path).await {
                Ok(file) => return Ok(OutputStream::new(path, file)),
                Err(e)
                    if e.kind() == io::ErrorKind::AlreadyExists
                        && suffix < self.policy.max_name_suffix =>
                {
                    suffix += 1;
                    debug!(key = %key, path = ?path, suffix, "Spool name taken");
                    path = SpoolNamer::with_suffix(&base, suffix);
                }
                Err(source) => return Err(SpoolCreateError { path, source }),
            }
        }
    }

    async fn create_file(&self, path: &Path) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(self.policy.file_mode);
        options.open(path).await
    }

    async fn stream_end(&self, table: &mut StreamTable, stream_id: StreamId) -> Result<(), Desync> {
        let key = StreamKey::reader(stream_id);
        let input = table
            .get_mut(&key)
            .and_then(StreamRecord::as_input_mut)
            .ok_or(Desync {
                key,
                event: "stream-end",
            })?;

        input.finish();
        let path = input.path().to_path_buf();
        self.notifier.notify(OperatorNotice::Done { key, path }).await;
        Ok(())
    }

    async fn read_request(&self, table: &mut StreamTable, stream_id: StreamId) -> Result<(), Desync> {
        let key = StreamKey::reader(stream_id);
        let input = table
            .get_mut(&key)
            .and_then(StreamRecord::as_input_mut)
            .ok_or(Desync {
                key,
                event: "read-request",
            })?;

        if input.reader() == ReaderState::WithEngine {
            warn!(key = %key, "Read requested again for a deck already with the engine");
            return Ok(());
        }

        let path = input.path().to_path_buf();
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                self.notifier
                    .notify(OperatorNotice::OpenFailed {
                        path,
                        reason: e.to_string(),
                    })
                    .await;
                return Ok(());
            }
        };

        input.mark_reader_with_engine();
        self.notifier
            .notify(OperatorNotice::Reading { key, path })
            .await;

        if let Err(e) = self.engine.send(stream_id, Box::new(file)).await {
            self.notifier
                .notify(OperatorNotice::EngineFailure {
                    reason: e.to_string(),
                })
                .await;
        }
        Ok(())
    }
}
