//! Outbound Submission Controller
//!
//! Accepts decks for card reader streams. A submission is accepted only when
//! the reader is not mid-transfer and the deck is readable; acceptance marks
//! the reader busy and asks the engine for permission to send. The deck is
//! not opened here; the router opens it when the host asks for data.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::engine::{EngineError, HostEngine};
use crate::messages::{Notifier, OperatorNotice};
use crate::streams::{InputStream, StreamId, StreamKey, StreamRecord, StreamTable};

/// Reasons a submission is refused
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The card reader already has a deck in flight
    #[error("{key} is busy")]
    Busy {
        /// Card reader stream
        key: StreamKey,
    },

    /// The deck cannot be opened for reading
    #[error("failed to open {}: {source}", path.display())]
    PathUnreadable {
        /// Deck path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The deck was accepted but the engine could not be notified
    #[error("request to send failed: {0}")]
    Engine(#[from] EngineError),
}

/// Validates and queues card decks
pub struct SubmissionController {
    engine: Arc<dyn HostEngine>,
    notifier: Notifier,
}

impl SubmissionController {
    /// Create a controller that announces decks to `engine`
    pub fn new(engine: Arc<dyn HostEngine>, notifier: Notifier) -> Self {
        Self { engine, notifier }
    }

    /// Submit `path` on card reader `stream_id`
    ///
    /// Every outcome is also reported to the operator.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::Busy`]: the reader is mid-transfer; nothing changes
    /// - [`SubmitError::PathUnreadable`]: the deck cannot be read; nothing changes
    /// - [`SubmitError::Engine`]: the record was created but the engine is gone
    pub async fn submit(
        &self,
        table: &mut StreamTable,
        stream_id: StreamId,
        path: impl Into<PathBuf>,
    ) -> Result<(), SubmitError> {
        let key = StreamKey::reader(stream_id);
        let path = path.into();

        if table.input(&key).is_some_and(InputStream::is_busy) {
            self.notifier
                .notify(OperatorNotice::StreamBusy { key })
                .await;
            return Err(SubmitError::Busy { key });
        }

        if let Err(source) = check_readable(&path).await {
            self.notifier
                .notify(OperatorNotice::OpenFailed {
                    path: path.clone(),
                    reason: source.to_string(),
                })
                .await;
            return Err(SubmitError::PathUnreadable { path, source });
        }

        table.create(key, StreamRecord::Input(InputStream::submitted(path.clone())));
        self.notifier
            .notify(OperatorNotice::Loading { key, path })
            .await;

        if let Err(e) = self.engine.request_to_send(stream_id).await {
            self.notifier
                .notify(OperatorNotice::EngineFailure {
                    reason: e.to_string(),
                })
                .await;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Check the deck opens for reading; directories are not decks
async fn check_readable(path: &Path) -> io::Result<()> {
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.is_dir() {
        return Err(io::Error::other("is a directory"));
    }
    tokio::fs::File::open(path).await.map(drop)
}
