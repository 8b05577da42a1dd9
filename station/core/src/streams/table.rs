//! Stream Table Implementation
//!
//! Owns the state of every active stream. The table is not shared: the
//! station loop holds it and lends it by `&mut` to the router and the
//! submission controller, one event at a time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use super::StreamKey;

// ============================================================================
// Input Streams
// ============================================================================

/// Submission state of a card reader stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputState {
    /// No deck in flight; a new submission is accepted
    Idle,
    /// A deck was accepted and the host has not reported completion
    Busy,
}

/// Whereabouts of the read handle for a submitted deck
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReaderState {
    /// The host has not asked for data yet
    NotOpened,
    /// The handle was opened and handed to the engine
    WithEngine,
}

/// Card reader stream record
#[derive(Debug)]
pub struct InputStream {
    path: PathBuf,
    state: InputState,
    reader: ReaderState,
}

impl InputStream {
    /// Record for a freshly accepted submission (busy, no handle yet)
    #[must_use]
    pub fn submitted(path: PathBuf) -> Self {
        Self {
            path,
            state: InputState::Busy,
            reader: ReaderState::NotOpened,
        }
    }

    /// Deck path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current submission state
    #[must_use]
    pub fn state(&self) -> InputState {
        self.state
    }

    /// Whether a submission is in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state == InputState::Busy
    }

    /// Read handle state
    #[must_use]
    pub fn reader(&self) -> ReaderState {
        self.reader
    }

    pub(crate) fn mark_reader_with_engine(&mut self) {
        self.reader = ReaderState::WithEngine;
    }

    /// Host reported the end of the deck
    pub(crate) fn finish(&mut self) {
        self.state = InputState::Idle;
    }
}

// ============================================================================
// Output Streams
// ============================================================================

/// Open spool segment for a printer or punch stream
#[derive(Debug)]
pub struct OutputStream {
    path: PathBuf,
    writer: BufWriter<File>,
    records_written: u64,
}

impl OutputStream {
    pub(crate) fn new(path: PathBuf, file: File) -> Self {
        Self {
            path,
            writer: BufWriter::new(file),
            records_written: 0,
        }
    }

    /// Spool file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended to this segment so far
    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Append one record followed by a newline
    pub(crate) async fn write_record(&mut self, data: &str) -> std::io::Result<()> {
        self.writer.write_all(data.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.records_written += 1;
        Ok(())
    }

    /// Flush and close the segment, returning its path and record count
    pub(crate) async fn close(mut self) -> std::io::Result<(PathBuf, u64)> {
        self.writer.flush().await?;
        self.writer.shutdown().await?;
        Ok((self.path, self.records_written))
    }
}

// ============================================================================
// Records
// ============================================================================

/// State held per stream key
#[derive(Debug)]
pub enum StreamRecord {
    /// Card reader stream
    Input(InputStream),
    /// Open printer/punch segment
    Output(OutputStream),
}

impl StreamRecord {
    /// Path assigned at creation
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Input(input) => input.path(),
            Self::Output(output) => output.path(),
        }
    }

    /// Input view, if this is a card reader record
    #[must_use]
    pub fn as_input(&self) -> Option<&InputStream> {
        match self {
            Self::Input(input) => Some(input),
            Self::Output(_) => None,
        }
    }

    /// Mutable input view
    pub fn as_input_mut(&mut self) -> Option<&mut InputStream> {
        match self {
            Self::Input(input) => Some(input),
            Self::Output(_) => None,
        }
    }

    /// Mutable output view
    pub fn as_output_mut(&mut self) -> Option<&mut OutputStream> {
        match self {
            Self::Output(output) => Some(output),
            Self::Input(_) => None,
        }
    }
}

// ============================================================================
// Table
// ============================================================================

/// Registry of active streams keyed by role + id
#[derive(Debug, Default)]
pub struct StreamTable {
    records: HashMap<StreamKey, StreamRecord>,
    total_created: u64,
}

impl StreamTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether `key` has a record
    #[must_use]
    pub fn contains(&self, key: &StreamKey) -> bool {
        self.records.contains_key(key)
    }

    /// Look up a record
    #[must_use]
    pub fn get(&self, key: &StreamKey) -> Option<&StreamRecord> {
        self.records.get(key)
    }

    /// Look up a record mutably
    pub fn get_mut(&mut self, key: &StreamKey) -> Option<&mut StreamRecord> {
        self.records.get_mut(key)
    }

    /// Input record for a card reader key
    #[must_use]
    pub fn input(&self, key: &StreamKey) -> Option<&InputStream> {
        self.get(key).and_then(StreamRecord::as_input)
    }

    /// Insert a record for `key`
    ///
    /// Callers check for an existing record first. Any record displaced here
    /// is returned; displacing an open output segment drops its handle.
    pub fn create(&mut self, key: StreamKey, record: StreamRecord) -> Option<StreamRecord> {
        self.total_created += 1;
        let displaced = self.records.insert(key, record);
        match &displaced {
            Some(StreamRecord::Output(output)) => {
                warn!(key = %key, path = ?output.path(), "Open spool segment displaced");
            }
            Some(StreamRecord::Input(_)) => {
                debug!(key = %key, "Card reader record replaced");
            }
            None => debug!(key = %key, "Stream record created"),
        }
        displaced
    }

    /// Remove and return the record for `key`
    pub fn remove(&mut self, key: &StreamKey) -> Option<StreamRecord> {
        self.records.remove(key)
    }

    /// Keys of all live records
    #[must_use]
    pub fn keys(&self) -> Vec<StreamKey> {
        self.records.keys().copied().collect()
    }

    /// Records created over the table's lifetime
    #[must_use]
    pub fn total_created(&self) -> u64 {
        self.total_created
    }

    /// Remove every open output segment (used at shutdown)
    pub fn drain_outputs(&mut self) -> Vec<(StreamKey, OutputStream)> {
        let keys: Vec<StreamKey> = self
            .records
            .iter()
            .filter(|(_, record)| matches!(record, StreamRecord::Output(_)))
            .map(|(key, _)| *key)
            .collect();

        keys.into_iter()
            .filter_map(|key| match self.records.remove(&key) {
                Some(StreamRecord::Output(output)) => Some((key, output)),
                _ => None,
            })
            .collect()
    }
}
