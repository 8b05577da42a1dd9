//! Engine Wire Frames
//!
//! The TCP link to an out-of-process protocol engine carries one JSON message
//! per frame:
//!
//! ```text
//! +----------------+----------------+------------------------------------------+
//! | Length (4)     | CRC32 (4)      | JSON payload (Length bytes)              |
//! | big-endian u32 | big-endian u32 | EngineEvent (in) / EngineCommand (out)   |
//! +----------------+----------------+------------------------------------------+
//! ```
//!
//! The station only ever encodes [`EngineCommand`]s and decodes
//! [`EngineEvent`]s; the opposite direction exists for engine-side tooling
//! and tests.

use serde::{de::DeserializeOwned, Serialize};

use super::{EngineCommand, EngineError};
use crate::events::EngineEvent;

/// Largest accepted payload (1 MiB)
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

const HEADER_LEN: usize = 8;

/// Fixed-size prefix of every frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FrameHeader {
    payload_len: usize,
    checksum: u32,
}

impl FrameHeader {
    fn for_payload(payload: &[u8]) -> Result<Self, EngineError> {
        check_size(payload.len())?;
        Ok(Self {
            payload_len: payload.len(),
            checksum: crc32fast::hash(payload),
        })
    }

    /// Parse the header at the front of `bytes`, if all eight bytes are there
    fn peek(bytes: &[u8]) -> Result<Option<Self>, EngineError> {
        let Some(header) = bytes.get(..HEADER_LEN) else {
            return Ok(None);
        };
        let (len, crc) = header.split_at(4);
        let payload_len = u32::from_be_bytes([len[0], len[1], len[2], len[3]]) as usize;
        check_size(payload_len)?;

        Ok(Some(Self {
            payload_len,
            checksum: u32::from_be_bytes([crc[0], crc[1], crc[2], crc[3]]),
        }))
    }

    fn write_to(self, out: &mut Vec<u8>) -> Result<(), EngineError> {
        let len = u32::try_from(self.payload_len).map_err(|e| EngineError::Codec(e.to_string()))?;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&self.checksum.to_be_bytes());
        Ok(())
    }

    fn frame_len(self) -> usize {
        HEADER_LEN + self.payload_len
    }
}

fn check_size(size: usize) -> Result<(), EngineError> {
    if size > MAX_FRAME_SIZE {
        return Err(EngineError::FrameTooLarge {
            size,
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(())
}

fn seal<T: Serialize>(msg: &T) -> Result<Vec<u8>, EngineError> {
    let payload = serde_json::to_vec(msg).map_err(|e| EngineError::Codec(e.to_string()))?;
    let header = FrameHeader::for_payload(&payload)?;

    let mut frame = Vec::with_capacity(header.frame_len());
    header.write_to(&mut frame)?;
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Frame a station-to-engine command
///
/// # Errors
///
/// [`EngineError::FrameTooLarge`] if the JSON exceeds [`MAX_FRAME_SIZE`].
pub fn encode_command(command: &EngineCommand) -> Result<Vec<u8>, EngineError> {
    seal(command)
}

/// Frame an engine-to-station event
///
/// # Errors
///
/// [`EngineError::FrameTooLarge`] if the JSON exceeds [`MAX_FRAME_SIZE`].
pub fn encode_event(event: &EngineEvent) -> Result<Vec<u8>, EngineError> {
    seal(event)
}

/// Reassembles frames from arbitrary TCP read boundaries
///
/// Consumed frames are dropped from the front of the buffer as they are
/// decoded, so the buffer never holds more than one partial frame plus
/// whatever arrived with it.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
}

impl FrameDecoder {
    /// Create an empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes received from the socket
    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Bytes received but not yet decoded
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Next complete event, or `None` while the frame is still arriving
    ///
    /// # Errors
    ///
    /// Oversized frames, checksum mismatches and payloads that are not an
    /// [`EngineEvent`]. The stream cannot be resynchronized after any of them.
    pub fn next_event(&mut self) -> Result<Option<EngineEvent>, EngineError> {
        self.next_message()
    }

    /// Next complete command, or `None` while the frame is still arriving
    ///
    /// # Errors
    ///
    /// As for [`FrameDecoder::next_event`].
    pub fn next_command(&mut self) -> Result<Option<EngineCommand>, EngineError> {
        self.next_message()
    }

    fn next_message<T: DeserializeOwned>(&mut self) -> Result<Option<T>, EngineError> {
        let Some(header) = FrameHeader::peek(&self.pending)? else {
            return Ok(None);
        };
        let Some(payload) = self.pending.get(HEADER_LEN..header.frame_len()) else {
            return Ok(None);
        };

        let actual = crc32fast::hash(payload);
        if actual != header.checksum {
            return Err(EngineError::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }

        let message =
            serde_json::from_slice(payload).map_err(|e| EngineError::Codec(e.to_string()))?;
        self.pending.drain(..header.frame_len());
        Ok(Some(message))
    }
}
