//! Spool path naming
//!
//! `<spool_dir>/<key>_<YYYYMMDDHHMMSS>`, one name per output segment.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};

use super::StreamKey;

/// Derives spool file paths from a stream key and a wall-clock instant
#[derive(Clone, Debug)]
pub struct SpoolNamer {
    spool_dir: PathBuf,
}

impl SpoolNamer {
    /// Create a namer rooted at `spool_dir`
    pub fn new(spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            spool_dir: spool_dir.into(),
        }
    }

    /// Directory that receives spool files
    #[must_use]
    pub fn spool_dir(&self) -> &Path {
        &self.spool_dir
    }

    /// Path for `key` at the instant `at`
    ///
    /// Pure: the same key and instant always give the same path, with second
    /// resolution.
    pub fn path_at<Tz>(&self, key: &StreamKey, at: &DateTime<Tz>) -> PathBuf
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.spool_dir
            .join(format!("{key}_{}", at.format("%Y%m%d%H%M%S")))
    }

    /// Path for `key` at the current local time
    #[must_use]
    pub fn path_now(&self, key: &StreamKey) -> PathBuf {
        self.path_at(key, &Local::now())
    }

    /// Disambiguated variant of `path`: `<path>.<n>`
    #[must_use]
    pub fn with_suffix(path: &Path, n: u32) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }
}
