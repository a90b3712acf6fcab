// Copyright (c) The testrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The transient record store crossing the worker/controller boundary.
//!
//! The store is an append-only JSON Lines file created under the build's own
//! result root, which keeps the path unique per dispatch under concurrent
//! builds. The worker writes records one at a time through [`RecordSink`];
//! the controller reads them back one at a time through [`LazyRecordStream`].
//! The file is left for the host's normal artifact retention; no cleanup
//! happens here.

use crate::errors::{StoreReadError, StoreWriteError};
use camino::{Utf8Path, Utf8PathBuf};
use debug_ignore::DebugIgnore;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufRead, BufReader, LineWriter, Write},
};
use testrelay_metadata::NormalizedTestRecord;

/// The file-name prefix of transient record stores.
pub const STORE_FILE_PREFIX: &str = "testrelay-records-";

/// A reference to a completed transient store, valid within the current
/// build's lifetime.
///
/// Returned by the worker to the controller once every record has been
/// written and flushed.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StoreHandle {
    /// The store file path.
    pub path: Utf8PathBuf,

    /// How many records the store holds.
    pub record_count: usize,
}

/// Writes records to a fresh transient store as they are produced.
///
/// At most one record is materialized at a time on the worker side; each
/// record becomes one JSON line.
#[derive(Debug)]
pub struct RecordSink {
    path: Utf8PathBuf,
    writer: DebugIgnore<LineWriter<File>>,
    record_count: usize,
}

impl RecordSink {
    /// Creates a uniquely-named store file under `result_root`.
    ///
    /// Failure here is fatal to the enclosing dispatch.
    pub fn create(result_root: &Utf8Path) -> Result<Self, StoreWriteError> {
        let temp = camino_tempfile::Builder::new()
            .prefix(STORE_FILE_PREFIX)
            .suffix(".jsonl")
            .tempfile_in(result_root)
            .map_err(|error| StoreWriteError::Create {
                result_root: result_root.to_owned(),
                error,
            })?;
        // The store outlives this process: it is handed to the controller and
        // reclaimed by the host's artifact retention.
        let (file, path) = temp.keep().map_err(|error| StoreWriteError::Create {
            result_root: result_root.to_owned(),
            error: error.error,
        })?;

        Ok(Self {
            path,
            writer: DebugIgnore(LineWriter::new(file)),
            record_count: 0,
        })
    }

    /// Returns the store path.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Appends one record to the store.
    pub fn write_record(&mut self, record: &NormalizedTestRecord) -> Result<(), StoreWriteError> {
        let json =
            serde_json::to_string(record).map_err(|error| StoreWriteError::Serialize {
                path: self.path.clone(),
                error,
            })?;
        self.writer
            .write_all(json.as_bytes())
            .and_then(|()| self.writer.write_all(b"\n"))
            .map_err(|error| StoreWriteError::Write {
                path: self.path.clone(),
                error,
            })?;
        self.record_count += 1;
        Ok(())
    }

    /// Flushes the store and returns its handle.
    pub fn finish(mut self) -> Result<StoreHandle, StoreWriteError> {
        self.writer
            .flush()
            .map_err(|error| StoreWriteError::Write {
                path: self.path.clone(),
                error,
            })?;
        Ok(StoreHandle {
            path: self.path,
            record_count: self.record_count,
        })
    }
}

/// A single-pass, forward-only iterator over a completed store.
///
/// Deserializes one record per advance. Not restartable: a second traversal
/// requires re-running collection. Exhausting (or dropping) the iterator is
/// the only release action required.
#[derive(Debug)]
pub struct LazyRecordStream {
    path: Utf8PathBuf,
    reader: DebugIgnore<BufReader<File>>,
    line_buf: String,
    line_number: usize,
}

impl LazyRecordStream {
    /// Opens the store behind `handle` for reading.
    pub fn open(handle: &StoreHandle) -> Result<Self, StoreReadError> {
        let file = File::open(&handle.path).map_err(|error| StoreReadError::Open {
            path: handle.path.clone(),
            error,
        })?;
        Ok(Self {
            path: handle.path.clone(),
            reader: DebugIgnore(BufReader::new(file)),
            line_buf: String::new(),
            line_number: 0,
        })
    }
}

impl Iterator for LazyRecordStream {
    type Item = Result<NormalizedTestRecord, StoreReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line_buf.clear();
            self.line_number += 1;

            match self.reader.read_line(&mut self.line_buf) {
                Ok(0) => return None,
                Ok(_) => {
                    let trimmed = self.line_buf.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some(serde_json::from_str(trimmed).map_err(|error| {
                        StoreReadError::ParseRecord {
                            path: self.path.clone(),
                            line_number: self.line_number,
                            error,
                        }
                    }));
                }
                Err(error) => {
                    return Some(Err(StoreReadError::ReadLine {
                        path: self.path.clone(),
                        line_number: self.line_number,
                        error,
                    }));
                }
            }
        }
    }
}
