// Copyright (c) The testrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the collection pipeline.
//!
//! The taxonomy follows the pipeline's failure policy: input absence is not
//! an error (signaled by `None`/empty results), enrichment degradation is
//! logged and never escalated, and everything here represents either a
//! malformed input or a failed dispatch.

use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;

/// An error that occurred while parsing one test report.
///
/// Malformed XML fails the whole report; the enclosing dispatch reports it as
/// an input-data failure, not a pipeline defect.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportParseError {
    /// The XML reader produced an error.
    #[error("malformed XML in report `{path}` near byte {position}")]
    Xml {
        /// The report being parsed.
        path: Utf8PathBuf,
        /// The byte position the reader had reached.
        position: usize,
        /// The underlying XML error.
        #[source]
        error: quick_xml::Error,
    },

    /// A test case element was missing a required identity field.
    #[error("test case in report `{path}` is missing required field `{field}`")]
    MissingField {
        /// The report being parsed.
        path: Utf8PathBuf,
        /// The missing attribute or element name.
        field: &'static str,
    },

    /// The report could not be opened for reading.
    #[error("failed to open report `{path}`")]
    Open {
        /// The report path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurred while writing the transient record store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreWriteError {
    /// The store file could not be created under the build's result root.
    #[error("failed to create record store under `{result_root}`")]
    Create {
        /// The build's result root directory.
        result_root: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },

    /// A record failed to serialize.
    #[error("failed to serialize record for store `{path}`")]
    Serialize {
        /// The store path.
        path: Utf8PathBuf,
        /// The underlying serialization error.
        #[source]
        error: serde_json::Error,
    },

    /// A serialized record could not be written to the store.
    #[error("failed to write to record store `{path}`")]
    Write {
        /// The store path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurred while reading records back from a transient store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreReadError {
    /// The store file could not be opened.
    #[error("failed to open record store `{path}`")]
    Open {
        /// The store path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },

    /// A line could not be read from the store.
    #[error("failed to read line {line_number} of record store `{path}`")]
    ReadLine {
        /// The store path.
        path: Utf8PathBuf,
        /// The 1-based line number.
        line_number: usize,
        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },

    /// A stored line did not deserialize into a record.
    #[error("failed to parse record at line {line_number} of store `{path}`")]
    ParseRecord {
        /// The store path.
        path: Utf8PathBuf,
        /// The 1-based line number.
        line_number: usize,
        /// The underlying deserialization error.
        #[source]
        error: serde_json::Error,
    },
}

/// An error that occurred while executing a collection dispatch on a worker.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    /// The transient store could not be written. Fatal to the dispatch.
    #[error("record store failure during dispatch")]
    Store(#[from] StoreWriteError),

    /// One report failed to parse.
    ///
    /// This aborts the remaining reports in the dispatch; partial results up
    /// to the failing report are not salvaged.
    #[error("failed to parse report `{path}`")]
    ReportParse {
        /// The report that failed.
        path: Utf8PathBuf,
        /// The underlying parse error.
        #[source]
        error: ReportParseError,
    },

    /// The worker round-trip failed or was interrupted.
    ///
    /// No store handle surfaces in this case; the controller must not read a
    /// store that was never confirmed complete.
    #[error("worker dispatch failed: {message}")]
    Transport {
        /// A description of the transport failure.
        message: String,
    },
}

/// An error returned by a [`ResultClassifier`](crate::pipeline::ResultClassifier).
#[derive(Debug, Error)]
#[error("failed to detect classification fields: {message}")]
pub struct ClassifyError {
    /// A description of the detection failure.
    pub message: String,
    /// The underlying error, if any.
    #[source]
    pub error: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ClassifyError {
    /// Creates a new `ClassifyError` with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
        }
    }
}

/// An error returned by a collection run for one build.
///
/// Absence of results is not an error: the pipeline returns `Ok(None)` for
/// that. Failures here abort only the affected build's collection, never a
/// collection run across builds.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CollectError {
    /// The worker dispatch failed.
    #[error("collection dispatch failed for build {build_id}")]
    Dispatch {
        /// The build being collected.
        build_id: String,
        /// The underlying dispatch error.
        #[source]
        error: DispatchError,
    },

    /// The returned store handle could not be opened for reading.
    #[error("failed to open collected record stream")]
    StoreOpen(#[from] StoreReadError),

    /// Classification-field detection failed.
    #[error("classification detection failed for build {build_id}")]
    Classify {
        /// The build being collected.
        build_id: String,
        /// The underlying classification error.
        #[source]
        error: ClassifyError,
    },
}
