// Copyright (c) The testrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Serializable data model for testrelay.
//!
//! These types are exchanged between the controller and workers, and handed
//! to the downstream uploader once collection finishes. They carry no I/O;
//! all reading and writing lives in `testrelay-collector`.

mod classification;
mod records;

pub use classification::ClassificationFields;
pub use records::{BuildToolKind, EnrichmentContext, NormalizedTestRecord, TestStatus};
