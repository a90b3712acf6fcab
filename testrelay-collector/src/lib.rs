// Copyright (c) The testrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Test-result collection and streaming normalization pipeline.
//!
//! Reports produced on a build worker are discovered on the controller,
//! parsed on the worker that owns them, streamed into a transient on-disk
//! store, and read back lazily on the controller. The entry point is
//! [`pipeline::ResultPipeline`].

pub mod build_meta;
pub mod detect;
pub mod dispatch;
pub mod enrich;
pub mod errors;
mod helpers;
pub mod locate;
pub mod parse;
pub mod pipeline;
pub mod store;
