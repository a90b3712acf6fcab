// Copyright (c) The testrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Result-classification fields detected alongside the record stream.

use serde::{Deserialize, Serialize};

/// Classification values resolved for a whole build, outside the parsing
/// pipeline.
///
/// The downstream uploader applies these uniformly to every record of the
/// build. They have no bearing on record content.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClassificationFields {
    /// The test framework the build ran with, e.g. `junit`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,

    /// The testing tool type, e.g. `uft`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testing_tool_type: Option<String>,

    /// The test level, e.g. `unit` or `integration`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_level: Option<String>,
}

impl ClassificationFields {
    /// Returns true if no field was detected.
    pub fn is_empty(&self) -> bool {
        self.framework.is_none() && self.testing_tool_type.is_none() && self.test_level.is_none()
    }
}
