// Copyright (c) The testrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report discovery on the controller.
//!
//! Probes for the primary report under the build's result root, and falls
//! back to per-submodule probing for multi-module builds. Discovery is
//! read-only; absence is signaled by `None`/an empty vec, never an error.

use crate::build_meta::SubmoduleBuild;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The file name of the primary test report under a build's result root.
pub const REPORT_FILE_NAME: &str = "junitResult.xml";

/// A discovered report, paired with its owning build module when known.
///
/// Created per discovery call and discarded after dispatch; crosses the
/// controller/worker boundary inside the collection request.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReportDescriptor {
    /// The report file path.
    pub path: Utf8PathBuf,

    /// The owning build module, if discovery already knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

/// Returns the primary report under `result_root`, if it exists.
pub fn find_primary_report(result_root: &Utf8Path) -> Option<ReportDescriptor> {
    let path = result_root.join(REPORT_FILE_NAME);
    if path.is_file() {
        debug!("primary report found at {path}");
        Some(ReportDescriptor { path, module: None })
    } else {
        debug!("no primary report under {result_root}");
        None
    }
}

/// Probes each submodule's own result root for a report, in enumeration
/// order.
///
/// Submodules without a test-result action are skipped without touching the
/// filesystem. An empty result means "no results for this build" and is not
/// an error.
pub fn find_module_reports(submodules: &[SubmoduleBuild]) -> Vec<ReportDescriptor> {
    let mut reports = Vec::new();
    for submodule in submodules {
        if !submodule.has_test_results {
            continue;
        }
        let path = submodule.result_root.join(REPORT_FILE_NAME);
        if path.is_file() {
            debug!("found report for module {} at {path}", submodule.name);
            reports.push(ReportDescriptor {
                path,
                module: Some(submodule.name.clone()),
            });
        }
    }
    reports
}
