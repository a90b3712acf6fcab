// Copyright (c) The testrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The build/worker context handed into the pipeline.
//!
//! All host-side facts the pipeline needs are resolved up front and passed in
//! explicitly; the pipeline never queries a process-wide singleton. The
//! translated job name and the shared checkout sub-directory arrive here
//! pre-resolved by their respective collaborators.

use camino::Utf8PathBuf;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use testrelay_metadata::BuildToolKind;

/// Everything the pipeline needs to know about one build.
#[derive(Clone, Debug)]
pub struct BuildContext {
    /// The build identifier, unique within the job.
    pub build_id: String,

    /// The translated (display) job name.
    pub job_name: String,

    /// The build's result root directory on the controller.
    pub result_root: Utf8PathBuf,

    /// The workspace root on the worker, if resolution succeeded.
    ///
    /// `None` means workspace resolution failed; collection logs an error and
    /// returns no results in that case.
    pub workspace_root: Option<Utf8PathBuf>,

    /// When the build started.
    pub started_at: DateTime<FixedOffset>,

    /// The shared checkout sub-directory, when checkout was relocated for
    /// isolation.
    pub shared_checkout_dir: Option<String>,

    /// The kind of build tool that produced the build.
    pub tool_kind: BuildToolKind,

    /// Which result actions are present on the build.
    pub actions: ResultActions,

    /// The submodule builds belonging to this build, in enumeration order.
    ///
    /// Used for the multi-module report fallback. Empty for single-module
    /// builds.
    pub submodules: Vec<SubmoduleBuild>,

    /// The module roots known to this build, used for module detection.
    pub module_roots: Vec<ModuleRoot>,
}

impl BuildContext {
    /// Returns true if this build is of a recognized multi-module kind, which
    /// enables the per-submodule report fallback.
    pub fn is_multi_module(&self) -> bool {
        matches!(self.tool_kind, BuildToolKind::MavenAggregate)
    }
}

/// The result actions recorded on a build.
///
/// Mirrors the closed set of host result-action variants the pipeline cares
/// about; resolved by the host adapter, never via runtime introspection.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResultActions {
    /// A BDD-style results action is present. Takes priority over generic
    /// test results and disables this pipeline for the build.
    pub bdd_results: bool,

    /// A generic test-result action is present.
    pub test_results: bool,
}

/// One submodule build belonging to a multi-module build.
#[derive(Clone, Debug)]
pub struct SubmoduleBuild {
    /// The submodule's name.
    pub name: String,

    /// The submodule build's own result root directory.
    pub result_root: Utf8PathBuf,

    /// Whether the submodule build recorded a test-result action.
    ///
    /// Submodules without one are skipped during the fallback without
    /// probing the filesystem.
    pub has_test_results: bool,
}

/// A known module root directory, used by module detection.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleRoot {
    /// The module's name.
    pub name: String,

    /// The module's root directory on the worker.
    pub root: Utf8PathBuf,
}
