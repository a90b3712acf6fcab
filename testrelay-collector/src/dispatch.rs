// Copyright (c) The testrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The unit of work executed on the worker that owns the reports.
//!
//! A [`CollectionRequest`] is a plain serializable value with no live
//! handles: everything the worker needs is captured on the controller before
//! dispatch. The worker wires enrichment and module detection into the
//! streaming parser and appends every yielded record to a fresh transient
//! store, strictly in report order.

use crate::{
    build_meta::BuildContext,
    detect::ModuleDetectionConfig,
    errors::DispatchError,
    locate::ReportDescriptor,
    parse::{ParseContext, RecordIter},
    store::{RecordSink, StoreHandle},
};
use camino::Utf8PathBuf;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader};
use testrelay_metadata::{BuildToolKind, EnrichmentContext};
use tracing::debug;

/// The request/response boundary to the worker that executed the build.
///
/// The dispatch blocks the requesting thread until the worker finishes
/// writing the transient store, or fails. Implementations carry the request
/// over whatever transport separates controller and worker; [`LocalWorker`]
/// runs it in-process.
pub trait WorkerExecutor {
    /// Executes the collection request on the worker, returning the handle
    /// of the completed store.
    fn execute(&self, request: CollectionRequest) -> Result<StoreHandle, DispatchError>;
}

/// Runs collection requests in the current process.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalWorker;

impl WorkerExecutor for LocalWorker {
    fn execute(&self, request: CollectionRequest) -> Result<StoreHandle, DispatchError> {
        run_collection(request)
    }
}

/// Everything the worker needs to collect one build's reports.
///
/// Serializable; created on the controller, consumed on the worker.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CollectionRequest {
    /// The reports to parse, in discovery order.
    pub reports: Vec<ReportDescriptor>,

    /// The build's result root, under which the transient store is created.
    pub result_root: Utf8PathBuf,

    /// The translated job name stamped on every record.
    pub job_name: String,

    /// The build identifier stamped on every record.
    pub build_id: String,

    /// When the build started.
    pub started_at: DateTime<FixedOffset>,

    /// The externally reachable build URL stamped on every record.
    pub build_url: String,

    /// The workspace root used to relativize source paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<Utf8PathBuf>,

    /// The shared checkout sub-directory, when one is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_checkout_dir: Option<String>,

    /// The resolved build-tool kind.
    pub tool_kind: BuildToolKind,

    /// The inputs the module detection chain is rebuilt from on the worker.
    pub detection: ModuleDetectionConfig,

    /// The enrichment computed on the controller before dispatch, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentContext>,
}

impl CollectionRequest {
    /// Builds a request for `build` over the given reports.
    pub fn new(
        build: &BuildContext,
        reports: Vec<ReportDescriptor>,
        build_url: &str,
        enrichment: Option<EnrichmentContext>,
    ) -> Self {
        Self {
            reports,
            result_root: build.result_root.clone(),
            job_name: build.job_name.clone(),
            build_id: build.build_id.clone(),
            started_at: build.started_at,
            build_url: build_url.to_owned(),
            workspace_root: build.workspace_root.clone(),
            shared_checkout_dir: build.shared_checkout_dir.clone(),
            tool_kind: build.tool_kind,
            detection: ModuleDetectionConfig {
                module_roots: build.module_roots.clone(),
                workspace_root: build.workspace_root.clone(),
                tool_kind: build.tool_kind,
            },
            enrichment,
        }
    }
}

/// The worker-side body of a dispatch.
///
/// Opens the transient store, then parses each report in order, writing every
/// record as it is produced. A parse failure on one report aborts the
/// remaining reports of the dispatch; partial results up to the failing
/// report are not salvaged.
pub fn run_collection(request: CollectionRequest) -> Result<StoreHandle, DispatchError> {
    let mut sink = RecordSink::create(&request.result_root)?;
    let chain = request.detection.build_chain();

    let cx = ParseContext {
        job_name: &request.job_name,
        build_id: &request.build_id,
        build_url: &request.build_url,
        build_started_at: request.started_at,
        tool_kind: request.tool_kind,
        enrichment: request.enrichment.as_ref(),
        chain: &chain,
        workspace_root: request.workspace_root.as_deref(),
        shared_checkout_dir: request.shared_checkout_dir.as_deref(),
    };

    for report in &request.reports {
        debug!(
            "parsing report {} for build {}",
            report.path, request.build_id
        );
        let file = File::open(&report.path).map_err(|error| DispatchError::ReportParse {
            path: report.path.clone(),
            error: crate::errors::ReportParseError::Open {
                path: report.path.clone(),
                error,
            },
        })?;

        let iter = RecordIter::new(
            BufReader::new(file),
            &report.path,
            report.module.as_deref(),
            &cx,
        );
        for record in iter {
            let record = record.map_err(|error| DispatchError::ReportParse {
                path: report.path.clone(),
                error,
            })?;
            sink.write_record(&record)?;
        }
    }

    let handle = sink.finish()?;
    debug!(
        "collected {} records into {} for build {}",
        handle.record_count, handle.path, request.build_id
    );
    Ok(handle)
}
