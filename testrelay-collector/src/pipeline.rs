// Copyright (c) The testrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The controller-side orchestrator.
//!
//! Decides whether a build has results to collect, locates its reports,
//! dispatches the collection task to the worker that executed the build, and
//! wraps the returned store handle in a lazy record stream for the caller.

use crate::{
    build_meta::BuildContext,
    dispatch::{CollectionRequest, WorkerExecutor},
    enrich,
    errors::{ClassifyError, CollectError},
    locate,
    store::LazyRecordStream,
};
use testrelay_metadata::ClassificationFields;
use tracing::{debug, error};

/// Resolves the result-classification side-channel for a build.
///
/// This runs outside the parsing pipeline and may itself block on worker
/// round-trips; it has no bearing on record content. The downstream uploader
/// applies the detected fields uniformly.
pub trait ResultClassifier {
    /// Detects the classification fields for `build`, or `None` if nothing
    /// was detected.
    fn detect(&self, build: &BuildContext) -> Result<Option<ClassificationFields>, ClassifyError>;
}

/// A classifier that never detects anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoClassifier;

impl ResultClassifier for NoClassifier {
    fn detect(
        &self,
        _build: &BuildContext,
    ) -> Result<Option<ClassificationFields>, ClassifyError> {
        Ok(None)
    }
}

/// The pair handed to the downstream uploader.
#[derive(Debug)]
pub struct TestResultContainer {
    /// The lazily-consumed record stream.
    pub records: LazyRecordStream,

    /// The classification fields detected for the build, if any.
    pub classification: Option<ClassificationFields>,
}

/// Collects one build's test results end to end.
#[derive(Debug)]
pub struct ResultPipeline<E, C> {
    executor: E,
    classifier: C,
}

impl<E: WorkerExecutor, C: ResultClassifier> ResultPipeline<E, C> {
    /// Creates a pipeline over the given worker executor and classifier.
    pub fn new(executor: E, classifier: C) -> Self {
        Self {
            executor,
            classifier,
        }
    }

    /// Returns true if this pipeline should process `build`.
    ///
    /// A BDD-style results action takes priority and disables this pipeline,
    /// preventing the same build from being processed under two incompatible
    /// report schemas.
    pub fn supports(&self, build: &BuildContext) -> bool {
        if build.actions.bdd_results {
            debug!("BDD results action found, not processing generic test results");
            false
        } else if build.actions.test_results {
            debug!("test-result action found, generic test results expected");
            true
        } else {
            debug!("no test-result action found, no results expected");
            false
        }
    }

    /// Collects the build's records, returning `Ok(None)` when the build has
    /// no results.
    ///
    /// The returned stream is single-pass; a second traversal requires
    /// calling `collect` again.
    pub fn collect(
        &self,
        build: &BuildContext,
        build_url: &str,
    ) -> Result<Option<TestResultContainer>, CollectError> {
        debug!("collecting test results for build {}", build.build_id);

        if build.workspace_root.is_none() {
            error!(
                "workspace resolution failed for build {}, skipping collection",
                build.build_id
            );
            return Ok(None);
        }

        let reports = match locate::find_primary_report(&build.result_root) {
            Some(primary) => vec![primary],
            None if build.is_multi_module() => {
                debug!("multi-module build, looking for per-module reports");
                locate::find_module_reports(&build.submodules)
            }
            None => Vec::new(),
        };

        if reports.is_empty() {
            debug!("no test reports found for build {}", build.build_id);
            return Ok(None);
        }

        let enrichment = enrich::enrich(build.tool_kind, &build.result_root);
        let request = CollectionRequest::new(build, reports, build_url, enrichment);

        let handle =
            self.executor
                .execute(request)
                .map_err(|error| CollectError::Dispatch {
                    build_id: build.build_id.clone(),
                    error,
                })?;

        let classification =
            self.classifier
                .detect(build)
                .map_err(|error| CollectError::Classify {
                    build_id: build.build_id.clone(),
                    error,
                })?;

        let records = LazyRecordStream::open(&handle)?;
        Ok(Some(TestResultContainer {
            records,
            classification,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_meta::ResultActions, dispatch::LocalWorker};
    use camino_tempfile::Utf8TempDir;
    use testrelay_metadata::BuildToolKind;

    fn build(dir: &Utf8TempDir, actions: ResultActions) -> BuildContext {
        BuildContext {
            build_id: "9".to_owned(),
            job_name: "job".to_owned(),
            result_root: dir.path().to_owned(),
            workspace_root: Some(dir.path().join("workspace")),
            started_at: "2024-03-01T12:00:00+00:00".parse().unwrap(),
            shared_checkout_dir: None,
            tool_kind: BuildToolKind::Generic,
            actions,
            submodules: vec![],
            module_roots: vec![],
        }
    }

    fn pipeline() -> ResultPipeline<LocalWorker, NoClassifier> {
        ResultPipeline::new(LocalWorker, NoClassifier)
    }

    #[test]
    fn bdd_results_take_priority_over_generic() {
        let dir = Utf8TempDir::new().unwrap();
        let both = build(
            &dir,
            ResultActions {
                bdd_results: true,
                test_results: true,
            },
        );
        assert!(!pipeline().supports(&both));
    }

    #[test]
    fn generic_test_results_are_supported() {
        let dir = Utf8TempDir::new().unwrap();
        let generic = build(
            &dir,
            ResultActions {
                bdd_results: false,
                test_results: true,
            },
        );
        assert!(pipeline().supports(&generic));
    }

    #[test]
    fn no_result_action_is_unsupported() {
        let dir = Utf8TempDir::new().unwrap();
        assert!(!pipeline().supports(&build(&dir, ResultActions::default())));
    }

    #[test]
    fn unresolved_workspace_yields_no_results() {
        let dir = Utf8TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(locate::REPORT_FILE_NAME),
            r#"<testsuite name="Foo"><testcase classname="Foo" name="bar"/></testsuite>"#,
        )
        .unwrap();

        let mut context = build(
            &dir,
            ResultActions {
                bdd_results: false,
                test_results: true,
            },
        );
        context.workspace_root = None;

        let collected = pipeline().collect(&context, "https://ci/").unwrap();
        assert!(collected.is_none());
    }

    #[test]
    fn missing_reports_yield_no_results() {
        let dir = Utf8TempDir::new().unwrap();
        let context = build(
            &dir,
            ResultActions {
                bdd_results: false,
                test_results: true,
            },
        );
        let collected = pipeline().collect(&context, "https://ci/").unwrap();
        assert!(collected.is_none());
    }
}
