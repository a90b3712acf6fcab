// Copyright (c) The testrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Build-tool-specific enrichment, gathered once per dispatch.
//!
//! Enrichment runs strictly before parsing because its result is threaded
//! into every record emitted for the dispatch. It never fails the pipeline:
//! filesystem problems are logged and degrade to an empty or absent context.

use camino::Utf8Path;
use testrelay_metadata::{BuildToolKind, EnrichmentContext};
use tracing::warn;

/// The report-archive path probed for UFT-style runs, relative to the build's
/// result root.
pub const UFT_REPORT_ARCHIVE: &str = "archive/UFTReport";

/// The log file read for load-test runs, relative to the build's result root.
pub const LOAD_RUNNER_LOG: &str = "log";

/// Computes the enrichment context for `tool_kind`, or `None` if the kind
/// needs no enrichment.
pub fn enrich(tool_kind: BuildToolKind, result_root: &Utf8Path) -> Option<EnrichmentContext> {
    match tool_kind {
        BuildToolKind::Uft => Some(EnrichmentContext::ReportFolders {
            folders: uft_report_folders(result_root),
        }),
        BuildToolKind::LoadRunner => load_runner_log_lines(result_root)
            .map(|lines| EnrichmentContext::LogLines { lines }),
        _ => None,
    }
}

/// Lists the immediate sub-directory names under the UFT report archive.
///
/// An absent archive path yields an empty list, as does any read error.
fn uft_report_folders(result_root: &Utf8Path) -> Vec<String> {
    let archive = result_root.join(UFT_REPORT_ARCHIVE);
    let entries = match archive.read_dir_utf8() {
        Ok(entries) => entries,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to list UFT report archive at {archive}: {error}");
            }
            return Vec::new();
        }
    };

    let mut folders = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => folders.push(entry.file_name().to_owned()),
            Err(error) => {
                warn!("failed to read UFT report archive entry under {archive}: {error}");
            }
        }
    }
    folders
}

/// Reads the load-test runner's log file in full.
///
/// Any failure is logged and degrades to `None` rather than failing the
/// dispatch.
fn load_runner_log_lines(result_root: &Utf8Path) -> Option<Vec<String>> {
    let log_path = result_root.join(LOAD_RUNNER_LOG);
    match std::fs::read_to_string(&log_path) {
        Ok(contents) => Some(contents.lines().map(str::to_owned).collect()),
        Err(error) => {
            warn!("failed to read load-test log at {log_path}: {error}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;

    #[test]
    fn generic_kind_needs_no_enrichment() {
        let dir = Utf8TempDir::new().unwrap();
        assert_eq!(enrich(BuildToolKind::Generic, dir.path()), None);
        assert_eq!(enrich(BuildToolKind::MavenAggregate, dir.path()), None);
    }

    #[test]
    fn uft_lists_report_folders() {
        let dir = Utf8TempDir::new().unwrap();
        let archive = dir.path().join(UFT_REPORT_ARCHIVE);
        std::fs::create_dir_all(archive.join("LoginTest")).unwrap();
        std::fs::create_dir_all(archive.join("CheckoutTest")).unwrap();

        let context = enrich(BuildToolKind::Uft, dir.path());
        let EnrichmentContext::ReportFolders { mut folders } = context.unwrap() else {
            panic!("expected report folders");
        };
        folders.sort();
        assert_eq!(folders, ["CheckoutTest", "LoginTest"]);
    }

    #[test]
    fn uft_absent_archive_degrades_to_empty_list() {
        let dir = Utf8TempDir::new().unwrap();
        assert_eq!(
            enrich(BuildToolKind::Uft, dir.path()),
            Some(EnrichmentContext::ReportFolders { folders: vec![] })
        );
    }

    #[test]
    fn load_runner_reads_log_lines() {
        let dir = Utf8TempDir::new().unwrap();
        std::fs::write(dir.path().join(LOAD_RUNNER_LOG), "first\nsecond\n").unwrap();

        assert_eq!(
            enrich(BuildToolKind::LoadRunner, dir.path()),
            Some(EnrichmentContext::LogLines {
                lines: vec!["first".to_owned(), "second".to_owned()]
            })
        );
    }

    #[test]
    fn load_runner_missing_log_degrades_to_absent() {
        let dir = Utf8TempDir::new().unwrap();
        assert_eq!(enrich(BuildToolKind::LoadRunner, dir.path()), None);
    }
}
