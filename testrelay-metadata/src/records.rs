// Copyright (c) The testrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalized test records and their supporting enums.

use camino::Utf8PathBuf;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// One normalized, tool-agnostic test case outcome.
///
/// Records are created during parsing of a single report element, are
/// immutable afterwards, and are serialized exactly once into the transient
/// store on the worker and deserialized exactly once by the controller.
///
/// Every record carries non-empty suite/case identity and job/build identity.
/// [`module`](Self::module) is `None` only if no detection strategy matched.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct NormalizedTestRecord {
    /// The name of the suite this test case belongs to.
    pub suite_name: String,

    /// The name of the test case.
    pub case_name: String,

    /// The owning build module, if a detection strategy matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    /// The package/namespace path of the test class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,

    /// The unqualified class name of the test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    /// The outcome of the test case.
    pub status: TestStatus,

    /// How long the test case took, serialized as milliseconds.
    #[serde(with = "duration_ms")]
    pub duration: Duration,

    /// A short failure message, if the test did not pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,

    /// Failure detail, typically a stack trace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_detail: Option<String>,

    /// The translated (display) name of the job that produced this record.
    pub job_name: String,

    /// The identifier of the build that produced this record.
    pub build_id: String,

    /// When the build started.
    pub build_started_at: DateTime<FixedOffset>,

    /// The workspace-relative path to the source file of this test, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<Utf8PathBuf>,

    /// An externally reachable URL for the build.
    pub build_url: String,

    /// The kind of build tool that produced the report.
    pub tool_kind: BuildToolKind,

    /// Tool-specific enrichment, attached only for tool kinds that need it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentContext>,
}

/// The outcome of a single test case.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestStatus {
    /// The test ran and passed.
    Passed,
    /// The test ran and failed an assertion.
    Failed,
    /// The test was skipped.
    Skipped,
    /// The test aborted with an unexpected error.
    Error,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
            TestStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// The kind of build tool or runner that produced a report.
///
/// The kind drives module detection and enrichment: per-module and aggregate
/// builds get module attribution, and the UFT/load-test runners get an
/// [`EnrichmentContext`] computed before parsing starts.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum BuildToolKind {
    /// A generic build with no tool-specific handling.
    Generic,
    /// A per-module build of a multi-module Maven project.
    MavenModule,
    /// An aggregate build of a multi-module Maven project.
    MavenAggregate,
    /// A UFT-style functional test runner.
    Uft,
    /// A load-test runner.
    LoadRunner,
}

/// Build-tool-specific side information computed once per dispatch.
///
/// The context is computed strictly before parsing begins and attached
/// unchanged to every record emitted by that dispatch. It is owned by the
/// dispatch that created it and never shared across dispatches.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum EnrichmentContext {
    /// Immediate sub-directory names under the UFT report archive.
    ReportFolders {
        /// The sub-directory names, empty if the archive path was absent.
        folders: Vec<String>,
    },
    /// The lines of the load-test runner's log file.
    LogLines {
        /// The log lines read in full before parsing.
        lines: Vec<String>,
    },
}

/// Serializes a [`Duration`] as a whole number of milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(d.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn sample_record() -> NormalizedTestRecord {
        NormalizedTestRecord {
            suite_name: "com.example.FooTest".to_owned(),
            case_name: "testBar".to_owned(),
            module: Some("core".to_owned()),
            package: Some("com.example".to_owned()),
            class_name: Some("FooTest".to_owned()),
            status: TestStatus::Failed,
            duration: Duration::from_millis(1234),
            failure_message: Some("boom".to_owned()),
            failure_detail: None,
            job_name: "ci/example".to_owned(),
            build_id: "42".to_owned(),
            build_started_at: "2024-03-01T12:00:00+00:00".parse().unwrap(),
            source_file: Some("src/test/java/com/example/FooTest.java".into()),
            build_url: "https://ci.example.com/job/example/42/".to_owned(),
            tool_kind: BuildToolKind::MavenAggregate,
            enrichment: None,
        }
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = sample_record();
        let json = serde_json::to_string(&record).expect("record serializes");
        let back: NormalizedTestRecord = serde_json::from_str(&json).expect("record deserializes");
        assert_eq!(record, back);
    }

    #[test]
    fn duration_serializes_as_millis() {
        let record = sample_record();
        let json = serde_json::to_value(&record).expect("record serializes");
        assert_eq!(json["duration"], serde_json::json!(1234));
    }

    #[test]
    fn absent_enrichment_is_omitted() {
        let record = sample_record();
        let json = serde_json::to_value(&record).expect("record serializes");
        assert!(json.get("enrichment").is_none());
    }

    #[test_case(BuildToolKind::MavenAggregate, "maven-aggregate")]
    #[test_case(BuildToolKind::Uft, "uft")]
    #[test_case(BuildToolKind::LoadRunner, "load-runner")]
    fn tool_kind_uses_kebab_case(kind: BuildToolKind, expected: &str) {
        let json = serde_json::to_value(kind).expect("kind serializes");
        assert_eq!(json, serde_json::json!(expected));
    }
}
