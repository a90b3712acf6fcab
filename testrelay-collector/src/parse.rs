// Copyright (c) The testrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming conversion of one XML report into normalized records.
//!
//! [`RecordIter`] advances an event-based XML reader and assembles one
//! [`NormalizedTestRecord`] per test case, without ever materializing the
//! whole report: at most one case's data is held in memory at a time.
//!
//! Two spellings of the report schema are accepted: attribute-style
//! (`<testcase classname=".." name=".." time="..">` with
//! `<failure>`/`<error>`/`<skipped>` children) and the element-style variant
//! some hosts persist (`<case><className/><testName/><duration/>...</case>`
//! with a per-suite `<file>` element).

use crate::{detect::ModuleDetectionChain, errors::ReportParseError, helpers};
use camino::Utf8Path;
use chrono::{DateTime, FixedOffset};
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use std::{io::BufRead, time::Duration};
use testrelay_metadata::{BuildToolKind, EnrichmentContext, NormalizedTestRecord, TestStatus};

/// Dispatch-wide context threaded into every record of one report.
#[derive(Debug)]
pub struct ParseContext<'a> {
    /// The translated job name.
    pub job_name: &'a str,
    /// The build identifier.
    pub build_id: &'a str,
    /// The externally reachable build URL.
    pub build_url: &'a str,
    /// When the build started.
    pub build_started_at: DateTime<FixedOffset>,
    /// The build-tool kind.
    pub tool_kind: BuildToolKind,
    /// The enrichment computed before parsing began, if any.
    pub enrichment: Option<&'a EnrichmentContext>,
    /// The module detection chain.
    pub chain: &'a ModuleDetectionChain,
    /// The workspace root on the worker, when resolved.
    pub workspace_root: Option<&'a Utf8Path>,
    /// The shared checkout sub-directory configured for the job, if any.
    pub shared_checkout_dir: Option<&'a str>,
}

/// Suite-level fields that apply to the cases below them.
#[derive(Debug, Default)]
struct SuiteState {
    name: Option<String>,
    package: Option<String>,
    file: Option<String>,
}

/// Which suite-level element a pending text event belongs to.
#[derive(Clone, Copy, Debug)]
enum SuiteField {
    Name,
    File,
}

/// Data assembled incrementally for one test case.
#[derive(Debug)]
struct CaseData {
    name: Option<String>,
    class_name: Option<String>,
    file: Option<String>,
    duration: Duration,
    status: TestStatus,
    failure_message: Option<String>,
    failure_detail: Option<String>,
}

impl Default for CaseData {
    fn default() -> Self {
        Self {
            name: None,
            class_name: None,
            file: None,
            duration: Duration::ZERO,
            status: TestStatus::Passed,
            failure_message: None,
            failure_detail: None,
        }
    }
}

/// A lazy, finite, single-pass iterator over one report's records.
///
/// Yields `Err` once on malformed XML and then fuses; a malformed report
/// fails as a whole.
pub struct RecordIter<'a, R: BufRead> {
    reader: Reader<R>,
    cx: &'a ParseContext<'a>,
    report_path: &'a Utf8Path,
    /// Module attribution fallback when every detection strategy declines,
    /// e.g. the submodule a fallback-discovered report belongs to.
    default_module: Option<&'a str>,
    buf: Vec<u8>,
    suite: SuiteState,
    pending_suite_field: Option<SuiteField>,
    done: bool,
}

impl<'a, R: BufRead> RecordIter<'a, R> {
    /// Creates an iterator over the report read from `source`.
    pub fn new(
        source: R,
        report_path: &'a Utf8Path,
        default_module: Option<&'a str>,
        cx: &'a ParseContext<'a>,
    ) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(true);
        Self {
            reader,
            cx,
            report_path,
            default_module,
            buf: Vec::new(),
            suite: SuiteState::default(),
            pending_suite_field: None,
            done: false,
        }
    }

    fn xml_error(&self, error: quick_xml::Error) -> ReportParseError {
        ReportParseError::Xml {
            path: self.report_path.to_owned(),
            position: self.reader.buffer_position(),
            error,
        }
    }

    /// Turns assembled case data into a record, enforcing the identity
    /// invariants.
    fn finish_case(&self, case: CaseData) -> Result<NormalizedTestRecord, ReportParseError> {
        let case_name = match case.name.filter(|n| !n.is_empty()) {
            Some(name) => name,
            None => {
                return Err(ReportParseError::MissingField {
                    path: self.report_path.to_owned(),
                    field: "name",
                });
            }
        };

        let (package, class_name) = match &case.class_name {
            Some(qualified) => match qualified.rsplit_once('.') {
                Some((package, class)) => (Some(package.to_owned()), Some(class.to_owned())),
                None => (None, Some(qualified.clone())),
            },
            None => (None, None),
        };
        let package = package.or_else(|| self.suite.package.clone());

        let suite_name = match self
            .suite
            .name
            .clone()
            .or_else(|| case.class_name.clone())
            .filter(|n| !n.is_empty())
        {
            Some(name) => name,
            None => {
                return Err(ReportParseError::MissingField {
                    path: self.report_path.to_owned(),
                    field: "suite name",
                });
            }
        };

        let raw_file = case.file.or_else(|| self.suite.file.clone());

        // Module detection sees the separator-normalized path from the
        // report; the path stored on the record is the workspace-relative
        // form.
        let module = raw_file
            .as_deref()
            .map(helpers::normalize_separators)
            .and_then(|f| self.cx.chain.detect(Utf8Path::new(&f)))
            .or_else(|| self.cx.chain.detect(self.report_path))
            .or_else(|| self.default_module.map(str::to_owned));

        let source_file = raw_file.map(|f| {
            helpers::workspace_relative(&f, self.cx.workspace_root, self.cx.shared_checkout_dir)
        });

        Ok(NormalizedTestRecord {
            suite_name,
            case_name,
            module,
            package,
            class_name,
            status: case.status,
            duration: case.duration,
            failure_message: case.failure_message,
            failure_detail: case.failure_detail,
            job_name: self.cx.job_name.to_owned(),
            build_id: self.cx.build_id.to_owned(),
            build_started_at: self.cx.build_started_at,
            source_file,
            build_url: self.cx.build_url.to_owned(),
            tool_kind: self.cx.tool_kind,
            enrichment: self.cx.enrichment.cloned(),
        })
    }
}

impl<R: BufRead> Iterator for RecordIter<'_, R> {
    type Item = Result<NormalizedTestRecord, ReportParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(error) => {
                    self.done = true;
                    return Some(Err(ReportParseError::Xml {
                        path: self.report_path.to_owned(),
                        position: self.reader.buffer_position(),
                        error,
                    }));
                }
            };

            match event {
                Event::Eof => {
                    self.done = true;
                    return None;
                }
                Event::Start(e) => match e.name().as_ref() {
                    b"testsuite" => {
                        let position = self.reader.buffer_position();
                        if let Err(error) =
                            apply_suite_attrs(&e, &mut self.suite, self.report_path, position)
                        {
                            self.done = true;
                            return Some(Err(error));
                        }
                        self.pending_suite_field = None;
                    }
                    b"suite" => {
                        // Element-style suites carry their fields as child
                        // elements; reset and let them fill in.
                        self.suite = SuiteState::default();
                        self.pending_suite_field = None;
                    }
                    b"testcase" => {
                        let position = self.reader.buffer_position();
                        let case = parse_case_attrs(&e, self.report_path, position);
                        let mut case = match case {
                            Ok(case) => case,
                            Err(error) => {
                                self.done = true;
                                return Some(Err(error));
                            }
                        };
                        if let Err(error) = read_case_children(
                            &mut self.reader,
                            &mut self.buf,
                            &mut case,
                            self.report_path,
                        ) {
                            self.done = true;
                            return Some(Err(error));
                        }
                        let result = self.finish_case(case);
                        if result.is_err() {
                            self.done = true;
                        }
                        return Some(result);
                    }
                    b"case" => {
                        let case = read_element_style_case(
                            &mut self.reader,
                            &mut self.buf,
                            self.report_path,
                        );
                        let case = match case {
                            Ok(case) => case,
                            Err(error) => {
                                self.done = true;
                                return Some(Err(error));
                            }
                        };
                        let result = self.finish_case(case);
                        if result.is_err() {
                            self.done = true;
                        }
                        return Some(result);
                    }
                    b"name" => self.pending_suite_field = Some(SuiteField::Name),
                    b"file" => self.pending_suite_field = Some(SuiteField::File),
                    _ => self.pending_suite_field = None,
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"testcase" => {
                        let position = self.reader.buffer_position();
                        let result = parse_case_attrs(&e, self.report_path, position)
                            .and_then(|case| self.finish_case(case));
                        if result.is_err() {
                            self.done = true;
                        }
                        return Some(result);
                    }
                    b"testsuite" => {
                        let position = self.reader.buffer_position();
                        if let Err(error) =
                            apply_suite_attrs(&e, &mut self.suite, self.report_path, position)
                        {
                            self.done = true;
                            return Some(Err(error));
                        }
                    }
                    _ => {}
                },
                Event::Text(text) => {
                    if let Some(field) = self.pending_suite_field {
                        let value = match text.unescape() {
                            Ok(value) => value.into_owned(),
                            Err(error) => {
                                self.done = true;
                                return Some(Err(self.xml_error(error)));
                            }
                        };
                        match field {
                            SuiteField::Name => self.suite.name = Some(value),
                            SuiteField::File => self.suite.file = Some(value),
                        }
                    }
                }
                Event::End(_) => self.pending_suite_field = None,
                _ => {}
            }
        }
    }
}

/// Which child of an attribute-style `<testcase>` a text event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CaseChild {
    FailureDetail,
    Other,
}

/// Copies `<testsuite>` attributes into the suite state.
fn apply_suite_attrs(
    e: &BytesStart<'_>,
    suite: &mut SuiteState,
    path: &Utf8Path,
    position: usize,
) -> Result<(), ReportParseError> {
    *suite = SuiteState::default();
    for attr in e.attributes() {
        let attr = attr.map_err(|error| ReportParseError::Xml {
            path: path.to_owned(),
            position,
            error: error.into(),
        })?;
        let value = attr.unescape_value().map_err(|error| ReportParseError::Xml {
            path: path.to_owned(),
            position,
            error,
        })?;
        match attr.key.as_ref() {
            b"name" => suite.name = Some(value.into_owned()),
            b"package" => suite.package = Some(value.into_owned()),
            b"file" => suite.file = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok(())
}

/// Copies `<testcase>` attributes into fresh case data.
fn parse_case_attrs(
    e: &BytesStart<'_>,
    path: &Utf8Path,
    position: usize,
) -> Result<CaseData, ReportParseError> {
    let mut case = CaseData::default();
    for attr in e.attributes() {
        let attr = attr.map_err(|error| ReportParseError::Xml {
            path: path.to_owned(),
            position,
            error: error.into(),
        })?;
        let value = attr.unescape_value().map_err(|error| ReportParseError::Xml {
            path: path.to_owned(),
            position,
            error,
        })?;
        match attr.key.as_ref() {
            b"name" => case.name = Some(value.into_owned()),
            b"classname" => case.class_name = Some(value.into_owned()),
            b"file" => case.file = Some(value.into_owned()),
            b"time" => case.duration = parse_seconds(&value),
            _ => {}
        }
    }
    Ok(case)
}

/// Reads the children of an attribute-style `<testcase>` until its end tag,
/// filling in the outcome.
fn read_case_children<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
    case: &mut CaseData,
    path: &Utf8Path,
) -> Result<(), ReportParseError> {
    let mut child = CaseChild::Other;

    loop {
        buf.clear();
        let position = reader.buffer_position();
        let event = reader
            .read_event_into(buf)
            .map_err(|error| ReportParseError::Xml {
                path: path.to_owned(),
                position,
                error,
            })?;

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"failure" => {
                    case.status = TestStatus::Failed;
                    case.failure_message = message_attr(&e, path, position)?;
                    child = CaseChild::FailureDetail;
                }
                b"error" => {
                    case.status = TestStatus::Error;
                    case.failure_message = message_attr(&e, path, position)?;
                    child = CaseChild::FailureDetail;
                }
                b"skipped" => {
                    case.status = TestStatus::Skipped;
                    case.failure_message = message_attr(&e, path, position)?;
                    child = CaseChild::Other;
                }
                _ => child = CaseChild::Other,
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"failure" => {
                    case.status = TestStatus::Failed;
                    case.failure_message = message_attr(&e, path, position)?;
                }
                b"error" => {
                    case.status = TestStatus::Error;
                    case.failure_message = message_attr(&e, path, position)?;
                }
                b"skipped" => {
                    case.status = TestStatus::Skipped;
                    case.failure_message = message_attr(&e, path, position)?;
                }
                _ => {}
            },
            Event::Text(text) => {
                if child == CaseChild::FailureDetail {
                    let value = text
                        .unescape()
                        .map_err(|error| ReportParseError::Xml {
                            path: path.to_owned(),
                            position,
                            error,
                        })?
                        .into_owned();
                    if !value.is_empty() {
                        match &mut case.failure_detail {
                            Some(detail) => {
                                detail.push('\n');
                                detail.push_str(&value);
                            }
                            None => case.failure_detail = Some(value),
                        }
                    }
                }
            }
            Event::End(e) => {
                if e.name().as_ref() == b"testcase" {
                    return Ok(());
                }
                child = CaseChild::Other;
            }
            Event::Eof => {
                return Err(ReportParseError::Xml {
                    path: path.to_owned(),
                    position,
                    error: quick_xml::Error::UnexpectedEof("testcase".to_owned()),
                });
            }
            _ => {}
        }
    }
}

/// Reads one element-style `<case>` block until its end tag.
fn read_element_style_case<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
    path: &Utf8Path,
) -> Result<CaseData, ReportParseError> {
    let mut case = CaseData::default();
    let mut current: Option<Vec<u8>> = None;

    loop {
        buf.clear();
        let position = reader.buffer_position();
        let event = reader
            .read_event_into(buf)
            .map_err(|error| ReportParseError::Xml {
                path: path.to_owned(),
                position,
                error,
            })?;

        match event {
            Event::Start(e) => current = Some(e.name().as_ref().to_owned()),
            Event::Empty(_) => current = None,
            Event::Text(text) => {
                let Some(element) = current.as_deref() else {
                    continue;
                };
                let value = text
                    .unescape()
                    .map_err(|error| ReportParseError::Xml {
                        path: path.to_owned(),
                        position,
                        error,
                    })?
                    .into_owned();
                match element {
                    b"testName" => case.name = Some(value),
                    b"className" => case.class_name = Some(value),
                    b"duration" => case.duration = parse_seconds(&value),
                    b"skipped" => {
                        if value == "true" {
                            case.status = TestStatus::Skipped;
                        }
                    }
                    b"errorDetails" => case.failure_message = Some(value),
                    b"errorStackTrace" => case.failure_detail = Some(value),
                    _ => {}
                }
            }
            Event::End(e) => {
                if e.name().as_ref() == b"case" {
                    break;
                }
                current = None;
            }
            Event::Eof => {
                return Err(ReportParseError::Xml {
                    path: path.to_owned(),
                    position,
                    error: quick_xml::Error::UnexpectedEof("case".to_owned()),
                });
            }
            _ => {}
        }
    }

    // The element-style schema does not distinguish failures from errors.
    if case.status == TestStatus::Passed
        && (case.failure_message.is_some() || case.failure_detail.is_some())
    {
        case.status = TestStatus::Failed;
    }
    Ok(case)
}

/// Returns the `message` attribute of a failure/error/skipped element.
fn message_attr(
    e: &BytesStart<'_>,
    path: &Utf8Path,
    position: usize,
) -> Result<Option<String>, ReportParseError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|error| ReportParseError::Xml {
            path: path.to_owned(),
            position,
            error: error.into(),
        })?;
        if attr.key.as_ref() == b"message" {
            let value = attr.unescape_value().map_err(|error| ReportParseError::Xml {
                path: path.to_owned(),
                position,
                error,
            })?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Parses a seconds value like `0.023`, tolerating junk as zero.
///
/// Values a `Duration` cannot represent (negative, non-finite, or past its
/// range) also degrade to zero rather than failing the case.
fn parse_seconds(value: &str) -> Duration {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
        .unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::ModuleDetectionConfig;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::io::{BufReader, Cursor, Read};
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn chain() -> ModuleDetectionChain {
        ModuleDetectionConfig {
            module_roots: vec![],
            workspace_root: Some("/ws".into()),
            tool_kind: BuildToolKind::MavenAggregate,
        }
        .build_chain()
    }

    fn context<'a>(chain: &'a ModuleDetectionChain) -> ParseContext<'a> {
        ParseContext {
            job_name: "ci/example",
            build_id: "7",
            build_url: "https://ci.example.com/job/example/7/",
            build_started_at: "2024-03-01T12:00:00+00:00".parse().unwrap(),
            tool_kind: BuildToolKind::MavenAggregate,
            enrichment: None,
            chain,
            workspace_root: Some(Utf8Path::new("/ws")),
            shared_checkout_dir: None,
        }
    }

    fn parse_all(xml: &str) -> Vec<Result<NormalizedTestRecord, ReportParseError>> {
        let chain = chain();
        let cx = context(&chain);
        let path = Utf8Path::new("/builds/42/junitResult.xml");
        RecordIter::new(Cursor::new(xml.as_bytes()), path, None, &cx).collect()
    }

    #[test]
    fn two_case_report_yields_two_records() {
        let xml = indoc! {r#"
            <?xml version="1.0" encoding="UTF-8"?>
            <testsuite name="Foo" tests="2">
              <testcase classname="Foo" name="bar" time="0.050"/>
              <testcase classname="Foo" name="baz" time="0.100">
                <failure message="boom">at Foo.baz(Foo.java:7)</failure>
              </testcase>
            </testsuite>
        "#};

        let records: Vec<_> = parse_all(xml)
            .into_iter()
            .collect::<Result<_, _>>()
            .expect("report parses");
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].suite_name, "Foo");
        assert_eq!(records[0].case_name, "bar");
        assert_eq!(records[0].status, TestStatus::Passed);
        assert_eq!(records[0].duration, Duration::from_millis(50));
        assert_eq!(records[0].failure_message, None);

        assert_eq!(records[1].case_name, "baz");
        assert_eq!(records[1].status, TestStatus::Failed);
        assert_eq!(records[1].failure_message.as_deref(), Some("boom"));
        assert_eq!(
            records[1].failure_detail.as_deref(),
            Some("at Foo.baz(Foo.java:7)")
        );
    }

    #[test]
    fn every_record_carries_identity() {
        let xml = indoc! {r#"
            <testsuite name="com.example.FooTest">
              <testcase classname="com.example.FooTest" name="a"/>
              <testcase classname="com.example.FooTest" name="b"/>
              <testcase classname="com.example.FooTest" name="c"/>
            </testsuite>
        "#};

        let records: Vec<_> = parse_all(xml)
            .into_iter()
            .collect::<Result<_, _>>()
            .expect("report parses");
        assert_eq!(records.len(), 3);
        for record in &records {
            assert!(!record.suite_name.is_empty());
            assert!(!record.case_name.is_empty());
            assert_eq!(record.job_name, "ci/example");
            assert_eq!(record.build_id, "7");
            assert_eq!(record.package.as_deref(), Some("com.example"));
            assert_eq!(record.class_name.as_deref(), Some("FooTest"));
        }
    }

    #[test]
    fn statuses_map_from_children() {
        let xml = indoc! {r#"
            <testsuite name="Foo">
              <testcase classname="Foo" name="errored">
                <error message="npe">stack</error>
              </testcase>
              <testcase classname="Foo" name="skipped">
                <skipped message="not today"/>
              </testcase>
            </testsuite>
        "#};

        let records: Vec<_> = parse_all(xml)
            .into_iter()
            .collect::<Result<_, _>>()
            .expect("report parses");
        assert_eq!(records[0].status, TestStatus::Error);
        assert_eq!(records[0].failure_message.as_deref(), Some("npe"));
        assert_eq!(records[1].status, TestStatus::Skipped);
        assert_eq!(records[1].failure_message.as_deref(), Some("not today"));
    }

    #[test]
    fn source_file_is_workspace_relative() {
        let xml = indoc! {r#"
            <testsuite name="Foo" file="/ws/billing/src/test/FooTest.java">
              <testcase classname="Foo" name="bar"/>
            </testsuite>
        "#};

        let records: Vec<_> = parse_all(xml)
            .into_iter()
            .collect::<Result<_, _>>()
            .expect("report parses");
        assert_eq!(
            records[0].source_file.as_deref(),
            Some(Utf8Path::new("billing/src/test/FooTest.java"))
        );
        // Aggregate detection attributes the case to the first segment below
        // the workspace root.
        assert_eq!(records[0].module.as_deref(), Some("billing"));
    }

    #[test]
    fn element_style_case_blocks_parse() {
        let xml = indoc! {r#"
            <result>
              <suites>
                <suite>
                  <file>/ws/core/target/surefire-reports/TEST-FooTest.xml</file>
                  <name>com.example.FooTest</name>
                  <cases>
                    <case>
                      <duration>0.25</duration>
                      <className>com.example.FooTest</className>
                      <testName>bar</testName>
                      <skipped>false</skipped>
                    </case>
                    <case>
                      <duration>0.5</duration>
                      <className>com.example.FooTest</className>
                      <testName>baz</testName>
                      <skipped>false</skipped>
                      <errorDetails>boom</errorDetails>
                      <errorStackTrace>at FooTest.baz</errorStackTrace>
                    </case>
                  </cases>
                </suite>
              </suites>
            </result>
        "#};

        let records: Vec<_> = parse_all(xml)
            .into_iter()
            .collect::<Result<_, _>>()
            .expect("report parses");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].suite_name, "com.example.FooTest");
        assert_eq!(records[0].case_name, "bar");
        assert_eq!(records[0].status, TestStatus::Passed);
        assert_eq!(records[0].duration, Duration::from_millis(250));
        assert_eq!(records[0].module.as_deref(), Some("core"));

        assert_eq!(records[1].status, TestStatus::Failed);
        assert_eq!(records[1].failure_message.as_deref(), Some("boom"));
        assert_eq!(records[1].failure_detail.as_deref(), Some("at FooTest.baz"));
    }

    #[test]
    fn overflowing_time_attribute_degrades_to_zero_duration() {
        let xml = indoc! {r#"
            <testsuite name="Foo">
              <testcase classname="Foo" name="bar" time="1e20"/>
            </testsuite>
        "#};

        let records: Vec<_> = parse_all(xml)
            .into_iter()
            .collect::<Result<_, _>>()
            .expect("report parses");
        assert_eq!(records[0].duration, Duration::ZERO);
    }

    #[test]
    fn unrepresentable_time_values_parse_as_zero() {
        for value in ["1e20", "-5", "NaN", "inf", "junk", ""] {
            assert_eq!(parse_seconds(value), Duration::ZERO, "value {value:?}");
        }
        assert_eq!(parse_seconds("0.5"), Duration::from_millis(500));
    }

    #[test]
    fn backslash_source_paths_still_get_module_attribution() {
        let chain = ModuleDetectionConfig {
            module_roots: vec![],
            workspace_root: Some("C:/ws".into()),
            tool_kind: BuildToolKind::MavenAggregate,
        }
        .build_chain();
        let mut cx = context(&chain);
        cx.workspace_root = Some(Utf8Path::new("C:/ws"));

        let xml = indoc! {r#"
            <testsuite name="Foo" file="C:\ws\billing\src\FooTest.java">
              <testcase classname="Foo" name="bar"/>
            </testsuite>
        "#};
        let path = Utf8Path::new("/builds/42/junitResult.xml");
        let records: Vec<NormalizedTestRecord> =
            RecordIter::new(Cursor::new(xml.as_bytes()), path, None, &cx)
                .collect::<Result<_, _>>()
                .expect("report parses");
        assert_eq!(records[0].module.as_deref(), Some("billing"));
        assert_eq!(
            records[0].source_file.as_deref(),
            Some(Utf8Path::new("billing/src/FooTest.java"))
        );
    }

    #[test]
    fn malformed_xml_fails_the_report() {
        let xml = r#"<testsuite name="Foo"><testcase name="bar"></wrong></testsuite>"#;
        let results = parse_all(xml);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(ReportParseError::Xml { .. }))),
            "expected an XML error, got {results:?}"
        );
    }

    #[test]
    fn case_without_name_is_rejected() {
        let xml = r#"<testsuite name="Foo"><testcase classname="Foo"/></testsuite>"#;
        let results = parse_all(xml);
        assert!(matches!(
            results.first(),
            Some(Err(ReportParseError::MissingField { field: "name", .. }))
        ));
    }

    /// A reader double that counts how many bytes the parser has pulled.
    struct MeteredReader {
        inner: Cursor<Vec<u8>>,
        consumed: Arc<AtomicUsize>,
    }

    impl Read for MeteredReader {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            let n = self.inner.read(out)?;
            self.consumed.fetch_add(n, Ordering::Relaxed);
            Ok(n)
        }
    }

    #[test]
    fn parsing_is_streaming_not_eager() {
        use std::fmt::Write as _;

        let mut xml = String::from(r#"<testsuite name="Big">"#);
        for i in 0..5_000 {
            write!(xml, r#"<testcase classname="Big" name="case_{i}" time="0.001"/>"#).unwrap();
        }
        xml.push_str("</testsuite>");
        let total = xml.len();

        let consumed = Arc::new(AtomicUsize::new(0));
        let source = BufReader::with_capacity(
            512,
            MeteredReader {
                inner: Cursor::new(xml.into_bytes()),
                consumed: Arc::clone(&consumed),
            },
        );

        let chain = chain();
        let cx = context(&chain);
        let path = Utf8Path::new("/builds/42/junitResult.xml");
        let mut iter = RecordIter::new(source, path, None, &cx);

        let first = iter.next().expect("at least one record").expect("parses");
        assert_eq!(first.case_name, "case_0");
        let after_first = consumed.load(Ordering::Relaxed);
        assert!(
            after_first < total / 10,
            "first record should not drain the source: consumed {after_first} of {total}"
        );

        assert_eq!(iter.count(), 4_999);
    }
}
