use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};

use crate::errors::Result;
use crate::harness::report::SuiteReport;

const SUITE_NAME: &str = "Integration test";

/// JUnit view of a finished suite, borrowed from the [`SuiteReport`].
#[derive(Debug)]
pub struct JunitReport<'report> {
    pub name: &'report str,
    pub tests: usize,
    pub failures: usize,
    pub errors: usize,
    pub time: f64,
    pub test_cases: Vec<TestCase<'report>>,
}

#[derive(Debug)]
pub struct TestCase<'report> {
    pub name: &'report str,
    pub time: f64,
    pub error: Option<&'report str>,
}

impl<'report> From<&'report SuiteReport> for JunitReport<'report> {
    fn from(report: &'report SuiteReport) -> Self {
        let test_cases = report
            .entries()
            .iter()
            .map(|entry| TestCase {
                name: entry.name.as_str(),
                time: entry.elapsed.as_secs_f64(),
                error: entry.diagnostic.as_deref(),
            })
            .collect::<Vec<_>>();

        // every stage failure is reported as an error, never as a failure
        JunitReport {
            name: SUITE_NAME,
            tests: report.total(),
            failures: 0,
            errors: report.failing(),
            time: report.elapsed().as_secs_f64(),
            test_cases,
        }
    }
}

impl<'report> JunitReport<'report> {
    pub fn serialize(&self, writer: impl Write) -> Result<()> {
        let mut writer = Writer::new_with_indent(writer, b' ', 4);
        let decl = BytesDecl::new("1.0", Some("UTF-8"), None);

        writer.write_event(Event::Decl(decl))?;
        EventType::TestSuite(self).serialize(&mut writer)?;
        Ok(writer.write_indent()?)
    }

    /// Writes the report to `path`, creating missing parent directories.
    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!("Writing JUnit report to {}", path.display());
        let mut file = BufWriter::new(File::create(path)?);
        self.serialize(&mut file)?;
        Ok(file.flush()?)
    }
}

#[derive(Debug)]
enum EventType<'report, 'se: 'report> {
    Error(&'report str),
    TestCase(&'se TestCase<'report>),
    TestSuite(&'se JunitReport<'report>),
}

impl<'report, 'se: 'report> EventType<'report, 'se> {
    fn start_tag(&self) -> BytesStart<'_> {
        BytesStart::new(self.to_string())
    }

    fn serialize_start_event(
        &self,
        writer: &mut Writer<impl Write>,
        tag: BytesStart<'_>,
    ) -> Result<()> {
        Ok(writer.write_event(Event::Start(tag))?)
    }

    fn serialize_end_event(&self, writer: &mut Writer<impl Write>) -> Result<()> {
        Ok(writer.write_event(Event::End(BytesEnd::new(self.to_string())))?)
    }

    fn extend_attributes(&self, tag: &mut BytesStart<'_>) {
        match self {
            EventType::Error(message) => {
                tag.extend_attributes([("type", "error"), ("message", *message)]);
            }
            EventType::TestCase(test_case) => {
                tag.extend_attributes([
                    ("name", test_case.name),
                    ("time", format!("{:.3}", test_case.time).as_str()),
                ]);
            }
            EventType::TestSuite(suite) => {
                tag.extend_attributes([
                    ("name", suite.name),
                    ("tests", suite.tests.to_string().as_str()),
                    ("failures", suite.failures.to_string().as_str()),
                    ("errors", suite.errors.to_string().as_str()),
                    ("time", format!("{:.3}", suite.time).as_str()),
                ]);
            }
        }
    }

    fn serialize(&self, writer: &mut Writer<impl Write>) -> Result<()> {
        let mut tag = self.start_tag();
        self.extend_attributes(&mut tag);
        match self {
            EventType::Error(message) => {
                self.serialize_start_event(writer, tag)?;
                writer.write_event(Event::Text(BytesText::new(message)))?;
                self.serialize_end_event(writer)?;
            }
            EventType::TestCase(test_case) => match test_case.error {
                Some(error) => {
                    self.serialize_start_event(writer, tag)?;
                    EventType::Error(error).serialize(writer)?;
                    self.serialize_end_event(writer)?;
                }
                None => writer.write_event(Event::Empty(tag))?,
            },
            EventType::TestSuite(suite) => {
                self.serialize_start_event(writer, tag)?;
                for test_case in &suite.test_cases {
                    EventType::TestCase(test_case).serialize(writer)?;
                }
                self.serialize_end_event(writer)?;
                writer.write_event(Event::Eof)?;
            }
        }

        Ok(())
    }
}

impl<'report, 'se: 'report> Display for EventType<'report, 'se> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EventType::Error(..) => "error",
            EventType::TestCase(..) => "testcase",
            EventType::TestSuite(..) => "testsuite",
        })
    }
}
