// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::convert::TryFrom;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Arg, ArgAction, ArgMatches};
use log::{info, warn};

use crate::command::Command;
use crate::commands::{
    common_args, CommandBuilder, Executable, CONFIG, COVERAGE, DONT_CLEAN, JUNIT, PROGRESS,
    PROJECT_DIR, SELECTOR, SUCCESS_STATUS_CODE, SUITE,
};
use crate::errors::{Error, Result};
use crate::harness::build::{generate_coverage_report, prepare_compiler};
use crate::harness::config::{BuildMode, Project};
use crate::harness::discovery::discover;
use crate::harness::executor::CaseExecutor;
use crate::harness::report::{CaseEntry, SuiteReport};
use crate::reporters::console::{CaseReporter, LineReporter, ProgressBar};
use crate::reporters::junit::JunitReport;
use crate::utils::writer::Writer;

const ABOUT: &str = r#"Rebuilds the compiler-under-test, then runs every test case found under the
selector through compile, assemble, link and simulate. Prints a verdict per
case, a "Passing P/T tests" summary, and writes a JUnit report.
Failing cases do not change the exit code, a failed build does."#;

/// Runs every discovered case and reports on all of them.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Suite {
    pub(crate) selector: Option<PathBuf>,
    pub(crate) project_dir: PathBuf,
    pub(crate) config: Option<PathBuf>,
    pub(crate) junit: Option<PathBuf>,
    pub(crate) dont_clean: bool,
    pub(crate) coverage: bool,
    pub(crate) progress: bool,
}

#[allow(clippy::new_without_default)]
impl Suite {
    pub fn new() -> Self {
        SuiteBuilder::default().build()
    }
}

impl TryFrom<&ArgMatches> for Suite {
    type Error = Error;

    fn try_from(value: &ArgMatches) -> Result<Self> {
        let path = |name: &str| value.get_one::<String>(name).map(PathBuf::from);

        Ok(Suite {
            selector: path(SELECTOR),
            project_dir: path(PROJECT_DIR.0).unwrap_or_else(|| PathBuf::from(".")),
            config: path(CONFIG.0),
            junit: path(JUNIT.0),
            dont_clean: value.get_flag(DONT_CLEAN),
            coverage: value.get_flag(COVERAGE),
            progress: value.get_flag(PROGRESS.0),
        })
    }
}

impl Command for Suite {
    fn name(&self) -> &'static str {
        SUITE
    }

    fn command(&self) -> clap::Command {
        clap::Command::new(SUITE)
            .about(ABOUT)
            .arg(
                Arg::new(SELECTOR)
                    .help("Directory of test cases to run, defaults to the configured tests directory")
                    .action(ArgAction::Set)
                    .required(false),
            )
            .args(common_args())
            .arg(
                Arg::new(JUNIT.0)
                    .long(JUNIT.0)
                    .short(JUNIT.1)
                    .help("Where to write the JUnit report, overrides the configured path")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new(DONT_CLEAN)
                    .long(DONT_CLEAN)
                    .help("Skip the clean before building the compiler, same as DONT_CLEAN=1")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new(COVERAGE)
                    .long(COVERAGE)
                    .help("Build with coverage instrumentation and generate a coverage report afterwards, same as COVERAGE=1")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new(PROGRESS.0)
                    .long(PROGRESS.0)
                    .short(PROGRESS.1)
                    .help("Show a progress bar instead of a line per case when writing to a terminal")
                    .action(ArgAction::SetTrue),
            )
    }

    fn execute(&self, args: &ArgMatches, writer: &mut Writer) -> Result<i32> {
        Executable::execute(&Suite::try_from(args)?, writer)
    }
}

impl Executable for Suite {
    fn execute(&self, writer: &mut Writer) -> Result<i32> {
        let project = Project::load(&self.project_dir, self.config.as_deref())?;
        let mode = BuildMode::resolve(self.dont_clean, self.coverage);
        let output_root = project.checked_output_root()?;

        let selector = self
            .selector
            .as_ref()
            .map_or_else(|| project.tests_root(), |selector| project.resolve(selector));
        if !selector.exists() {
            return Err(Error::FileNotFoundError(selector.display().to_string()));
        }

        reset_output_root(&output_root)?;
        prepare_compiler(&project, mode)?;

        let cases = discover(&selector)?;
        let mut reporter: Box<dyn CaseReporter> = if self.progress && writer.is_terminal() {
            Box::new(ProgressBar::default())
        } else {
            Box::new(LineReporter)
        };
        reporter.start(writer, cases.len())?;

        let executor = CaseExecutor::new(&project);
        let started = Instant::now();
        let report = cases
            .iter()
            .try_fold(SuiteReport::default(), |report, case| -> Result<SuiteReport> {
                let name = project.display(case.source());
                reporter.case_started(writer, &name)?;

                let entry = match executor.execute(case) {
                    Ok(verdict) if verdict.is_pass() => CaseEntry::pass(name, verdict.elapsed),
                    Ok(verdict) => {
                        CaseEntry::fail(name, verdict.describe(project.dir()), verdict.elapsed)
                    }
                    Err(e) => {
                        warn!("{name} could not be run: {e}");
                        CaseEntry::fail(name, e.to_string(), Duration::ZERO)
                    }
                };

                reporter.case_finished(writer, &entry)?;
                Ok(report.record(entry))
            })?
            .finish(started.elapsed());

        writeln!(writer, "{}", report.summary())?;

        let junit = self
            .junit
            .as_ref()
            .map_or_else(|| project.junit_report(), |path| project.resolve(path));
        JunitReport::from(&report).write_to_path(&junit)?;
        info!("JUnit report written to {}", project.display(&junit));

        if mode.coverage {
            if let Err(e) = generate_coverage_report(&project) {
                warn!("Coverage report was not generated: {e}");
            }
        }

        Ok(SUCCESS_STATUS_CODE)
    }
}

fn reset_output_root(output_root: &Path) -> Result<()> {
    match fs::remove_dir_all(output_root) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Could not clear {}: {e}", output_root.display()),
    }
    Ok(fs::create_dir_all(output_root)?)
}

/// Programmatic construction of a [`Suite`].
#[derive(Debug, Clone, Default)]
pub struct SuiteBuilder {
    selector: Option<PathBuf>,
    project_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    junit: Option<PathBuf>,
    dont_clean: bool,
    coverage: bool,
    progress: bool,
}

impl SuiteBuilder {
    pub fn selector(mut self, selector: impl Into<PathBuf>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn project_dir(mut self, project_dir: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(project_dir.into());
        self
    }

    pub fn config(mut self, config: impl Into<PathBuf>) -> Self {
        self.config = Some(config.into());
        self
    }

    pub fn junit(mut self, junit: impl Into<PathBuf>) -> Self {
        self.junit = Some(junit.into());
        self
    }

    pub fn dont_clean(mut self, dont_clean: bool) -> Self {
        self.dont_clean = dont_clean;
        self
    }

    pub fn coverage(mut self, coverage: bool) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    fn build(self) -> Suite {
        Suite {
            selector: self.selector,
            project_dir: self.project_dir.unwrap_or_else(|| PathBuf::from(".")),
            config: self.config,
            junit: self.junit,
            dont_clean: self.dont_clean,
            coverage: self.coverage,
            progress: self.progress,
        }
    }
}

impl CommandBuilder<Suite> for SuiteBuilder {
    /// Fails when the project directory does not exist.
    fn try_build(self) -> Result<Suite> {
        if let Some(dir) = &self.project_dir {
            if !dir.is_dir() {
                return Err(Error::FileNotFoundError(dir.display().to_string()));
            }
        }
        Ok(self.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn arguments_map_onto_the_command() {
        let matches = Suite::new()
            .command()
            .try_get_matches_from([
                "suite",
                "compiler_tests/integer",
                "--project-dir",
                "/work/cc",
                "--dont-clean",
                "-p",
                "--junit",
                "out.xml",
            ])
            .unwrap();

        assert_eq!(
            Suite::try_from(&matches).unwrap(),
            Suite {
                selector: Some(PathBuf::from("compiler_tests/integer")),
                project_dir: PathBuf::from("/work/cc"),
                config: None,
                junit: Some(PathBuf::from("out.xml")),
                dont_clean: true,
                coverage: false,
                progress: true,
            }
        );
    }

    #[test]
    fn builder_rejects_missing_project() {
        let err = SuiteBuilder::default()
            .project_dir("/definitely/not/here")
            .try_build()
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFoundError(_)));
    }

    #[test]
    fn output_root_is_recreated_empty() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("bin/output");
        fs::create_dir_all(root.join("old/case")).unwrap();
        fs::write(root.join("old/case/case.s"), "stale").unwrap();

        reset_output_root(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }
}
