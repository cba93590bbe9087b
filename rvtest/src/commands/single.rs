use std::convert::TryFrom;
use std::io::Write;
use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches};
use colored::Colorize;

use crate::command::Command;
use crate::commands::{
    common_args, CommandBuilder, Executable, CONFIG, DRIVER, FAILURE_STATUS_CODE, PROJECT_DIR,
    SINGLE, SUCCESS_STATUS_CODE,
};
use crate::errors::{Error, Result};
use crate::harness::config::Project;
use crate::harness::discovery::TestCase;
use crate::harness::executor::CaseExecutor;
use crate::utils::writer::Writer;

const ABOUT: &str = r#"Runs one test case through compile, assemble, link and simulate.
The case is named by its driver, `foo_driver.c` tests `foo.c` next to it.
Exits with 0 when every stage succeeds and 72 otherwise."#;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Single {
    pub(crate) driver: PathBuf,
    pub(crate) project_dir: PathBuf,
    pub(crate) config: Option<PathBuf>,
}

#[allow(clippy::new_without_default)]
impl Single {
    pub fn new() -> Self {
        Single {
            driver: PathBuf::new(),
            project_dir: PathBuf::from("."),
            config: None,
        }
    }
}

impl TryFrom<&ArgMatches> for Single {
    type Error = Error;

    fn try_from(value: &ArgMatches) -> Result<Self> {
        let driver = value
            .get_one::<String>(DRIVER)
            .map(PathBuf::from)
            .ok_or_else(|| Error::IllegalArguments(String::from("a driver file is required")))?;

        Ok(Single {
            driver,
            project_dir: value
                .get_one::<String>(PROJECT_DIR.0)
                .map_or_else(|| PathBuf::from("."), PathBuf::from),
            config: value.get_one::<String>(CONFIG.0).map(PathBuf::from),
        })
    }
}

impl Command for Single {
    fn name(&self) -> &'static str {
        SINGLE
    }

    fn command(&self) -> clap::Command {
        clap::Command::new(SINGLE)
            .about(ABOUT)
            .arg(
                Arg::new(DRIVER)
                    .help("Driver file of the case, e.g. compiler_tests/_example/example_driver.c")
                    .action(ArgAction::Set)
                    .required(true),
            )
            .args(common_args())
            .arg_required_else_help(true)
    }

    fn execute(&self, args: &ArgMatches, writer: &mut Writer) -> Result<i32> {
        Executable::execute(&Single::try_from(args)?, writer)
    }
}

impl Executable for Single {
    fn execute(&self, writer: &mut Writer) -> Result<i32> {
        let project = Project::load(&self.project_dir, self.config.as_deref())?;
        let case = TestCase::from_driver(project.resolve(&self.driver))?;
        case.ensure_exists()?;

        let verdict = CaseExecutor::new(&project).execute(&case)?;
        let line = format!("\t> {}", verdict.describe(project.dir()));
        if verdict.is_pass() {
            writeln!(writer, "{}", line.as_str().green())?;
            Ok(SUCCESS_STATUS_CODE)
        } else {
            writeln!(writer, "{}", line.as_str().red())?;
            Ok(FAILURE_STATUS_CODE)
        }
    }
}

/// Programmatic construction of a [`Single`].
#[derive(Debug, Clone, Default)]
pub struct SingleBuilder {
    driver: Option<PathBuf>,
    project_dir: Option<PathBuf>,
    config: Option<PathBuf>,
}

impl SingleBuilder {
    pub fn driver(mut self, driver: impl Into<PathBuf>) -> Self {
        self.driver = Some(driver.into());
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
}

impl CommandBuilder<Single> for SingleBuilder {
    /// Fails without a driver or when the driver is not named `*_driver.c`.
    fn try_build(self) -> Result<Single> {
        let driver = self
            .driver
            .ok_or_else(|| Error::IllegalArguments(String::from("a driver file is required")))?;
        TestCase::from_driver(&driver)?;

        Ok(Single {
            driver,
            project_dir: self.project_dir.unwrap_or_else(|| PathBuf::from(".")),
            config: self.config,
        })
    }
}
