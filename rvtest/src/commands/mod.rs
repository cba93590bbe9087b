pub mod single;
pub mod suite;

use clap::{Arg, ArgAction};

use crate::errors::Result;
use crate::utils::writer::Writer;

//
// Constants
//
// Application metadata
pub const APP_NAME: &str = "rvtest";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
// Commands
pub const SUITE: &str = "suite";
pub const SINGLE: &str = "single";
// Positionals
pub const SELECTOR: &str = "selector";
pub const DRIVER: &str = "driver";
// Arguments shared by all commands
pub const PROJECT_DIR: (&str, char) = ("project-dir", 'C');
pub const CONFIG: (&str, char) = ("config", 'c');
pub const VERBOSE: (&str, char) = ("verbose", 'v');
// Arguments for suite
pub const JUNIT: (&str, char) = ("junit", 'j');
pub const PROGRESS: (&str, char) = ("progress", 'p');
pub const DONT_CLEAN: &str = "dont-clean";
pub const COVERAGE: &str = "coverage";

pub const SUCCESS_STATUS_CODE: i32 = 0;
pub const FAILURE_STATUS_CODE: i32 = 72;

/// A command ready to run, built from CLI arguments or one of the builders.
pub trait Executable {
    fn execute(&self, writer: &mut Writer) -> Result<i32>;
}

pub trait CommandBuilder<T: Executable> {
    fn try_build(self) -> Result<T>;
}

pub(crate) fn common_args() -> [Arg; 3] {
    [
        Arg::new(PROJECT_DIR.0)
            .long(PROJECT_DIR.0)
            .short(PROJECT_DIR.1)
            .help("Root of the compiler project, relative paths are resolved against it")
            .default_value(".")
            .action(ArgAction::Set),
        Arg::new(CONFIG.0)
            .long(CONFIG.0)
            .short(CONFIG.1)
            .help("Toolchain configuration file, defaults to rvtest.yaml in the project when present")
            .action(ArgAction::Set),
        Arg::new(VERBOSE.0)
            .long(VERBOSE.0)
            .short(VERBOSE.1)
            .help("Raise the log level, repeat for more detail")
            .action(ArgAction::Count),
    ]
}

/// Maps the number of `-v` flags to a log level.
pub fn verbosity(count: u8) -> log::LevelFilter {
    match count {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}
