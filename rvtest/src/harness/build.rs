use log::{debug, info};

use crate::errors::{Error, Result};
use crate::harness::config::{BuildMode, Invocation, Project};

/// Rebuilds the compiler-under-test before a suite run: an optional clean,
/// then either the normal or the coverage-instrumented build.
pub fn prepare_compiler(project: &Project, mode: BuildMode) -> Result<()> {
    let steps = &project.toolchain().build;
    if mode.clean {
        run_step(project, "clean", steps.clean.as_ref())?;
    } else {
        debug!("Skipping clean, build artifacts are reused");
    }

    if mode.coverage {
        run_step(project, "coverage build", steps.coverage_compile.as_ref())
    } else {
        run_step(project, "build", steps.compile.as_ref())
    }
}

pub fn generate_coverage_report(project: &Project) -> Result<()> {
    run_step(
        project,
        "coverage report",
        project.toolchain().build.coverage_report.as_ref(),
    )
}

// Build steps share the terminal with the user, unlike test stages
fn run_step(project: &Project, name: &str, step: Option<&Invocation>) -> Result<()> {
    let step = match step {
        Some(step) => step,
        None => {
            debug!("No {name} step configured");
            return Ok(());
        }
    };

    info!("Running {name}: {step}");
    let status = step
        .command(project.dir(), &[])
        .status()
        .map_err(|e| Error::BuildFailure(format!("{name} `{step}` could not start: {e}")))?;

    if status.success() {
        Ok(())
    } else {
        Err(Error::BuildFailure(format!("{name} `{step}` exited with {status}")))
    }
}
