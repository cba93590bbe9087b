use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::errors::Result;
use crate::harness::config::Project;
use crate::harness::discovery::TestCase;
use crate::harness::layout::CaseLayout;
use crate::harness::stage::{existing_logs, run_stage, StageKind, StageStatus};

/// The first stage that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: StageKind,
    pub status: StageStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(StageFailure),
}

/// Outcome of one case, with every log written up to the point it stopped.
#[derive(Debug, Clone)]
pub struct CaseVerdict {
    pub verdict: Verdict,
    pub logs: Vec<PathBuf>,
    pub elapsed: Duration,
}

impl CaseVerdict {
    pub fn is_pass(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    /// One-line diagnostic; log paths are shown relative to `base`.
    pub fn describe(&self, base: &Path) -> String {
        match &self.verdict {
            Verdict::Pass => String::from("Pass"),
            Verdict::Fail(failure) => {
                let logs = self
                    .logs
                    .iter()
                    .map(|path| path.strip_prefix(base).unwrap_or(path).display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "{} failed ({}); logs: {logs}",
                    failure.stage, failure.status
                )
            }
        }
    }
}

/// Drives one case through compile, assemble, link and simulate, stopping at
/// the first stage that fails.
pub struct CaseExecutor<'p> {
    project: &'p Project,
}

impl<'p> CaseExecutor<'p> {
    pub fn new(project: &'p Project) -> Self {
        CaseExecutor { project }
    }

    pub fn execute(&self, case: &TestCase) -> Result<CaseVerdict> {
        let toolchain = self.project.toolchain();
        let layout = CaseLayout::new(
            &self.project.output_root(),
            &self.project.tests_root(),
            case,
        );
        layout.recreate()?;
        let bindings = layout.bindings(case);

        let started = Instant::now();
        let mut logs = Vec::new();
        for kind in StageKind::PIPELINE {
            let command = toolchain
                .invocation(kind)
                .command(self.project.dir(), &bindings);
            let result = run_stage(
                kind,
                command,
                layout.stage_logs(kind),
                toolchain.stage_timeout(),
            )?;
            logs.extend(existing_logs(&result.logs).map(Path::to_path_buf));

            if !result.is_success() {
                info!(
                    "{} failed at {kind}: {}",
                    self.project.display(case.source()),
                    result.status
                );
                return Ok(CaseVerdict {
                    verdict: Verdict::Fail(StageFailure {
                        stage: kind,
                        status: result.status,
                    }),
                    logs,
                    elapsed: started.elapsed(),
                });
            }
            debug!("{kind} took {:?}", result.elapsed);
        }

        Ok(CaseVerdict {
            verdict: Verdict::Pass,
            logs,
            elapsed: started.elapsed(),
        })
    }
}
