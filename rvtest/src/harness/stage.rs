use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::errors::Result;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Compile,
    Assemble,
    Link,
    Simulate,
}

impl StageKind {
    /// Order in which stages run for every test case.
    pub const PIPELINE: [StageKind; 4] = [
        StageKind::Compile,
        StageKind::Assemble,
        StageKind::Link,
        StageKind::Simulate,
    ];

    /// Prefix used for the stage's log files.
    pub fn tool(&self) -> &'static str {
        match self {
            StageKind::Compile => "compiler",
            StageKind::Assemble => "assembler",
            StageKind::Link => "linker",
            StageKind::Simulate => "simulation",
        }
    }
}

impl Display for StageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StageKind::Compile => "Compile",
            StageKind::Assemble => "Assemble",
            StageKind::Link => "Link",
            StageKind::Simulate => "Simulation",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Exited(i32),
    Signaled(i32),
    TimedOut(Duration),
    LaunchFailed(String),
}

impl StageStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, StageStatus::Exited(0))
    }
}

impl Display for StageStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StageStatus::Exited(code) => write!(f, "exit status {code}"),
            StageStatus::Signaled(signal) => write!(f, "terminated by signal {signal}"),
            StageStatus::TimedOut(limit) => write!(f, "timed out after {}s", limit.as_secs()),
            StageStatus::LaunchFailed(reason) => write!(f, "could not launch: {reason}"),
        }
    }
}

/// Where a stage's standard streams end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLogs {
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

#[derive(Debug, Clone)]
pub struct StageResult {
    pub kind: StageKind,
    pub status: StageStatus,
    pub logs: StageLogs,
    pub elapsed: Duration,
}

impl StageResult {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Runs one stage to completion with its output captured in `logs`.
///
/// Both streams go straight to files so a chatty tool can never block on a
/// full pipe. The tool leads its own process group; when it is still running
/// at `timeout` the whole group is killed and the tool reaped.
/// Errors are only returned when the log files themselves cannot be written;
/// a tool that fails to start is a [`StageStatus::LaunchFailed`].
pub fn run_stage(
    kind: StageKind,
    mut command: Command,
    logs: StageLogs,
    timeout: Duration,
) -> Result<StageResult> {
    let stdout = File::create(&logs.stdout)?;
    let mut stderr = File::create(&logs.stderr)?;
    debug!("{kind}: {command:?}");

    let started = Instant::now();
    command
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr.try_clone()?);
    in_own_process_group(&mut command);

    let status = match command.spawn() {
        Ok(child) => wait_with_timeout(child, timeout)?,
        Err(e) => {
            let reason = format!("{}: {e}", command.get_program().to_string_lossy());
            writeln!(stderr, "{reason}")?;
            warn!("{kind} stage could not start {reason}");
            StageStatus::LaunchFailed(reason)
        }
    };
    let elapsed = started.elapsed();
    trace!("{kind} finished with {status} in {elapsed:?}");

    Ok(StageResult {
        kind,
        status,
        logs,
        elapsed,
    })
}

fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<StageStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(exit_status(status));
        }
        if Instant::now() >= deadline {
            kill_process_group(&mut child);
            child.wait()?;
            return Ok(StageStatus::TimedOut(timeout));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn in_own_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    command.process_group(0);
}

#[cfg(not(unix))]
fn in_own_process_group(_command: &mut Command) {}

// The group id is the child's pid. Anything that already exited is ignored.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) {
    if let Ok(pid) = i32::try_from(child.id()) {
        unsafe {
            libc::kill(-pid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) {
    let _ = child.kill();
}

#[cfg(unix)]
fn exit_status(status: ExitStatus) -> StageStatus {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => StageStatus::Exited(code),
        (None, Some(signal)) => StageStatus::Signaled(signal),
        (None, None) => StageStatus::Exited(-1),
    }
}

#[cfg(not(unix))]
fn exit_status(status: ExitStatus) -> StageStatus {
    StageStatus::Exited(status.code().unwrap_or(-1))
}

/// Log paths of `logs` that exist on disk, stdout first.
pub fn existing_logs(logs: &StageLogs) -> impl Iterator<Item = &Path> {
    [logs.stdout.as_path(), logs.stderr.as_path()]
        .into_iter()
        .filter(|path| path.exists())
}
