use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::errors::Result;
use crate::harness::discovery::TestCase;
use crate::harness::stage::{StageKind, StageLogs};

/// Output directory of a case: its source path relative to the tests root,
/// re-rooted under `output_root`.
///
/// `compiler_tests/array/index.c` lands in `<output_root>/array/index.c`. The
/// extension stays so that no case directory can sit inside another one.
pub fn case_output_dir(output_root: &Path, tests_root: &Path, source: &Path) -> PathBuf {
    let relative = match source.strip_prefix(tests_root) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => source
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part),
                _ => None,
            })
            .collect(),
    };
    output_root.join(relative)
}

/// Every artifact a case produces, named after the case's stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseLayout {
    dir: PathBuf,
    stem: String,
}

impl CaseLayout {
    pub fn new(output_root: &Path, tests_root: &Path, case: &TestCase) -> Self {
        CaseLayout {
            dir: case_output_dir(output_root, tests_root, case.source()),
            stem: case.stem(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn artifact(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{suffix}", self.stem))
    }

    pub fn assembly(&self) -> PathBuf {
        self.artifact(".s")
    }

    pub fn printed_assembly(&self) -> PathBuf {
        self.artifact(".s.printed")
    }

    pub fn object(&self) -> PathBuf {
        self.artifact(".o")
    }

    pub fn executable(&self) -> PathBuf {
        self.artifact("")
    }

    pub fn simulation_log(&self) -> PathBuf {
        self.artifact(".simulation.log")
    }

    pub fn stage_logs(&self, kind: StageKind) -> StageLogs {
        match kind {
            StageKind::Simulate => StageLogs {
                stdout: self.simulation_log(),
                stderr: self.artifact(".simulation.stderr.log"),
            },
            _ => StageLogs {
                stdout: self.artifact(&format!(".{}.stdout.log", kind.tool())),
                stderr: self.artifact(&format!(".{}.stderr.log", kind.tool())),
            },
        }
    }

    /// Placeholder values for the toolchain argument templates.
    pub fn bindings(&self, case: &TestCase) -> Vec<(&'static str, String)> {
        vec![
            ("source", case.source().display().to_string()),
            ("driver", case.driver().display().to_string()),
            ("assembly", self.assembly().display().to_string()),
            ("printed_assembly", self.printed_assembly().display().to_string()),
            ("object", self.object().display().to_string()),
            ("executable", self.executable().display().to_string()),
            ("output_dir", self.dir.display().to_string()),
        ]
    }

    /// Empties the case directory so no artifact survives from an earlier run.
    pub fn recreate(&self) -> Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }
}
