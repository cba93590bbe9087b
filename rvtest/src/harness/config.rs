use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::errors::{Error, Result};
use crate::harness::stage::StageKind;

pub const DEFAULT_CONFIG_FILE: &str = "rvtest.yaml";
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 15;

// Environment switches honoured by the suite runner
pub const DONT_CLEAN_ENV: &str = "DONT_CLEAN";
pub const COVERAGE_ENV: &str = "COVERAGE";

const RISCV_GCC: &str = "riscv64-unknown-elf-gcc";
const RISCV_ARCH: &str = "-march=rv32imfd";
const RISCV_ABI: &str = "-mabi=ilp32d";

/// One external tool call. `args` are templates, `{name}` placeholders are
/// replaced per test case (see [`expand`]).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Invocation {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Invocation {
            program: program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    /// Programs given as a path (anything with a separator) are resolved
    /// against the project directory, bare names go through `PATH`.
    pub fn program_path(&self, project_dir: &Path) -> PathBuf {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            project_dir.join(program)
        } else {
            program.to_path_buf()
        }
    }

    pub fn render_args(&self, bindings: &[(&str, String)]) -> Vec<String> {
        self.args.iter().map(|arg| expand(arg, bindings)).collect()
    }

    pub fn command(
        &self,
        project_dir: &Path,
        bindings: &[(&str, String)],
    ) -> std::process::Command {
        let mut command = std::process::Command::new(self.program_path(project_dir));
        command
            .args(self.render_args(bindings))
            .current_dir(project_dir);
        command
    }
}

impl Display for Invocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

pub fn expand(template: &str, bindings: &[(&str, String)]) -> String {
    bindings
        .iter()
        .fold(template.to_string(), |acc, (name, value)| {
            acc.replace(&format!("{{{name}}}"), value)
        })
}

/// Commands used to rebuild the compiler-under-test. A step set to `null`
/// in the configuration is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSteps {
    pub clean: Option<Invocation>,
    pub compile: Option<Invocation>,
    pub coverage_compile: Option<Invocation>,
    pub coverage_report: Option<Invocation>,
}

impl Default for BuildSteps {
    fn default() -> Self {
        BuildSteps {
            clean: Some(Invocation::new("make", &["clean"])),
            compile: Some(Invocation::new("make", &["bin/c_compiler"])),
            coverage_compile: Some(Invocation::new("make", &["with_coverage"])),
            coverage_report: Some(Invocation::new("make", &["coverage"])),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Toolchain {
    pub compiler: Invocation,
    pub assembler: Invocation,
    pub linker: Invocation,
    pub simulator: Invocation,
    pub stage_timeout_secs: u64,
    pub tests_dir: PathBuf,
    pub output_dir: PathBuf,
    pub junit_report: PathBuf,
    pub build: BuildSteps,
}

impl Default for Toolchain {
    fn default() -> Self {
        Toolchain {
            compiler: Invocation::new("bin/c_compiler", &["-S", "{source}", "-o", "{assembly}"]),
            assembler: Invocation::new(
                RISCV_GCC,
                &[RISCV_ARCH, RISCV_ABI, "-o", "{object}", "-c", "{assembly}"],
            ),
            linker: Invocation::new(
                RISCV_GCC,
                &[
                    RISCV_ARCH,
                    RISCV_ABI,
                    "-static",
                    "-o",
                    "{executable}",
                    "{object}",
                    "{driver}",
                ],
            ),
            simulator: Invocation::new("spike", &["pk", "{executable}"]),
            stage_timeout_secs: DEFAULT_STAGE_TIMEOUT_SECS,
            tests_dir: PathBuf::from("compiler_tests"),
            output_dir: PathBuf::from("bin/output"),
            junit_report: PathBuf::from("bin/junit_results.xml"),
            build: BuildSteps::default(),
        }
    }
}

impl Toolchain {
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Toolchain::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::FileNotFoundError(path.display().to_string()));
        }
        debug!("Loading toolchain configuration from {}", path.display());
        Self::from_yaml(&fs::read_to_string(path)?)
    }

    pub fn invocation(&self, kind: StageKind) -> &Invocation {
        match kind {
            StageKind::Compile => &self.compiler,
            StageKind::Assemble => &self.assembler,
            StageKind::Link => &self.linker,
            StageKind::Simulate => &self.simulator,
        }
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }
}

/// How the compiler-under-test is rebuilt before a suite run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildMode {
    pub clean: bool,
    pub coverage: bool,
}

impl Default for BuildMode {
    fn default() -> Self {
        BuildMode {
            clean: true,
            coverage: false,
        }
    }
}

impl BuildMode {
    /// CLI flags win; otherwise `DONT_CLEAN=1` and `COVERAGE=1` in the process
    /// environment switch the corresponding behaviour.
    pub fn resolve(dont_clean: bool, coverage: bool) -> Self {
        Self::resolve_with(dont_clean, coverage, |name| std::env::var(name).ok())
    }

    /// Same as [`BuildMode::resolve`] with the environment read through `env`.
    pub fn resolve_with<F>(dont_clean: bool, coverage: bool, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let dont_clean = dont_clean || is_switch_on(env(DONT_CLEAN_ENV).as_deref());
        let coverage = coverage || is_switch_on(env(COVERAGE_ENV).as_deref());
        BuildMode {
            clean: !dont_clean,
            coverage,
        }
    }
}

pub fn is_switch_on(value: Option<&str>) -> bool {
    value == Some("1")
}

/// The compiler project under test together with its toolchain settings.
/// All paths handed out are absolute, rooted at the project directory.
#[derive(Debug, Clone)]
pub struct Project {
    dir: PathBuf,
    toolchain: Toolchain,
    config: Option<PathBuf>,
}

impl Project {
    pub fn new(dir: PathBuf, toolchain: Toolchain) -> Self {
        Project {
            dir,
            toolchain,
            config: None,
        }
    }

    /// Resolves the project directory and picks the configuration: an explicit
    /// file must exist, otherwise `rvtest.yaml` is used when present.
    pub fn load(dir: &Path, config: Option<&Path>) -> Result<Self> {
        let dir = dir
            .canonicalize()
            .map_err(|_| Error::FileNotFoundError(dir.display().to_string()))?;

        let config = match config {
            Some(path) => Some(dir.join(path)),
            None => Some(dir.join(DEFAULT_CONFIG_FILE)).filter(|default| default.is_file()),
        };
        let toolchain = match &config {
            Some(path) => Toolchain::from_file(path)?,
            None => {
                debug!("No {DEFAULT_CONFIG_FILE} in {}, using defaults", dir.display());
                Toolchain::default()
            }
        };

        Ok(Project {
            dir,
            toolchain,
            config,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.dir.join(path)
    }

    pub fn tests_root(&self) -> PathBuf {
        self.resolve(&self.toolchain.tests_dir)
    }

    pub fn output_root(&self) -> PathBuf {
        self.resolve(&self.toolchain.output_dir)
    }

    /// The output root, unless clearing it would also remove the project, the
    /// tests or the configuration file.
    pub fn checked_output_root(&self) -> Result<PathBuf> {
        let output_root = normalize(&self.output_root());
        let protected = [Some(self.dir.clone()), Some(self.tests_root()), self.config.clone()];
        match protected
            .iter()
            .flatten()
            .find(|path| normalize(path).starts_with(&output_root))
        {
            Some(path) => Err(Error::IllegalArguments(format!(
                "Output directory `{}` would remove `{}`",
                output_root.display(),
                path.display()
            ))),
            None => Ok(output_root),
        }
    }

    pub fn junit_report(&self) -> PathBuf {
        self.resolve(&self.toolchain.junit_report)
    }

    /// Path as shown to users: relative to the project when it lives inside it.
    pub fn display(&self, path: &Path) -> String {
        path.strip_prefix(&self.dir)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

// Lexical only: `a/./b/../c` becomes `a/c`, symlinks are not followed.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .fold(PathBuf::new(), |mut normalized, component| {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    normalized.pop();
                }
                other => normalized.push(other),
            }
            normalized
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn defaults_target_rv32_with_ilp32d() {
        let toolchain = Toolchain::default();
        assert_eq!(
            toolchain.assembler.to_string(),
            "riscv64-unknown-elf-gcc -march=rv32imfd -mabi=ilp32d -o {object} -c {assembly}"
        );
        assert!(toolchain.linker.args.contains(&String::from("-static")));
        assert_eq!(toolchain.stage_timeout(), Duration::from_secs(15));
        assert_eq!(toolchain.simulator.to_string(), "spike pk {executable}");
    }

    #[test]
    fn partial_yaml_keeps_remaining_defaults() {
        let toolchain = Toolchain::from_yaml(indoc! {r#"
            simulator:
              program: qemu-riscv32
              args: ["{executable}"]
            stage_timeout_secs: 3
            build:
              clean: ~
        "#})
        .unwrap();

        assert_eq!(toolchain.simulator, Invocation::new("qemu-riscv32", &["{executable}"]));
        assert_eq!(toolchain.stage_timeout_secs, 3);
        assert_eq!(toolchain.build.clean, None);
        assert_eq!(toolchain.build.compile, BuildSteps::default().compile);
        assert_eq!(toolchain.compiler, Toolchain::default().compiler);
    }

    #[test]
    fn empty_yaml_is_the_default_toolchain() {
        assert_eq!(Toolchain::from_yaml("\n").unwrap(), Toolchain::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Toolchain::from_yaml("simulatr: {program: spike}").unwrap_err();
        assert!(matches!(err, Error::YamlError(_)));
    }

    #[test]
    fn placeholders_are_expanded() {
        let bindings = [
            ("source", String::from("/p/t/a.c")),
            ("assembly", String::from("/p/out/a/a.s")),
        ];
        let compiler = Toolchain::default().compiler;
        assert_eq!(
            compiler.render_args(&bindings),
            vec!["-S", "/p/t/a.c", "-o", "/p/out/a/a.s"]
        );
        assert_eq!(expand("{unknown}-{source}", &bindings), "{unknown}-/p/t/a.c");
    }

    #[rstest]
    #[case("bin/c_compiler", "/project/bin/c_compiler")]
    #[case("spike", "spike")]
    #[case("/usr/bin/spike", "/usr/bin/spike")]
    fn program_paths_resolve_against_project(#[case] program: &str, #[case] expected: &str) {
        let invocation = Invocation::new(program, &[]);
        assert_eq!(
            invocation.program_path(Path::new("/project")),
            PathBuf::from(expected)
        );
    }

    #[rstest]
    #[case(Some("1"), true)]
    #[case(Some("0"), false)]
    #[case(Some("true"), false)]
    #[case(Some(""), false)]
    #[case(None, false)]
    fn only_one_turns_a_switch_on(#[case] value: Option<&str>, #[case] expected: bool) {
        assert_eq!(is_switch_on(value), expected);
    }

    fn environment(
        vars: &'static [(&'static str, &'static str)],
    ) -> impl Fn(&str) -> Option<String> {
        move |name| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }
    }

    #[rstest]
    #[case(false, false, &[], true, false)]
    #[case(false, false, &[("DONT_CLEAN", "1")], false, false)]
    #[case(false, false, &[("COVERAGE", "1")], true, true)]
    #[case(false, false, &[("DONT_CLEAN", "1"), ("COVERAGE", "1")], false, true)]
    #[case(false, false, &[("DONT_CLEAN", "yes"), ("COVERAGE", "0")], true, false)]
    #[case(true, false, &[], false, false)]
    #[case(false, true, &[("COVERAGE", "0")], true, true)]
    fn build_mode_combines_flags_and_environment(
        #[case] dont_clean: bool,
        #[case] coverage: bool,
        #[case] vars: &'static [(&'static str, &'static str)],
        #[case] clean: bool,
        #[case] instrumented: bool,
    ) {
        assert_eq!(
            BuildMode::resolve_with(dont_clean, coverage, environment(vars)),
            BuildMode {
                clean,
                coverage: instrumented
            }
        );
    }

    #[test]
    fn flags_override_environment() {
        let mode = BuildMode::resolve(true, true);
        assert_eq!(
            mode,
            BuildMode {
                clean: false,
                coverage: true
            }
        );
    }

    #[test]
    fn project_paths_are_rooted_in_the_project() {
        let project = Project::new(PathBuf::from("/work/cc"), Toolchain::default());
        assert_eq!(project.tests_root(), PathBuf::from("/work/cc/compiler_tests"));
        assert_eq!(project.output_root(), PathBuf::from("/work/cc/bin/output"));
        assert_eq!(
            project.junit_report(),
            PathBuf::from("/work/cc/bin/junit_results.xml")
        );
        assert_eq!(
            project.display(Path::new("/work/cc/compiler_tests/a/b.c")),
            "compiler_tests/a/b.c"
        );
        assert_eq!(project.display(Path::new("/elsewhere/b.c")), "/elsewhere/b.c");
    }

    #[rstest]
    #[case(".")]
    #[case("")]
    #[case("compiler_tests")]
    #[case("bin/..")]
    #[case("..")]
    #[case("/")]
    fn output_root_may_not_cover_the_project(#[case] output_dir: &str) {
        let toolchain = Toolchain {
            output_dir: PathBuf::from(output_dir),
            ..Toolchain::default()
        };
        let err = Project::new(PathBuf::from("/work/cc"), toolchain)
            .checked_output_root()
            .unwrap_err();
        assert!(matches!(err, Error::IllegalArguments(_)));
    }

    #[test]
    fn output_root_may_not_cover_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("conf")).unwrap();
        fs::write(dir.path().join("conf/rvtest.yaml"), "output_dir: conf/../conf\n").unwrap();

        let project = Project::load(dir.path(), Some(Path::new("conf/rvtest.yaml"))).unwrap();
        let err = project.checked_output_root().unwrap_err();
        assert!(err.to_string().contains("rvtest.yaml"));
    }

    #[rstest]
    #[case("bin/output", "/work/cc/bin/output")]
    #[case("./bin/./out", "/work/cc/bin/out")]
    #[case("/tmp/rvtest", "/tmp/rvtest")]
    fn separate_output_roots_are_accepted(#[case] output_dir: &str, #[case] expected: &str) {
        let toolchain = Toolchain {
            output_dir: PathBuf::from(output_dir),
            ..Toolchain::default()
        };
        assert_eq!(
            Project::new(PathBuf::from("/work/cc"), toolchain)
                .checked_output_root()
                .unwrap(),
            PathBuf::from(expected)
        );
    }

    #[test]
    fn missing_project_directory_is_reported() {
        let err = Project::load(Path::new("/definitely/not/here"), None).unwrap_err();
        assert!(matches!(err, Error::FileNotFoundError(_)));
    }
}
