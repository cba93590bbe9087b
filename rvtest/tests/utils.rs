// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use indoc::indoc;
use rvtest::harness::config::{COVERAGE_ENV, DONT_CLEAN_ENV};
use rvtest::utils;
use rvtest::utils::writer::{WriteBuffer, Writer};
use tempfile::TempDir;

#[non_exhaustive]
pub struct StatusCode;

const RVTEST_TEST_APP_NAME: &str = "rvtest-test";

#[allow(dead_code)]
impl StatusCode {
    pub const SUCCESS: i32 = 0;
    pub const INTERNAL_FAILURE: i32 = -1;
    pub const PREPROCESSOR_ERROR: i32 = -3;
    pub const TEST_FAILURE: i32 = 72;
}

pub fn get_writer() -> Writer {
    Writer::new_with_err(WriteBuffer::Vec(vec![]), WriteBuffer::Vec(vec![]))
        .expect("in-memory buffers are always accepted")
}

pub trait CommandTestRunner {
    fn build_args(&self) -> Vec<String>;

    fn run(&self, writer: &mut Writer) -> i32 {
        let mut app = clap::Command::new(RVTEST_TEST_APP_NAME);

        let command_options = self
            .build_args()
            .into_iter()
            .fold(vec![String::from(RVTEST_TEST_APP_NAME)], |mut res, arg| {
                res.push(arg);
                res
            });

        let commands = utils::get_rvtest_commands();
        let mappings = commands.iter().map(|s| (s.name(), s)).fold(
            HashMap::with_capacity(commands.len()),
            |mut map, entry| {
                map.insert(entry.0, entry.1.as_ref());
                map
            },
        );

        for each in &commands {
            app = app.subcommand(each.command());
        }

        let app = app.get_matches_from(command_options);

        match app.subcommand() {
            Some((name, value)) => match mappings.get(name) {
                Some(command) => match (*command).execute(value, writer) {
                    Err(e) => {
                        writer
                            .write_err(format!("Error occurred {e}"))
                            .expect("failed to write to stderr");

                        StatusCode::INTERNAL_FAILURE
                    }
                    Ok(code) => code,
                },
                None => StatusCode::PREPROCESSOR_ERROR,
            },
            None => StatusCode::PREPROCESSOR_ERROR,
        }
    }
}

/// Runs the `rvtest` binary with `DONT_CLEAN` and `COVERAGE` taken only from
/// `env`, returning its exit code and stdout.
#[allow(dead_code)]
pub fn run_rvtest(args: &[&str], env: &[(&str, &str)]) -> (i32, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_rvtest"))
        .args(args)
        .env_remove(DONT_CLEAN_ENV)
        .env_remove(COVERAGE_ENV)
        .envs(env.iter().copied())
        .output()
        .expect("failed to run rvtest");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).into_owned(),
    )
}

// Stand-ins for the compiler, assembler, linker and simulator. Each stage
// copies its input forward so markers in a test source reach later stages.
const COMPILER: &str = indoc! {r#"
    src="$1"; out="$2"
    echo "compiling $src"
    if grep -q BLOCK_OUTPUT "$src"; then : > bin/output/zz; fi
    if grep -q COMPILE_ERROR "$src"; then echo "error: cannot compile $src" >&2; exit 1; fi
    cp "$src" "$out"
"#};

const ASSEMBLER: &str = indoc! {r#"
    obj="$1"; asm="$2"
    if grep -q ASSEMBLE_ERROR "$asm"; then echo "bad mnemonic" >&2; exit 1; fi
    cp "$asm" "$obj"
"#};

const LINKER: &str = indoc! {r#"
    exe="$1"; obj="$2"; driver="$3"
    if grep -q LINK_ERROR "$obj"; then echo "undefined reference to f" >&2; exit 1; fi
    cat "$obj" "$driver" > "$exe"
"#};

const SIMULATOR: &str = indoc! {r#"
    exe="$1"
    if grep -q SIM_HANG "$exe"; then exec sleep 30; fi
    if grep -q SIM_FAIL "$exe"; then echo "Test function produced 2, expected 5"; exit 3; fi
    echo "bbl loader"
"#};

const BUILD: &str = indoc! {r#"
    echo "$1" >> build.log
"#};

pub const TOOLCHAIN: &str = indoc! {r#"
    compiler:
      program: /bin/sh
      args: ["tools/cc.sh", "{source}", "{assembly}"]
    assembler:
      program: /bin/sh
      args: ["tools/as.sh", "{object}", "{assembly}"]
    linker:
      program: /bin/sh
      args: ["tools/ld.sh", "{executable}", "{object}", "{driver}"]
    simulator:
      program: /bin/sh
      args: ["tools/sim.sh", "{executable}"]
    stage_timeout_secs: 1
"#};

pub const RECORDED_BUILD: &str = indoc! {r#"
    build:
      clean: {program: /bin/sh, args: ["tools/make.sh", "clean"]}
      compile: {program: /bin/sh, args: ["tools/make.sh", "compile"]}
      coverage_compile: {program: /bin/sh, args: ["tools/make.sh", "coverage_compile"]}
      coverage_report: {program: /bin/sh, args: ["tools/make.sh", "coverage_report"]}
"#};

pub const FAILING_BUILD: &str = indoc! {r#"
    build:
      clean: ~
      compile: {program: /bin/sh, args: ["-c", "exit 2"]}
"#};

pub const NO_BUILD: &str = indoc! {r#"
    build:
      clean: ~
      compile: ~
      coverage_compile: ~
      coverage_report: ~
"#};

/// A compiler project in a temporary directory, wired to the fake toolchain.
pub struct FakeProject {
    dir: TempDir,
}

#[allow(dead_code)]
impl FakeProject {
    pub fn new() -> Self {
        Self::with_build(NO_BUILD)
    }

    pub fn with_build(build: &str) -> Self {
        let project = FakeProject {
            dir: tempfile::tempdir().expect("failed to create a temporary project"),
        };
        for (name, script) in [
            ("cc.sh", COMPILER),
            ("as.sh", ASSEMBLER),
            ("ld.sh", LINKER),
            ("sim.sh", SIMULATOR),
            ("make.sh", BUILD),
        ] {
            project.write(&format!("tools/{name}"), script);
        }
        project.write("rvtest.yaml", &format!("{TOOLCHAIN}\n{build}\n"));
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn path_str(&self) -> String {
        self.path().display().to_string()
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path().join(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path().join(relative).exists()
    }

    /// Adds `compiler_tests/<group>/<name>.c` and its driver, returning the
    /// driver path relative to the project.
    pub fn add_case(&self, group: &str, name: &str, body: &str) -> String {
        self.write(&format!("compiler_tests/{group}/{name}.c"), body);
        let driver = format!("compiler_tests/{group}/{name}_driver.c");
        self.write(&driver, "int main() { return !(f() == 5); }\n");
        driver
    }

    pub fn output(&self, group: &str, name: &str, file: &str) -> PathBuf {
        self.path()
            .join("bin/output")
            .join(group)
            .join(format!("{name}.c"))
            .join(file)
    }
}
