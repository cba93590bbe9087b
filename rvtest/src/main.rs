use std::collections::HashMap;
use std::process::exit;

use rvtest::command::Command;
use rvtest::commands::{verbosity, APP_NAME, APP_VERSION, VERBOSE};
use rvtest::utils::get_rvtest_commands;
use rvtest::utils::writer::Writer;
use simple_logger::SimpleLogger;

fn main() {
    let mut app = clap::Command::new(APP_NAME)
        .version(APP_VERSION)
        .about(
            r#"
  rvtest drives a C compiler targeting RISC-V through its test suite. Every
  test case is compiled by the compiler-under-test, assembled and linked with
  the RISC-V GNU toolchain, then run on an instruction-set simulator. Each
  stage has a time limit and leaves its logs next to the case's artifacts."#,
        )
        .arg_required_else_help(true);

    let commands: Vec<Box<dyn Command>> = get_rvtest_commands();
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

    let help = app.render_usage();
    let app = app.get_matches();

    match app.subcommand() {
        Some((name, value)) => {
            if let Some(command) = mappings.get(name) {
                let level = verbosity(value.get_count(VERBOSE.0));
                if let Err(e) = SimpleLogger::new().with_level(level).init() {
                    eprintln!("Unable to initialise logging {e}");
                }

                let mut writer = Writer::default();
                match (*command).execute(value, &mut writer) {
                    Err(e) => {
                        writer
                            .write_err(format!("Error occurred {e}"))
                            .expect("failed to write to stderr");

                        exit(-1);
                    }
                    Ok(code) => exit(code),
                }
            } else {
                println!("{help}");
            }
        }
        None => {
            println!("{help}");
        }
    }
}
