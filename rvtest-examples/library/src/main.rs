use std::env;

use anyhow::Context;
use rvtest::{
    commands::Executable,
    utils::writer::{WriteBuffer, Writer},
    CommandBuilder, SuiteBuilder,
};

/// Runs the suite of the compiler project in the current directory (or the
/// one given as first argument) and prints what the harness reported.
fn main() -> anyhow::Result<()> {
    let project_dir = env::args().nth(1).unwrap_or_else(|| String::from("."));
    let mut writer = match Writer::new_with_err(WriteBuffer::Vec(vec![]), WriteBuffer::Vec(vec![]))
    {
        Ok(writer) => writer,
        Err(err) => {
            panic!("Error: {}", err);
        }
    };

    let cmd = SuiteBuilder::default()
        .project_dir(&project_dir)
        .dont_clean(true)
        .try_build()
        .context("failed to build suite command")?;

    let status = cmd.execute(&mut writer)?;

    let content = writer.stripped().context("failed to read from writer")?;
    println!("{content}");
    println!("suite finished with status {status}");

    Ok(())
}
