use crate::{command::Command, commands};

pub mod writer;

pub fn get_rvtest_commands() -> Vec<Box<dyn Command>> {
    vec![
        Box::new(commands::suite::Suite::new()),
        Box::new(commands::single::Single::new()),
    ]
}
