pub mod build;
pub mod config;
pub mod discovery;
pub mod executor;
pub mod layout;
pub mod report;
pub mod stage;
