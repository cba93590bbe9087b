// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

pub mod command;
pub mod commands;
mod errors;
pub mod harness;
pub mod reporters;
pub mod utils;

pub use crate::commands::single::SingleBuilder;
pub use crate::commands::suite::SuiteBuilder;
pub use crate::commands::{CommandBuilder, Executable};
pub use crate::errors::{Error, Result};
