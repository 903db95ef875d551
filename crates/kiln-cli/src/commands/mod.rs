//! Command implementations for the kiln CLI.
//!
//! - [`build`] - write the project to an output directory
//! - [`dev`] - serve the project over HTTP
//!
//! Each command provides an `execute` function that takes the parsed
//! arguments and returns a Result.

pub mod build;
pub mod dev;
pub(crate) mod utils;

pub use build::execute as build_execute;
pub use dev::execute as dev_execute;
