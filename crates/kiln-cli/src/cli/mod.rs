//! Command-line interface definition for kiln.
//!
//! # Command Structure
//!
//! - `kiln dev` - serve the project through the plugin pipeline
//! - `kiln build` - write the whole project to an output directory

mod commands;

use clap::Parser;

pub use commands::{BuildArgs, Command, DevArgs};

/// Kiln - a dev server and static builder over a plugin pipeline
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "A dev server and static builder over a plugin pipeline",
    long_about = "Kiln serves a project's files through loader and transform plugins while\n\
                  you work, and writes the same output to a directory for deployment."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    ///
    /// Shows mount resolution, plugin selection and cache decisions for
    /// every request.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
