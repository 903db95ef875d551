//! Kiln CLI: the `kiln` binary's library half.
//!
//! - [`cli`] - argument definitions (clap)
//! - [`config`] - kiln.config.json loading, validation and resolution
//! - [`commands`] - `dev` and `build`
//! - [`server`] - axum adapter around the engine's dev server
//! - [`error`] - error types with actionable hints
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - status messages and summaries on stderr
//!
//! # Example
//!
//! ```rust,no_run
//! use kiln_cli::{cli::BuildArgs, commands};
//! use kiln_engine::CancellationToken;
//!
//! # async fn demo() -> kiln_cli::Result<()> {
//! let summary = commands::build::run(&BuildArgs::default(), CancellationToken::new()).await?;
//! println!("wrote {} files", summary.written);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod server;
pub mod ui;

pub use error::{BuildError, CliError, ConfigError, Result, ResultExt};
