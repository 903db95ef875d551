use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the development server
    ///
    /// Every request is resolved through the mount table. Static mounts are
    /// served as-is; other mounts go through the configured loaders.
    Dev(DevArgs),

    /// Build the project into an output directory
    ///
    /// The output directory is emptied first. Static mounts are copied and
    /// every other file goes through load and transform.
    Build(BuildArgs),
}

/// Arguments for `kiln dev`.
#[derive(Args, Debug, Clone, Default)]
pub struct DevArgs {
    /// Path to the config file
    ///
    /// Defaults to kiln.config.json (or kiln.config.toml) in the project
    /// directory. A path given here must exist.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Address to bind (overrides server.host)
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Project directory
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}

/// Arguments for `kiln build`.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Path to the config file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output directory (overrides build.outDir)
    ///
    /// Relative paths are resolved inside the configured backend. Everything
    /// already in the directory is deleted.
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Build in development mode
    ///
    /// Loaders and transforms run with is_dev set, so the css plugin leaves
    /// stylesheets unminified unless `minify` is configured.
    #[arg(long)]
    pub dev: bool,

    /// Project directory
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}
