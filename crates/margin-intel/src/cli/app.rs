use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::commands::{
    call::CallArgs, catalog::CatalogArgs, init::InitArgs, serve::ServeArgs, tool::ToolArgs,
};

#[derive(Debug, Parser)]
#[command(
    name = "margin-intel",
    version,
    about = "Read-only margin intelligence queries over the reporting mart"
)]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, global = true, value_name = "PATH")]
    pub home_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub cwd: Option<PathBuf>,

    /// Mart file; falls back to $MARGIN_INTEL_MART, then ~/.margin-intel/mart.sqlite.
    #[arg(long, global = true, value_name = "PATH")]
    pub mart: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one operation with typed flags.
    Tool(ToolArgs),
    /// Run an operation by name with JSON arguments.
    Call(CallArgs),
    /// List every operation with its parameter schema.
    Catalog(CatalogArgs),
    /// Answer line-delimited JSON requests on stdin.
    Serve(ServeArgs),
    /// Create the mart schema at the resolved mart path.
    Init(InitArgs),
}
