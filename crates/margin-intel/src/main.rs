#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use clap::error::ErrorKind;
use log::{error, info};
use margin_intel::cli::app::{Cli, Command, RuntimeArgs};
use margin_intel::cli::commands;
use margin_intel::config::{MART_PATH_ENV, RuntimePaths};
use margin_intel::models::QueryEnvelopeCommandFailure;

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_INVALID_REQUEST: i32 = 2;
const EXIT_USAGE_ERROR: i32 = 64;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return exit_code_for_parse_error(error),
    };
    let command_name = command_name(&cli.command);
    info!("margin-intel: starting `{command_name}`");

    match execute(cli) {
        Ok(()) => {
            info!("margin-intel: completed `{command_name}` (exit_code={EXIT_SUCCESS})");
            EXIT_SUCCESS
        }
        Err(failure) => {
            let exit_code = classify_runtime_error(&failure);
            error!("margin-intel: failed `{command_name}` (exit_code={exit_code})");
            match failure.downcast_ref::<QueryEnvelopeCommandFailure>() {
                Some(envelope_failure) => println!("{envelope_failure}"),
                None => eprintln!("{failure:#}"),
            }
            exit_code
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Catalog(args) => commands::catalog::run(&args),
        Command::Tool(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::tool::run(&args, &runtime_paths)
        }
        Command::Call(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::call::run(&args, &runtime_paths)
        }
        Command::Serve(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::serve::run(&args, &runtime_paths)
        }
        Command::Init(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::init::run(&args, &runtime_paths)
        }
    }
}

fn classify_runtime_error(error: &anyhow::Error) -> i32 {
    if error
        .downcast_ref::<QueryEnvelopeCommandFailure>()
        .is_some_and(QueryEnvelopeCommandFailure::is_invalid_request)
    {
        EXIT_INVALID_REQUEST
    } else {
        EXIT_RUNTIME_FAILURE
    }
}

fn exit_code_for_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            EXIT_SUCCESS
        }
        _ => {
            let _ = error.print();
            EXIT_USAGE_ERROR
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Tool(args) => args.operation.operation_name(),
        Command::Call(_) => "call",
        Command::Catalog(_) => "catalog",
        Command::Serve(_) => "serve",
        Command::Init(_) => "init",
    }
}

fn resolve_runtime_paths(args: &RuntimeArgs) -> Result<RuntimePaths> {
    let home_dir = match &args.home_dir {
        Some(path) => path.clone(),
        None => std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("HOME is not set; pass --home-dir"))?,
    };

    let cwd = match &args.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    let mart_override = args
        .mart
        .clone()
        .or_else(|| std::env::var_os(MART_PATH_ENV).map(PathBuf::from));

    margin_intel::config::resolve_runtime_paths(&home_dir, &cwd, mart_override.as_deref())
}
