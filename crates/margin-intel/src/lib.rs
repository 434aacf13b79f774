#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod mart;
pub mod models;
pub mod query;
pub mod utils;

pub use cli::app::{Cli, Command};
pub use error::{MarginError, MarginResult};
