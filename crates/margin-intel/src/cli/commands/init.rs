use anyhow::Result;
use clap::Args;
use log::info;
use serde_json::json;

use super::{command_failure, print_envelope};
use crate::config::RuntimePaths;
use crate::mart::{MART_SCHEMA_VERSION, initialize_mart};
use crate::models::QueryEnvelope;

#[derive(Debug, Clone, Args)]
pub struct InitArgs {}

pub fn run(_args: &InitArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let mart_path = &runtime_paths.mart_path;
    initialize_mart(mart_path).map_err(|error| command_failure("init", &error))?;
    info!("mart schema ready at {}", mart_path.display());

    let envelope = QueryEnvelope::ok(
        "init",
        json!({
            "mart_path": mart_path.display().to_string(),
            "schema_version": MART_SCHEMA_VERSION,
        }),
    );
    print_envelope("init", &envelope)
}
