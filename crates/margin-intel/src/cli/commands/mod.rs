pub mod call;
pub mod catalog;
pub mod init;
pub mod serve;
pub mod tool;

use anyhow::{Error, Result};
use log::warn;
use serde_json::json;

use crate::config::RuntimePaths;
use crate::error::MarginError;
use crate::mart::Mart;
use crate::models::{QueryEnvelope, QueryEnvelopeCommandFailure};
use crate::query::{InvocationContext, invoke_on_mart};

/// Runs one named operation against the resolved mart and prints its envelope.
pub(crate) fn run_operation(
    name: &str,
    arguments: serde_json::Value,
    runtime_paths: &RuntimePaths,
) -> Result<()> {
    let mart = Mart::new(&runtime_paths.mart_path);
    let envelope = invoke_on_mart(&mart, &InvocationContext::now(), name, arguments)
        .map(|output| output.into_envelope())
        .map_err(|error| command_failure(name, &error))?;
    print_envelope(name, &envelope)
}

pub(crate) fn command_failure(command: &str, error: &MarginError) -> Error {
    warn!("`{command}` failed: {error}");
    Error::new(QueryEnvelopeCommandFailure::from_margin_error(command, error))
}

pub(crate) fn encode_envelope(command: &str, envelope: &QueryEnvelope) -> Result<String> {
    serde_json::to_string(envelope).map_err(|error| {
        Error::new(QueryEnvelopeCommandFailure::new(
            QueryEnvelope::error(
                command,
                "response_encode_failed",
                "failed to encode query response",
            )
            .with_error_details(json!({ "cause": format!("{error:#}") })),
        ))
    })
}

pub(crate) fn print_envelope(command: &str, envelope: &QueryEnvelope) -> Result<()> {
    let encoded = encode_envelope(command, envelope)?;
    println!("{encoded}");
    Ok(())
}
