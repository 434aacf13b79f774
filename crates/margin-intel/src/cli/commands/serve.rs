use std::io::{self, BufRead, Write};

use anyhow::Result;
use clap::Args;
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{Value, json};

use super::catalog::catalog_envelope;
use super::encode_envelope;
use crate::config::RuntimePaths;
use crate::mart::Mart;
use crate::models::QueryEnvelope;
use crate::query::{InvocationContext, invoke_on_mart};

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {}

#[derive(Debug, Deserialize)]
struct ServeRequest {
    #[serde(default)]
    id: Option<Value>,

    #[serde(flatten)]
    method: ServeMethod,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
enum ServeMethod {
    ListOperations,
    Call {
        operation: String,
        #[serde(default)]
        arguments: Value,
    },
    Shutdown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeSummary {
    pub requests: usize,
    pub failed: usize,
}

pub fn run(_args: &ServeArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let mart = Mart::new(runtime_paths.mart_path.clone());
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let summary = serve_lines(stdin.lock(), &mut stdout, &mart)?;
    info!(
        "serve finished requests={} failed={}",
        summary.requests, summary.failed
    );
    Ok(())
}

/// Answers one envelope line per request line until `shutdown` or end of input.
///
/// Every `call` opens and releases its own mart session.
pub fn serve_lines(
    mut input: impl BufRead,
    output: &mut impl Write,
    mart: &Mart,
) -> Result<ServeSummary> {
    let mut summary = ServeSummary::default();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = input.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        if buffer.trim().is_empty() {
            continue;
        }
        summary.requests += 1;

        let request: ServeRequest = match serde_json::from_str(buffer.trim()) {
            Ok(request) => request,
            Err(error) => {
                summary.failed += 1;
                warn!("malformed serve request: {error}");
                let envelope = QueryEnvelope::error(
                    "serve",
                    "request_malformed",
                    "request is not a valid serve request",
                )
                .with_error_details(json!({ "cause": error.to_string() }));
                write_line(output, &envelope)?;
                continue;
            }
        };

        let envelope = match request.method {
            ServeMethod::Shutdown => {
                debug!("serve shutdown requested");
                write_line(
                    output,
                    &with_request_id(QueryEnvelope::ok("shutdown", json!({})), request.id),
                )?;
                break;
            }
            ServeMethod::ListOperations => catalog_envelope(false),
            ServeMethod::Call {
                operation,
                arguments,
            } => match invoke_on_mart(mart, &InvocationContext::now(), &operation, arguments) {
                Ok(output) => output.into_envelope(),
                Err(error) => {
                    summary.failed += 1;
                    warn!("`{operation}` failed: {error}");
                    QueryEnvelope::from_margin_error(operation, &error)
                }
            },
        };
        write_line(output, &with_request_id(envelope, request.id))?;
    }

    Ok(summary)
}

fn with_request_id(envelope: QueryEnvelope, id: Option<Value>) -> QueryEnvelope {
    match id {
        Some(id) => envelope.with_meta("request_id", id),
        None => envelope,
    }
}

fn write_line(output: &mut impl Write, envelope: &QueryEnvelope) -> Result<()> {
    let encoded = encode_envelope(&envelope.command, envelope)?;
    writeln!(output, "{encoded}")?;
    output.flush()?;
    Ok(())
}
