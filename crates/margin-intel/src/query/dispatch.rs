use std::time::Instant;

use log::debug;
use serde_json::{Value, json};
use time::Date;

use super::args::OperationArgs;
use super::catalog::{AssembledStatement, OperationDescriptor, RowTransform, find_operation};
use super::conversion::classify_rows;
use super::sql::{count_placeholders, ensure_read_only};
use crate::error::{MarginError, MarginResult};
use crate::mart::{DataAccess, Mart, Record};
use crate::models::{QueryEnvelope, ReportPeriodConfig};
use crate::utils::time::today_utc;

/// Per-call ambient inputs that are not caller parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationContext {
    pub today: Date,
}

impl InvocationContext {
    #[must_use]
    pub fn now() -> Self {
        Self { today: today_utc() }
    }
}

/// A catalog operation paired with its decoded arguments.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub operation: &'static OperationDescriptor,
    pub args: OperationArgs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationOutput {
    pub operation: &'static str,
    pub rows: Vec<Record>,
    pub params_count: usize,
    pub duration_ms: u64,
}

impl OperationOutput {
    #[must_use]
    pub fn into_envelope(self) -> QueryEnvelope {
        let row_count = self.rows.len();
        let envelope = QueryEnvelope::ok(self.operation, json!({ "rows": self.rows }))
            .with_meta("row_count", json!(row_count))
            .with_meta("params_count", json!(self.params_count))
            .with_meta("duration_ms", json!(self.duration_ms));
        if row_count == 0 {
            envelope.with_warning("no_rows", "no rows matched the supplied filters")
        } else {
            envelope
        }
    }
}

impl Invocation {
    /// Looks up `name` and decodes `arguments` without touching the mart.
    pub fn resolve(name: &str, arguments: Value) -> MarginResult<Self> {
        let operation = find_operation(name).ok_or_else(|| MarginError::UnknownOperation {
            name: name.to_string(),
        })?;
        let args = operation.args.parse(operation.name, arguments)?;
        Ok(Self { operation, args })
    }

    /// Reads the report periods when required, then issues the operation's one statement.
    pub fn run(
        &self,
        data: &mut impl DataAccess,
        context: &InvocationContext,
    ) -> MarginResult<OperationOutput> {
        let started = Instant::now();
        let operation = self.operation;
        let config = if operation.needs_report_config() {
            ReportPeriodConfig::load(data)?
        } else {
            None
        };

        let statement = operation.assemble(&self.args, config.as_ref(), context.today);
        verify_statement(operation, &statement)?;
        debug!(
            "operation={} params={} config_period={}",
            operation.name,
            statement.params.len(),
            config
                .as_ref()
                .map_or("<none>", |config| config.current_period.as_str())
        );

        let rows = data
            .execute(&statement.sql, &statement.params)
            .map_err(|error| error.attributed_to(operation.name))?;
        let rows = match operation.transform {
            RowTransform::None => rows,
            RowTransform::ConversionStatus => classify_rows(rows)?,
        };

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(
            "operation={} rows={} duration_ms={duration_ms}",
            operation.name,
            rows.len()
        );
        Ok(OperationOutput {
            operation: operation.name,
            rows,
            params_count: statement.params.len(),
            duration_ms,
        })
    }
}

fn verify_statement(
    operation: &OperationDescriptor,
    statement: &AssembledStatement,
) -> MarginResult<()> {
    let placeholders = count_placeholders(&statement.sql);
    if placeholders != statement.params.len() {
        return Err(MarginError::CatalogDefect {
            operation: operation.name.to_string(),
            detail: format!(
                "{placeholders} placeholders but {} bound values",
                statement.params.len()
            ),
        });
    }
    ensure_read_only(&statement.sql).map_err(|violation| MarginError::CatalogDefect {
        operation: operation.name.to_string(),
        detail: violation.to_string(),
    })
}

/// Dispatch by name within an already-acquired session.
pub fn invoke(
    data: &mut impl DataAccess,
    context: &InvocationContext,
    name: &str,
    arguments: Value,
) -> MarginResult<OperationOutput> {
    Invocation::resolve(name, arguments)?.run(data, context)
}

/// Dispatch by name with one mart session scoped to the call.
pub fn invoke_on_mart(
    mart: &Mart,
    context: &InvocationContext,
    name: &str,
    arguments: Value,
) -> MarginResult<OperationOutput> {
    let invocation = Invocation::resolve(name, arguments)?;
    mart.with_session(|session| invocation.run(session, context))
}
