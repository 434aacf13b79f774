use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::MarginError;
use crate::utils::time::{format_unix_ms, unix_timestamp_millis};

pub const QUERY_ENVELOPE_SCHEMA_VERSION: &str = "margin-intel.query-envelope.v1";

pub type QueryEnvelopeMeta = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEnvelopeWarning {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEnvelopeError {
    pub code: String,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Response wrapper for every command and every served request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEnvelope {
    pub ok: bool,
    pub command: String,
    pub generated_at_utc: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    pub meta: QueryEnvelopeMeta,
    pub warnings: Vec<QueryEnvelopeWarning>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<QueryEnvelopeError>,
}

/// An `anyhow`-carriable failure whose Display is the JSON error envelope.
#[derive(Debug, Clone)]
pub struct QueryEnvelopeCommandFailure {
    envelope: QueryEnvelope,
    invalid_request: bool,
}

impl QueryEnvelopeCommandFailure {
    #[must_use]
    pub fn new(envelope: QueryEnvelope) -> Self {
        Self {
            envelope,
            invalid_request: false,
        }
    }

    #[must_use]
    pub fn from_margin_error(command: &str, error: &MarginError) -> Self {
        Self {
            envelope: QueryEnvelope::from_margin_error(command, error),
            invalid_request: error.is_invalid_request(),
        }
    }

    #[must_use]
    pub fn envelope(&self) -> &QueryEnvelope {
        &self.envelope
    }

    #[must_use]
    pub fn is_invalid_request(&self) -> bool {
        self.invalid_request
    }
}

impl Display for QueryEnvelopeCommandFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(&self.envelope) {
            Ok(encoded) => f.write_str(&encoded),
            Err(_) => f.write_str("query envelope serialization failure"),
        }
    }
}

impl std::error::Error for QueryEnvelopeCommandFailure {}

impl QueryEnvelope {
    #[must_use]
    pub fn ok(command: impl Into<String>, data: Value) -> Self {
        Self::base(command, true).with_data(data)
    }

    #[must_use]
    pub fn error(
        command: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut envelope = Self::base(command, false);
        envelope.error = Some(QueryEnvelopeError {
            code: code.into(),
            message: message.into(),
            details: None,
        });
        envelope
    }

    #[must_use]
    pub fn from_margin_error(command: impl Into<String>, error: &MarginError) -> Self {
        let details = match error {
            MarginError::MartUnavailable { path, .. } => Some(json!({ "mart_path": path })),
            MarginError::MartDirectory { path, source } => Some(json!({
                "mart_path": path,
                "cause": source.to_string(),
            })),
            MarginError::Statement { operation, source } => Some(json!({
                "operation": operation,
                "cause": source.to_string(),
            })),
            MarginError::CatalogDefect { operation, detail } => Some(json!({
                "operation": operation,
                "detail": detail,
            })),
            MarginError::UnknownOperation { name } => Some(json!({ "operation": name })),
            MarginError::InvalidArguments { operation, .. }
            | MarginError::UnexpectedRow { operation, .. } => {
                Some(json!({ "operation": operation }))
            }
            MarginError::Encode(_) => None,
        };
        let envelope = Self::error(command, error.code(), error.to_string());
        match details {
            Some(details) => envelope.with_error_details(details),
            None => envelope,
        }
    }

    fn base(command: impl Into<String>, ok: bool) -> Self {
        let mut meta = QueryEnvelopeMeta::new();
        meta.insert(
            "schema_version".to_string(),
            json!(QUERY_ENVELOPE_SCHEMA_VERSION),
        );

        Self {
            ok,
            command: command.into(),
            generated_at_utc: format_unix_ms(unix_timestamp_millis()),
            data: None,
            meta,
            warnings: Vec::new(),
            error: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_warning(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.warnings.push(QueryEnvelopeWarning {
            code: code.into(),
            message: message.into(),
        });
        self
    }

    #[must_use]
    pub fn with_error_details(mut self, details: Value) -> Self {
        if let Some(error) = self.error.as_mut() {
            error.details = Some(details);
        }
        self
    }
}
