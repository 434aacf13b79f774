use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarginError {
    #[error("margin mart unavailable at {path}: {source}")]
    MartUnavailable {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("cannot create mart directory {path}: {source}")]
    MartDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("statement for `{operation}` failed: {source}")]
    Statement {
        operation: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("catalog defect in `{operation}`: {detail}")]
    CatalogDefect { operation: String, detail: String },

    #[error("unknown operation `{name}`")]
    UnknownOperation { name: String },

    #[error("invalid arguments for `{operation}`: {message}")]
    InvalidArguments { operation: String, message: String },

    #[error("unexpected row shape from `{operation}`: missing or mistyped column `{column}`")]
    UnexpectedRow { operation: String, column: String },

    #[error("serialization error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl MarginError {
    /// Stable machine-readable code carried in error envelopes.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MartUnavailable { .. } | Self::MartDirectory { .. } => "mart_unavailable",
            Self::Statement { .. } => "statement_failed",
            Self::CatalogDefect { .. } => "catalog_defect",
            Self::UnknownOperation { .. } => "unknown_operation",
            Self::InvalidArguments { .. } => "invalid_arguments",
            Self::UnexpectedRow { .. } => "unexpected_row",
            Self::Encode(_) => "response_encode_failed",
        }
    }

    /// Re-labels a statement failure with the catalog operation that issued it.
    #[must_use]
    pub fn attributed_to(self, operation: &str) -> Self {
        match self {
            Self::Statement { source, .. } => Self::Statement {
                operation: operation.to_string(),
                source,
            },
            other => other,
        }
    }

    /// Caller-side mistakes, as opposed to mart or catalog failures.
    #[must_use]
    pub const fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            Self::UnknownOperation { .. } | Self::InvalidArguments { .. }
        )
    }
}

pub type MarginResult<T> = Result<T, MarginError>;

#[cfg(test)]
mod tests {
    use super::MarginError;

    #[test]
    fn invalid_request_errors_are_distinguished_from_runtime_failures() {
        let unknown = MarginError::UnknownOperation {
            name: "get-everything".to_string(),
        };
        assert!(unknown.is_invalid_request());
        assert_eq!(unknown.code(), "unknown_operation");

        let defect = MarginError::CatalogDefect {
            operation: "top-customers".to_string(),
            detail: "2 placeholders, 3 bound values".to_string(),
        };
        assert!(!defect.is_invalid_request());
        assert_eq!(defect.code(), "catalog_defect");
        assert!(defect.to_string().contains("top-customers"));
    }
}
