use anyhow::Result;
use clap::Args;
use serde_json::Value;

use super::{command_failure, run_operation};
use crate::config::RuntimePaths;
use crate::error::MarginError;

#[derive(Debug, Clone, Args)]
pub struct CallArgs {
    /// Catalog operation name, e.g. `top-customers`.
    #[arg(value_name = "OPERATION")]
    pub operation: String,

    /// JSON object of arguments; omitted means all defaults.
    #[arg(long = "args", value_name = "JSON")]
    pub arguments: Option<String>,
}

pub fn run(args: &CallArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let arguments = parse_arguments(&args.operation, args.arguments.as_deref())
        .map_err(|error| command_failure(&args.operation, &error))?;
    run_operation(&args.operation, arguments, runtime_paths)
}

fn parse_arguments(operation: &str, raw: Option<&str>) -> Result<Value, MarginError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Value::Null),
        Some(raw) => serde_json::from_str(raw).map_err(|error| MarginError::InvalidArguments {
            operation: operation.to_string(),
            message: format!("arguments are not valid JSON: {error}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::parse_arguments;

    #[test]
    fn absent_or_blank_arguments_are_null() {
        assert_eq!(
            parse_arguments("margin-summary", None).expect("absent args parse"),
            Value::Null
        );
        assert_eq!(
            parse_arguments("margin-summary", Some("  ")).expect("blank args parse"),
            Value::Null
        );
    }

    #[test]
    fn json_arguments_are_decoded() {
        assert_eq!(
            parse_arguments("margin-history", Some(r#"{"months": 12}"#)).expect("json parses"),
            json!({"months": 12})
        );
    }

    #[test]
    fn malformed_json_is_an_invalid_request() {
        let error = parse_arguments("margin-history", Some("{months: 12"))
            .expect_err("malformed json must fail");
        assert!(error.is_invalid_request());
        assert_eq!(error.code(), "invalid_arguments");
    }
}
