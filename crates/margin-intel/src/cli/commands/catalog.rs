use anyhow::Result;
use clap::Args;
use serde_json::{Value, json};

use super::print_envelope;
use crate::models::QueryEnvelope;
use crate::query::OPERATIONS;

#[derive(Debug, Clone, Args)]
pub struct CatalogArgs {
    /// Only names, descriptions and backing sources.
    #[arg(long, default_value_t = false)]
    pub compact: bool,
}

pub fn run(args: &CatalogArgs) -> Result<()> {
    print_envelope("catalog", &catalog_envelope(args.compact))
}

#[must_use]
pub fn catalog_envelope(compact: bool) -> QueryEnvelope {
    let operations = OPERATIONS
        .iter()
        .map(|operation| {
            if compact {
                json!({
                    "name": operation.name,
                    "description": operation.description,
                    "source": operation.source,
                })
            } else {
                operation.describe()
            }
        })
        .collect::<Vec<Value>>();

    QueryEnvelope::ok("catalog", json!({ "operations": operations }))
        .with_meta("operation_count", json!(OPERATIONS.len()))
}

#[cfg(test)]
mod tests {
    use super::catalog_envelope;

    #[test]
    fn full_catalog_lists_input_schemas_and_limits() {
        let envelope = catalog_envelope(false);
        let operations = envelope
            .data
            .as_ref()
            .and_then(|data| data.get("operations"))
            .and_then(|operations| operations.as_array())
            .expect("catalog should list operations");
        assert_eq!(operations.len(), 13);
        assert!(
            operations
                .iter()
                .all(|operation| operation.get("input_schema").is_some())
        );
        let top_customers = operations
            .iter()
            .find(|operation| operation.get("name") == Some(&serde_json::json!("top-customers")))
            .expect("top-customers should be listed");
        assert_eq!(
            top_customers.pointer("/limit/max"),
            Some(&serde_json::json!(100))
        );
    }

    #[test]
    fn compact_catalog_omits_schemas() {
        let envelope = catalog_envelope(true);
        let first = envelope
            .data
            .as_ref()
            .and_then(|data| data.pointer("/operations/0"))
            .expect("catalog should list operations");
        assert_eq!(
            first.get("name").and_then(|name| name.as_str()),
            Some("margin-summary")
        );
        assert!(first.get("input_schema").is_none());
    }
}
