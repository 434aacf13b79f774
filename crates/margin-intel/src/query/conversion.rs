//! Revenue-status classification for large TFA placements.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{MarginError, MarginResult};
use crate::mart::Record;

const OPERATION: &str = "tfa-conversion-status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionStatus {
    #[serde(rename = "New Account")]
    NewAccount,
    #[serde(rename = "No Revenue Yet")]
    NoRevenueYet,
    #[serde(rename = "Growing")]
    Growing,
    #[serde(rename = "Flat / Declining")]
    FlatOrDeclining,
}

impl ConversionStatus {
    /// First match wins: absent prior business, then zero current revenue, then growth.
    #[must_use]
    pub fn classify(prior_revenue: Option<f64>, current_revenue: f64) -> Self {
        match prior_revenue {
            None => Self::NewAccount,
            Some(_) if current_revenue == 0.0 => Self::NoRevenueYet,
            Some(prior) if current_revenue > prior => Self::Growing,
            Some(_) => Self::FlatOrDeclining,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NewAccount => "New Account",
            Self::NoRevenueYet => "No Revenue Yet",
            Self::Growing => "Growing",
            Self::FlatOrDeclining => "Flat / Declining",
        }
    }
}

/// Replaces the `has_prior` flag on each placement row with a `revenue_status` label.
pub fn classify_rows(rows: Vec<Record>) -> MarginResult<Vec<Record>> {
    rows.into_iter().map(classify_row).collect()
}

fn classify_row(mut row: Record) -> MarginResult<Record> {
    let has_prior = row
        .shift_remove("has_prior")
        .as_ref()
        .and_then(flag_value)
        .ok_or_else(|| unexpected("has_prior"))?;
    let current_revenue = number_column(&row, "current_revenue")?;
    let prior_revenue = number_column(&row, "prior_revenue")?;

    let status = ConversionStatus::classify(has_prior.then_some(prior_revenue), current_revenue);
    row.insert("revenue_status".to_string(), json!(status.label()));
    Ok(row)
}

fn flag_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_i64().map(|flag| flag != 0),
        _ => None,
    }
}

fn number_column(row: &Record, column: &str) -> MarginResult<f64> {
    row.get(column)
        .and_then(Value::as_f64)
        .ok_or_else(|| unexpected(column))
}

fn unexpected(column: &str) -> MarginError {
    MarginError::UnexpectedRow {
        operation: OPERATION.to_string(),
        column: column.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ConversionStatus, classify_rows};
    use crate::error::MarginError;
    use crate::mart::Record;

    fn placement(current: f64, prior: f64, has_prior: i64) -> Record {
        let value = json!({
            "customer": "ACME FRAMING",
            "region": "Texas",
            "placement_cost": 1200.0,
            "current_revenue": current,
            "current_margin_pct": null,
            "prior_revenue": prior,
            "has_prior": has_prior,
        });
        match value {
            serde_json::Value::Object(record) => record,
            _ => unreachable!("json! object literal"),
        }
    }

    #[test]
    fn missing_prior_wins_over_zero_current_revenue() {
        assert_eq!(
            ConversionStatus::classify(None, 0.0),
            ConversionStatus::NewAccount
        );
        assert_eq!(
            ConversionStatus::classify(None, 5_000.0),
            ConversionStatus::NewAccount
        );
    }

    #[test]
    fn zero_current_revenue_with_prior_is_no_revenue_yet() {
        assert_eq!(
            ConversionStatus::classify(Some(0.0), 0.0),
            ConversionStatus::NoRevenueYet
        );
        assert_eq!(
            ConversionStatus::classify(Some(100.0), 0.0),
            ConversionStatus::NoRevenueYet
        );
    }

    #[test]
    fn growth_requires_strictly_more_than_prior() {
        assert_eq!(
            ConversionStatus::classify(Some(100.0), 150.0),
            ConversionStatus::Growing
        );
        assert_eq!(
            ConversionStatus::classify(Some(100.0), 100.0),
            ConversionStatus::FlatOrDeclining
        );
        assert_eq!(
            ConversionStatus::classify(Some(100.0), 40.0),
            ConversionStatus::FlatOrDeclining
        );
    }

    #[test]
    fn labels_match_serialized_names() {
        for status in [
            ConversionStatus::NewAccount,
            ConversionStatus::NoRevenueYet,
            ConversionStatus::Growing,
            ConversionStatus::FlatOrDeclining,
        ] {
            assert_eq!(
                serde_json::to_value(status).expect("status should serialize"),
                json!(status.label())
            );
        }
    }

    #[test]
    fn classified_rows_drop_the_prior_flag_and_append_status() {
        let rows = classify_rows(vec![placement(0.0, 0.0, 0), placement(150.0, 100.0, 1)])
            .expect("rows should classify");

        assert_eq!(rows[0].get("revenue_status"), Some(&json!("New Account")));
        assert_eq!(rows[1].get("revenue_status"), Some(&json!("Growing")));
        let columns = rows[1].keys().map(String::as_str).collect::<Vec<_>>();
        assert_eq!(
            columns,
            vec![
                "customer",
                "region",
                "placement_cost",
                "current_revenue",
                "current_margin_pct",
                "prior_revenue",
                "revenue_status"
            ]
        );
    }

    #[test]
    fn rows_without_revenue_columns_are_rejected() {
        let mut row = placement(10.0, 5.0, 1);
        row.shift_remove("current_revenue");
        let error = classify_rows(vec![row]).expect_err("missing column must fail");
        assert!(matches!(
            error,
            MarginError::UnexpectedRow { ref column, .. } if column == "current_revenue"
        ));
    }
}
