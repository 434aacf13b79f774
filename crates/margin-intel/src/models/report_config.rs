use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{MarginError, MarginResult};
use crate::mart::{DataAccess, Record};

const LOAD_REPORT_PERIODS_SQL: &str =
    "SELECT current_period, comparison_period FROM report_control ORDER BY last_updated_at DESC LIMIT 1";

/// The two periods that period-relative operations compare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriodConfig {
    pub current_period: String,
    pub comparison_period: String,
}

impl ReportPeriodConfig {
    /// Reads the configuration singleton; `None` when the control table is empty.
    pub fn load(data: &mut impl DataAccess) -> MarginResult<Option<Self>> {
        let rows = data
            .execute(LOAD_REPORT_PERIODS_SQL, &[])
            .map_err(|error| error.attributed_to("report-config"))?;
        let Some(row) = rows.into_iter().next() else {
            warn!("report_control has no rows; period defaults will match nothing");
            return Ok(None);
        };

        Ok(Some(Self {
            current_period: text_column(&row, "current_period")?,
            comparison_period: text_column(&row, "comparison_period")?,
        }))
    }
}

fn text_column(row: &Record, column: &str) -> MarginResult<String> {
    row.get(column)
        .and_then(|value| value.as_str())
        .map(ToString::to_string)
        .ok_or_else(|| MarginError::UnexpectedRow {
            operation: "report-config".to_string(),
            column: column.to_string(),
        })
}
