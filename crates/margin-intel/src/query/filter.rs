//! Predicate assembly for optional caller filters.
//!
//! Every predicate that binds a value contributes exactly one `?` per value it pushes,
//! so the fragment list and the value list always stay positionally aligned.

use rusqlite::types::Value as SqlValue;

/// Exclusions applied by every core business operation, independent of caller input.
pub const CORE_EXCLUSIONS: &[&str] = &["NOT is_tfa", "NOT is_service", "NOT is_period_crossover"];

/// Closed clamp range for a numeric limit, with the value used when the caller omits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitRange {
    pub default: i64,
    pub min: i64,
    pub max: i64,
}

impl LimitRange {
    #[must_use]
    pub const fn new(default: i64, min: i64, max: i64) -> Self {
        Self { default, min, max }
    }

    /// Out-of-range values snap to the nearest bound; nothing is rejected.
    #[must_use]
    pub fn clamp(self, requested: Option<i64>) -> i64 {
        requested.unwrap_or(self.default).clamp(self.min, self.max)
    }
}

/// Ordered predicate fragments plus the values bound to their placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub predicates: Vec<String>,
    pub values: Vec<SqlValue>,
}

impl Filter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    #[must_use]
    pub fn where_sql(&self) -> String {
        self.predicates.join(" AND ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    filter: Filter,
}

impl FilterBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A fixed predicate with no bound values.
    pub fn literal(&mut self, predicate: &str) -> &mut Self {
        self.filter.predicates.push(predicate.to_string());
        self
    }

    pub fn core_exclusions(&mut self) -> &mut Self {
        for predicate in CORE_EXCLUSIONS {
            self.literal(predicate);
        }
        self
    }

    /// Equality on `period_month`, falling back to the configured current period.
    ///
    /// With neither a requested nor a configured period the predicate binds NULL and
    /// matches no rows.
    pub fn period(&mut self, requested: Option<&str>, configured_current: Option<&str>) -> &mut Self {
        let period = supplied(requested).or(configured_current);
        self.bind(
            "period_month = ?",
            period.map_or(SqlValue::Null, |value| SqlValue::Text(value.to_string())),
        )
    }

    /// Lower bound on `period_month` (periods sort lexically).
    pub fn period_at_least(&mut self, cutoff: &str) -> &mut Self {
        self.bind("period_month >= ?", SqlValue::Text(cutoff.to_string()))
    }

    pub fn equals_ignore_case(&mut self, column: &str, value: Option<&str>) -> &mut Self {
        match supplied(value) {
            Some(value) => self.bind(
                &format!("UPPER({column}) = UPPER(?)"),
                SqlValue::Text(value.to_string()),
            ),
            None => self,
        }
    }

    /// Case-insensitive substring match across `columns`, OR-combined.
    pub fn contains_ignore_case(&mut self, columns: &[&str], term: Option<&str>) -> &mut Self {
        let Some(term) = supplied(term) else {
            return self;
        };
        if columns.is_empty() {
            return self;
        }

        let pattern = format!("%{term}%");
        let alternatives = columns
            .iter()
            .map(|column| format!("UPPER({column}) LIKE UPPER(?)"))
            .collect::<Vec<_>>();
        let predicate = if alternatives.len() == 1 {
            alternatives.join("")
        } else {
            format!("({})", alternatives.join(" OR "))
        };
        self.filter.predicates.push(predicate);
        self.filter
            .values
            .extend(columns.iter().map(|_| SqlValue::Text(pattern.clone())));
        self
    }

    /// Same as [`Self::contains_ignore_case`] for a single column, but an empty term still
    /// binds `%%` and therefore matches every row.
    pub fn contains_required(&mut self, column: &str, term: &str) -> &mut Self {
        self.bind(
            &format!("UPPER({column}) LIKE UPPER(?)"),
            SqlValue::Text(format!("%{term}%")),
        )
    }

    fn bind(&mut self, predicate: &str, value: SqlValue) -> &mut Self {
        self.filter.predicates.push(predicate.to_string());
        self.filter.values.push(value);
        self
    }

    #[must_use]
    pub fn build(&self) -> Filter {
        self.filter.clone()
    }
}

fn supplied(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}
