//! SQLite margin mart: schema bootstrap, read-only sessions, and row decoding.

use std::path::{Path, PathBuf};

use log::debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, params, params_from_iter};
use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{MarginError, MarginResult};

pub const MART_SCHEMA_VERSION: &str = "margin-mart.sqlite.v1";
pub const MARGIN_BASE_TABLE: &str = "margin_base";
pub const REPORT_CONTROL_TABLE: &str = "report_control";
pub const MARGIN_SUMMARY_TABLE: &str = "margin_summary";
pub const CHANNEL_MARGIN_TABLE: &str = "channel_margin";
pub const REGIONAL_MARGIN_TABLE: &str = "regional_margin";
pub const TFA_DETAIL_TABLE: &str = "tfa_detail";
pub const PRICE_REALIZATION_TABLE: &str = "price_realization";
pub const MARGIN_BRIDGE_TABLE: &str = "margin_bridge";
pub const SCHEMA_META_TABLE: &str = "mart_schema_meta";

/// One result row, keyed by column name in the order the engine reported columns.
pub type Record = Map<String, Value>;

const CREATE_MARGIN_BASE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS margin_base (
    period_month TEXT NOT NULL,
    parentname TEXT NOT NULL,
    customer_type TEXT,
    customer_subtype TEXT,
    customer_tier TEXT,
    price_branch_region TEXT,
    item_sn2 TEXT,
    item_name TEXT,
    master2 TEXT,
    gl_code TEXT,
    sales_amt REAL NOT NULL DEFAULT 0,
    cogs_amt REAL NOT NULL DEFAULT 0,
    sales_qty REAL NOT NULL DEFAULT 0,
    is_tfa INTEGER NOT NULL DEFAULT 0,
    is_service INTEGER NOT NULL DEFAULT 0,
    is_period_crossover INTEGER NOT NULL DEFAULT 0,
    CHECK (is_tfa IN (0, 1)),
    CHECK (is_service IN (0, 1)),
    CHECK (is_period_crossover IN (0, 1))
);
"#;

const CREATE_INDEX_MARGIN_BASE_PERIOD_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_margin_base_period
ON margin_base (period_month, parentname);
"#;

const CREATE_REPORT_CONTROL_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS report_control (
    current_period TEXT NOT NULL,
    comparison_period TEXT NOT NULL,
    report_recipients TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    send_on_weekends INTEGER NOT NULL DEFAULT 0,
    last_updated_at TEXT
);
"#;

const CREATE_MARGIN_SUMMARY_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS margin_summary (
    period_label TEXT NOT NULL,
    period_month TEXT NOT NULL,
    period_days_calc REAL,
    blended_revenue REAL,
    blended_gp REAL,
    blended_margin_pct REAL,
    core_revenue REAL,
    core_gp REAL,
    core_margin_pct REAL,
    tfa_gp REAL,
    tfa_drag_pp REAL,
    revenue_per_day REAL,
    gp_per_day REAL,
    core_gp_per_day REAL
);
"#;

const CREATE_CHANNEL_MARGIN_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS channel_margin (
    period_label TEXT NOT NULL,
    customer_type TEXT NOT NULL,
    customer_subtype TEXT,
    revenue REAL NOT NULL DEFAULT 0,
    gross_profit REAL NOT NULL DEFAULT 0,
    revenue_share_pct REAL,
    revenue_per_day REAL,
    gp_per_day REAL
);
"#;

const CREATE_REGIONAL_MARGIN_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS regional_margin (
    period_label TEXT NOT NULL,
    price_branch_region TEXT NOT NULL,
    revenue REAL NOT NULL DEFAULT 0,
    gross_profit REAL NOT NULL DEFAULT 0,
    revenue_share_pct REAL,
    revenue_per_day REAL
);
"#;

const CREATE_TFA_DETAIL_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tfa_detail (
    record_type TEXT NOT NULL,
    period_label TEXT,
    period_month TEXT,
    gl_code TEXT,
    placement_segment TEXT,
    parentname TEXT,
    customer_type TEXT,
    price_branch_region TEXT,
    customer_count INTEGER,
    tfa_revenue REAL,
    tfa_cogs REAL,
    tfa_gp REAL,
    tfa_gp_per_day REAL,
    is_new_customer INTEGER
);
"#;

const CREATE_PRICE_REALIZATION_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS price_realization (
    record_type TEXT NOT NULL,
    period_label TEXT,
    period_month TEXT,
    item_sn2 TEXT,
    master2 TEXT,
    parentname TEXT,
    customer_type TEXT,
    customer_tier TEXT,
    price_branch_region TEXT,
    actual_revenue REAL,
    suggested_revenue REAL,
    actual_gp REAL,
    gp_opportunity REAL,
    realization_pct REAL,
    actual_margin_pct REAL,
    suggested_margin_pct REAL,
    pct_revenue_left_on_table REAL,
    rank_by_opportunity INTEGER
);
"#;

const CREATE_MARGIN_BRIDGE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS margin_bridge (
    step INTEGER NOT NULL,
    bridge_component TEXT NOT NULL,
    bridge_value_pp REAL,
    bridge_category TEXT
);
"#;

const CREATE_META_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS mart_schema_meta (
    schema_version TEXT NOT NULL,
    applied_at_utc TEXT NOT NULL
);
"#;

#[must_use]
pub fn schema_statements() -> &'static [&'static str] {
    &[
        CREATE_MARGIN_BASE_TABLE_SQL,
        CREATE_INDEX_MARGIN_BASE_PERIOD_SQL,
        CREATE_REPORT_CONTROL_TABLE_SQL,
        CREATE_MARGIN_SUMMARY_TABLE_SQL,
        CREATE_CHANNEL_MARGIN_TABLE_SQL,
        CREATE_REGIONAL_MARGIN_TABLE_SQL,
        CREATE_TFA_DETAIL_TABLE_SQL,
        CREATE_PRICE_REALIZATION_TABLE_SQL,
        CREATE_MARGIN_BRIDGE_TABLE_SQL,
        CREATE_META_TABLE_SQL,
    ]
}

#[must_use]
pub fn create_schema_sql() -> String {
    schema_statements().join("\n")
}

/// Creates every mart relation if absent and records the schema version once.
pub fn ensure_mart_schema(connection: &Connection) -> rusqlite::Result<()> {
    connection.execute_batch(&create_schema_sql())?;

    if schema_meta_has_version(connection, MART_SCHEMA_VERSION)? {
        return Ok(());
    }

    let applied_at_utc = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string());
    connection.execute(
        &format!("INSERT INTO {SCHEMA_META_TABLE} (schema_version, applied_at_utc) VALUES (?1, ?2)"),
        params![MART_SCHEMA_VERSION, applied_at_utc],
    )?;

    Ok(())
}

fn schema_meta_has_version(connection: &Connection, schema_version: &str) -> rusqlite::Result<bool> {
    let query = format!(
        "SELECT EXISTS(SELECT 1 FROM {SCHEMA_META_TABLE} WHERE schema_version = ?1 LIMIT 1)"
    );
    let exists = connection.query_row(&query, [schema_version], |row| row.get::<usize, i64>(0))?;
    Ok(exists != 0)
}

/// Opens (creating if needed) a writable mart and bootstraps its schema.
pub fn initialize_mart(path: &Path) -> MarginResult<()> {
    let unavailable = |source| MarginError::MartUnavailable {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| MarginError::MartDirectory {
            path: parent.display().to_string(),
            source,
        })?;
    }
    let connection = Connection::open(path).map_err(unavailable)?;
    ensure_mart_schema(&connection).map_err(unavailable)
}

/// The data-access collaborator: one statement in, the full row set out.
pub trait DataAccess {
    fn execute(&mut self, statement: &str, params: &[SqlValue]) -> MarginResult<Vec<Record>>;
}

/// Handle on a mart file; sessions are opened per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mart {
    path: PathBuf,
}

impl Mart {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquires a read-only session, runs `work`, and releases the session on every exit path.
    pub fn with_session<T>(
        &self,
        work: impl FnOnce(&mut MartSession) -> MarginResult<T>,
    ) -> MarginResult<T> {
        let mut session = MartSession::open_read_only(&self.path)?;
        debug!("mart session opened path={}", self.path.display());
        let outcome = work(&mut session);
        drop(session);
        debug!("mart session released path={}", self.path.display());
        outcome
    }
}

pub struct MartSession {
    connection: Connection,
    label: String,
}

impl MartSession {
    pub fn open_read_only(path: &Path) -> MarginResult<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection =
            Connection::open_with_flags(path, flags).map_err(|source| MarginError::MartUnavailable {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self {
            connection,
            label: path.display().to_string(),
        })
    }

    /// Wraps an already-open connection, e.g. an in-memory mart built by a test.
    #[must_use]
    pub fn from_connection(connection: Connection) -> Self {
        Self {
            connection,
            label: ":memory:".to_string(),
        }
    }

    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl DataAccess for MartSession {
    fn execute(&mut self, statement: &str, params: &[SqlValue]) -> MarginResult<Vec<Record>> {
        execute_read_only_query(&self.connection, statement, params)
    }
}

fn execute_read_only_query(
    connection: &Connection,
    sql: &str,
    params: &[SqlValue],
) -> MarginResult<Vec<Record>> {
    let failed = |source| MarginError::Statement {
        operation: leading_words(sql),
        source,
    };
    let mut statement = connection.prepare(sql).map_err(failed)?;
    let column_names = statement
        .column_names()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    let mut rows = statement
        .query(params_from_iter(params.iter()))
        .map_err(failed)?;
    let mut records = Vec::new();
    while let Some(row) = rows.next().map_err(failed)? {
        let mut record = Record::new();
        for (index, column_name) in column_names.iter().enumerate() {
            let value = row.get::<usize, SqlValue>(index).map_err(failed)?;
            record.insert(column_name.clone(), json_value_from_sql(value));
        }
        records.push(record);
    }

    Ok(records)
}

fn leading_words(sql: &str) -> String {
    sql.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

#[must_use]
pub fn json_value_from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(value) => json!(value),
        SqlValue::Real(value) => json!(value),
        SqlValue::Text(value) => json!(value),
        SqlValue::Blob(value) => json!(encode_blob_hex(&value)),
    }
}

fn encode_blob_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push(HEX[(byte >> 4) as usize] as char);
        output.push(HEX[(byte & 0x0f) as usize] as char);
    }
    output
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use rusqlite::types::Value as SqlValue;
    use serde_json::{Value, json};

    use super::{
        CHANNEL_MARGIN_TABLE, DataAccess, MARGIN_BASE_TABLE, MARGIN_BRIDGE_TABLE,
        MARGIN_SUMMARY_TABLE, MART_SCHEMA_VERSION, MartSession, PRICE_REALIZATION_TABLE,
        REGIONAL_MARGIN_TABLE, REPORT_CONTROL_TABLE, SCHEMA_META_TABLE, TFA_DETAIL_TABLE,
        ensure_mart_schema, initialize_mart, json_value_from_sql,
    };
    use crate::error::MarginError;

    #[test]
    fn ensure_schema_creates_mart_relations() {
        let connection = Connection::open_in_memory().expect("in-memory sqlite should open");
        ensure_mart_schema(&connection).expect("schema creation should succeed");

        for table in [
            MARGIN_BASE_TABLE,
            REPORT_CONTROL_TABLE,
            MARGIN_SUMMARY_TABLE,
            CHANNEL_MARGIN_TABLE,
            REGIONAL_MARGIN_TABLE,
            TFA_DETAIL_TABLE,
            PRICE_REALIZATION_TABLE,
            MARGIN_BRIDGE_TABLE,
            SCHEMA_META_TABLE,
        ] {
            let exists = connection
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 LIMIT 1",
                    [table],
                    |_| Ok(()),
                )
                .is_ok();
            assert!(exists, "expected table {table}");
        }
    }

    #[test]
    fn ensure_schema_is_idempotent() {
        let connection = Connection::open_in_memory().expect("in-memory sqlite should open");
        ensure_mart_schema(&connection).expect("first schema ensure should succeed");
        ensure_mart_schema(&connection).expect("second schema ensure should succeed");

        let count = connection
            .query_row(
                &format!("SELECT COUNT(*) FROM {SCHEMA_META_TABLE} WHERE schema_version = ?1"),
                [MART_SCHEMA_VERSION],
                |row| row.get::<usize, i64>(0),
            )
            .expect("schema meta query should succeed");
        assert_eq!(count, 1);
    }

    #[test]
    fn execute_preserves_engine_column_order() {
        let connection = Connection::open_in_memory().expect("in-memory sqlite should open");
        let mut session = MartSession::from_connection(connection);
        let rows = session
            .execute(
                "SELECT ?1 AS zeta, 2.5 AS alpha, NULL AS middle",
                &[SqlValue::Text("first".to_string())],
            )
            .expect("query should execute");

        assert_eq!(rows.len(), 1);
        let columns = rows[0].keys().map(String::as_str).collect::<Vec<_>>();
        assert_eq!(columns, vec!["zeta", "alpha", "middle"]);
        assert_eq!(rows[0].get("alpha"), Some(&json!(2.5)));
        assert_eq!(rows[0].get("middle"), Some(&Value::Null));
    }

    #[test]
    fn malformed_statement_surfaces_as_statement_failure() {
        let connection = Connection::open_in_memory().expect("in-memory sqlite should open");
        let mut session = MartSession::from_connection(connection);
        let error = session
            .execute("SELECT missing_column FROM nowhere", &[])
            .expect_err("unknown relation must fail");
        assert!(matches!(error, MarginError::Statement { .. }));
    }

    #[test]
    fn blob_values_render_as_lowercase_hex() {
        assert_eq!(
            json_value_from_sql(SqlValue::Blob(vec![0x0a, 0xff])),
            json!("0aff")
        );
        assert_eq!(json_value_from_sql(SqlValue::Integer(7)), json!(7));
    }

    #[test]
    fn initialize_reports_an_uncreatable_parent_directory() {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time should be after unix epoch")
            .as_nanos();
        let blocker = std::env::temp_dir().join(format!("margin-intel-blocker-{nanos}"));
        std::fs::write(&blocker, b"not a directory").expect("blocker file should write");

        let error = initialize_mart(&blocker.join("nested").join("mart.sqlite"))
            .expect_err("a file in the parent chain must fail");
        assert!(matches!(error, MarginError::MartDirectory { .. }));
        assert_eq!(error.code(), "mart_unavailable");

        std::fs::remove_file(&blocker).expect("blocker file should be removable");
    }
}
