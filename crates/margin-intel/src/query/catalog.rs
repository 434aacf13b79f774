//! The fixed operation catalog.
//!
//! Each operation is a declarative [`OperationDescriptor`]; [`OperationDescriptor::assemble`]
//! is the only place statements are put together.

use rusqlite::types::Value as SqlValue;
use serde::Serialize;
use serde_json::{Value, json};

use super::args::{ArgsShape, OperationArgs};
use super::filter::{FilterBuilder, LimitRange};
use crate::mart::{
    CHANNEL_MARGIN_TABLE, MARGIN_BASE_TABLE, MARGIN_BRIDGE_TABLE, MARGIN_SUMMARY_TABLE,
    PRICE_REALIZATION_TABLE, REGIONAL_MARGIN_TABLE, REPORT_CONTROL_TABLE, TFA_DETAIL_TABLE,
};
use crate::models::ReportPeriodConfig;
use crate::utils::time::period_months_before;

pub const HISTORY_MONTHS: LimitRange = LimitRange::new(6, 1, 24);
pub const TOP_CUSTOMERS_LIMIT: LimitRange = LimitRange::new(20, 1, 100);
pub const PRODUCT_LIMIT: LimitRange = LimitRange::new(20, 1, 50);

const PRODUCT_SEARCH_COLUMNS: &[&str] = &["item_sn2", "item_name", "master2"];

/// Optional (or required) caller parameter routed through the filter builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamSlot {
    /// `period_month`, defaulting to the configured current period.
    Period,
    Region,
    Channel,
    ProductSearch,
    /// Required partial match on the parent account name.
    AccountName,
    /// `months` of history back from the current calendar month.
    HistoryMonths,
}

/// Configured period bound into a placeholder embedded in the select text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigBind {
    CurrentPeriod,
    ComparisonPeriod,
}

/// Post-processing applied to the fetched rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTransform {
    None,
    ConversionStatus,
}

#[derive(Debug, Clone, Copy)]
pub struct OperationDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub source: &'static str,
    pub select: &'static str,
    pub config_binds: &'static [ConfigBind],
    pub fixed_predicates: &'static [&'static str],
    pub slots: &'static [ParamSlot],
    pub group_by: Option<&'static str>,
    pub order_by: &'static str,
    pub limit: Option<LimitRange>,
    pub args: ArgsShape,
    pub transform: RowTransform,
}

/// A statement ready for the data-access collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl OperationDescriptor {
    /// True when assembly needs the report period configuration.
    #[must_use]
    pub fn needs_report_config(&self) -> bool {
        !self.config_binds.is_empty() || self.slots.contains(&ParamSlot::Period)
    }

    /// Builds the statement text and the positionally matching bound values.
    #[must_use]
    pub fn assemble(
        &self,
        args: &OperationArgs,
        config: Option<&ReportPeriodConfig>,
        today: time::Date,
    ) -> AssembledStatement {
        let mut params = self
            .config_binds
            .iter()
            .map(|bind| {
                let period = config.map(|config| match bind {
                    ConfigBind::CurrentPeriod => config.current_period.as_str(),
                    ConfigBind::ComparisonPeriod => config.comparison_period.as_str(),
                });
                period.map_or(SqlValue::Null, |period| SqlValue::Text(period.to_string()))
            })
            .collect::<Vec<_>>();

        let mut builder = FilterBuilder::new();
        for predicate in self.fixed_predicates {
            builder.literal(predicate);
        }
        for slot in self.slots {
            match slot {
                ParamSlot::Period => {
                    builder.period(
                        args.period_month.as_deref(),
                        config.map(|config| config.current_period.as_str()),
                    );
                }
                ParamSlot::Region => {
                    builder.equals_ignore_case("price_branch_region", args.region.as_deref());
                }
                ParamSlot::Channel => {
                    builder.equals_ignore_case("customer_type", args.channel.as_deref());
                }
                ParamSlot::ProductSearch => {
                    builder.contains_ignore_case(
                        PRODUCT_SEARCH_COLUMNS,
                        args.product_search.as_deref(),
                    );
                }
                ParamSlot::AccountName => {
                    builder.contains_required(
                        "parentname",
                        args.account_name.as_deref().unwrap_or_default(),
                    );
                }
                ParamSlot::HistoryMonths => {
                    let months = HISTORY_MONTHS.clamp(args.months);
                    builder.period_at_least(&period_months_before(today, months));
                }
            }
        }
        let filter = builder.build();

        let mut sql = self.select.trim_end().to_string();
        if !filter.is_empty() {
            sql.push_str("\nWHERE ");
            sql.push_str(&filter.where_sql());
        }
        params.extend(filter.values);
        if let Some(group_by) = self.group_by {
            sql.push_str("\nGROUP BY ");
            sql.push_str(group_by);
        }
        sql.push_str("\nORDER BY ");
        sql.push_str(self.order_by);
        if let Some(limit) = self.limit {
            sql.push_str("\nLIMIT ?");
            params.push(SqlValue::Integer(limit.clamp(args.limit)));
        }

        AssembledStatement { sql, params }
    }

    #[must_use]
    pub fn describe(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "source": self.source,
            "uses_report_config": self.needs_report_config(),
            "fixed_predicates": self.fixed_predicates,
            "parameter_slots": self.slots,
            "order_by": self.order_by,
            "limit": self.limit.map(|range| json!({
                "default": range.default,
                "min": range.min,
                "max": range.max,
            })),
            "input_schema": self.args.input_schema(),
        })
    }
}

const CORE: &[&str] = super::filter::CORE_EXCLUSIONS;

const MARGIN_SUMMARY_SQL: &str = r#"
SELECT
    period_label,
    period_month,
    period_days_calc,
    blended_revenue,
    blended_gp,
    blended_margin_pct,
    core_revenue,
    core_gp,
    core_margin_pct,
    tfa_gp,
    tfa_drag_pp,
    revenue_per_day,
    gp_per_day,
    core_gp_per_day
FROM margin_summary
"#;

const MARGIN_HISTORY_SQL: &str = r#"
SELECT
    period_month,
    COUNT(*) AS row_count,
    SUM(sales_amt) AS revenue,
    SUM(cogs_amt) AS cogs,
    SUM(sales_amt - cogs_amt) AS gp,
    ROUND(SUM(sales_amt - cogs_amt) / NULLIF(SUM(sales_amt), 0) * 100, 2) AS blended_margin_pct,
    ROUND(
        SUM(CASE WHEN NOT is_tfa AND NOT is_service AND NOT is_period_crossover
            THEN sales_amt - cogs_amt ELSE 0.0 END)
        / NULLIF(SUM(CASE WHEN NOT is_tfa AND NOT is_service AND NOT is_period_crossover
            THEN sales_amt ELSE 0.0 END), 0) * 100, 2) AS core_margin_pct,
    ROUND(
        SUM(CASE WHEN is_tfa THEN sales_amt - cogs_amt ELSE 0.0 END)
        / NULLIF(SUM(sales_amt), 0) * 100, 2) AS tfa_drag_pp
FROM margin_base
"#;

const CHANNEL_PERFORMANCE_SQL: &str = r#"
SELECT
    period_label,
    customer_type AS channel,
    ROUND(SUM(revenue), 0) AS revenue,
    ROUND(SUM(gross_profit), 0) AS gp,
    ROUND(SUM(gross_profit) / NULLIF(SUM(revenue), 0) * 100, 2) AS margin_pct,
    ROUND(SUM(revenue_share_pct), 2) AS revenue_share_pct,
    ROUND(SUM(revenue_per_day), 0) AS revenue_per_day,
    ROUND(SUM(gp_per_day), 0) AS gp_per_day
FROM channel_margin
"#;

const SUBGROUP_PERFORMANCE_SQL: &str = r#"
SELECT
    period_label,
    customer_type AS channel,
    customer_subtype AS subgroup,
    ROUND(SUM(revenue), 0) AS revenue,
    ROUND(SUM(gross_profit), 0) AS gp,
    ROUND(SUM(gross_profit) / NULLIF(SUM(revenue), 0) * 100, 2) AS margin_pct,
    ROUND(SUM(gp_per_day), 0) AS gp_per_day
FROM channel_margin
"#;

const REGIONAL_PERFORMANCE_SQL: &str = r#"
SELECT
    period_label,
    price_branch_region AS region,
    ROUND(SUM(revenue), 0) AS revenue,
    ROUND(SUM(gross_profit), 0) AS gp,
    ROUND(SUM(gross_profit) / NULLIF(SUM(revenue), 0) * 100, 2) AS margin_pct,
    ROUND(SUM(revenue_share_pct), 2) AS revenue_share_pct,
    ROUND(SUM(revenue_per_day), 0) AS revenue_per_day
FROM regional_margin
"#;

const TFA_ANALYSIS_SQL: &str = r#"
SELECT
    record_type,
    period_label,
    period_month,
    gl_code,
    placement_segment,
    parentname AS customer,
    customer_type,
    price_branch_region AS region,
    customer_count,
    tfa_revenue,
    tfa_cogs,
    tfa_gp,
    tfa_gp_per_day,
    is_new_customer
FROM tfa_detail
"#;

const PRICE_REALIZATION_SQL: &str = r#"
SELECT
    record_type,
    period_label,
    period_month,
    item_sn2,
    master2,
    parentname AS customer,
    customer_type,
    customer_tier,
    price_branch_region AS region,
    actual_revenue,
    suggested_revenue,
    actual_gp,
    gp_opportunity,
    realization_pct,
    actual_margin_pct,
    suggested_margin_pct,
    pct_revenue_left_on_table,
    rank_by_opportunity
FROM price_realization
"#;

const MARGIN_BRIDGE_SQL: &str = r#"
SELECT
    step,
    bridge_component,
    bridge_value_pp,
    bridge_category
FROM margin_bridge
"#;

const ACCOUNT_HISTORY_SQL: &str = r#"
SELECT
    period_month,
    parentname,
    customer_type,
    customer_subtype,
    customer_tier,
    price_branch_region AS region,
    SUM(sales_amt) AS revenue,
    SUM(cogs_amt) AS cogs,
    SUM(sales_amt - cogs_amt) AS gp,
    ROUND(SUM(sales_amt - cogs_amt) / NULLIF(SUM(sales_amt), 0) * 100, 2) AS margin_pct,
    SUM(CASE WHEN is_tfa THEN sales_amt - cogs_amt ELSE 0.0 END) AS tfa_gp,
    COUNT(DISTINCT item_sn2) AS distinct_products,
    SUM(sales_qty) AS total_qty
FROM margin_base
"#;

/// Placements are TFA fastener-tool lines in the current period netting below -500.
/// Core revenues are summed to cents so lines that cancel out land on exactly zero.
const TFA_CONVERSION_SQL: &str = r#"
WITH cfg AS (
    SELECT ? AS current_period, ? AS comparison_period
),
placements AS (
    SELECT m.parentname, m.price_branch_region AS region,
           SUM(m.sales_amt - m.cogs_amt) AS tfa_net_gp
    FROM margin_base m CROSS JOIN cfg
    WHERE m.period_month = cfg.current_period
        AND m.is_tfa AND m.gl_code = 'FASTENER TOOLS'
    GROUP BY m.parentname, m.price_branch_region
    HAVING SUM(m.sales_amt - m.cogs_amt) < -500
),
current_core AS (
    SELECT m.parentname,
           ROUND(SUM(m.sales_amt), 2) AS core_revenue,
           ROUND(SUM(m.sales_amt - m.cogs_amt) / NULLIF(ROUND(SUM(m.sales_amt), 2), 0) * 100, 2) AS core_margin
    FROM margin_base m CROSS JOIN cfg
    WHERE m.period_month = cfg.current_period
        AND NOT m.is_tfa AND NOT m.is_service AND NOT m.is_period_crossover
    GROUP BY m.parentname
),
prior_core AS (
    SELECT m.parentname, ROUND(SUM(m.sales_amt), 2) AS prior_revenue
    FROM margin_base m CROSS JOIN cfg
    WHERE m.period_month = cfg.comparison_period
        AND NOT m.is_tfa AND NOT m.is_service AND NOT m.is_period_crossover
    GROUP BY m.parentname
)
SELECT
    p.parentname AS customer,
    p.region,
    ROUND(ABS(p.tfa_net_gp), 0) AS placement_cost,
    COALESCE(c.core_revenue, 0.0) AS current_revenue,
    c.core_margin AS current_margin_pct,
    COALESCE(r.prior_revenue, 0.0) AS prior_revenue,
    r.parentname IS NOT NULL AS has_prior
FROM placements p
LEFT JOIN current_core c ON p.parentname = c.parentname
LEFT JOIN prior_core r ON p.parentname = r.parentname
"#;

const TOP_CUSTOMERS_SQL: &str = r#"
SELECT
    parentname,
    customer_type,
    customer_subtype,
    customer_tier,
    price_branch_region AS region,
    SUM(sales_amt) AS revenue,
    SUM(cogs_amt) AS cogs,
    SUM(sales_amt - cogs_amt) AS gp,
    ROUND(SUM(sales_amt - cogs_amt) / NULLIF(SUM(sales_amt), 0) * 100, 2) AS margin_pct,
    COUNT(DISTINCT item_sn2) AS distinct_products
FROM margin_base
"#;

const PRODUCT_PERFORMANCE_SQL: &str = r#"
SELECT
    item_sn2,
    item_name,
    master2,
    gl_code,
    SUM(sales_amt) AS revenue,
    SUM(cogs_amt) AS cogs,
    SUM(sales_amt - cogs_amt) AS gp,
    ROUND(SUM(sales_amt - cogs_amt) / NULLIF(SUM(sales_amt), 0) * 100, 2) AS margin_pct,
    SUM(sales_qty) AS total_qty,
    COUNT(DISTINCT parentname) AS customer_count
FROM margin_base
"#;

const REPORT_CONFIG_SQL: &str = r#"
SELECT
    current_period,
    comparison_period,
    report_recipients,
    is_active,
    send_on_weekends,
    last_updated_at
FROM report_control
"#;

pub const OPERATIONS: &[OperationDescriptor] = &[
    OperationDescriptor {
        name: "margin-summary",
        description: "Current and comparison period margin summary: blended margin, core margin (ex-TFA), TFA drag, revenue per day, GP per day and day counts for both periods.",
        source: MARGIN_SUMMARY_TABLE,
        select: MARGIN_SUMMARY_SQL,
        config_binds: &[],
        fixed_predicates: &[],
        slots: &[],
        group_by: None,
        order_by: "period_month",
        limit: None,
        args: ArgsShape::None,
        transform: RowTransform::None,
    },
    OperationDescriptor {
        name: "margin-history",
        description: "Monthly blended and core margin trend for the last N months (default 6). Use for trend, year-over-year and seasonality questions.",
        source: MARGIN_BASE_TABLE,
        select: MARGIN_HISTORY_SQL,
        config_binds: &[],
        fixed_predicates: &[],
        slots: &[ParamSlot::HistoryMonths],
        group_by: Some("period_month"),
        order_by: "period_month DESC",
        limit: None,
        args: ArgsShape::MarginHistory,
        transform: RowTransform::None,
    },
    OperationDescriptor {
        name: "channel-performance",
        description: "Core margin by channel (Industrial, Construction, Dealer, Other) for both periods, with revenue share and daily rates.",
        source: CHANNEL_MARGIN_TABLE,
        select: CHANNEL_PERFORMANCE_SQL,
        config_binds: &[],
        fixed_predicates: &[],
        slots: &[],
        group_by: Some("period_label, customer_type"),
        order_by: "period_label, SUM(revenue) DESC",
        limit: None,
        args: ArgsShape::None,
        transform: RowTransform::None,
    },
    OperationDescriptor {
        name: "subgroup-performance",
        description: "Margin by customer subgroup for both periods, optionally narrowed to one channel.",
        source: CHANNEL_MARGIN_TABLE,
        select: SUBGROUP_PERFORMANCE_SQL,
        config_binds: &[],
        fixed_predicates: &[],
        slots: &[ParamSlot::Channel],
        group_by: Some("period_label, customer_type, customer_subtype"),
        order_by: "period_label, customer_type, SUM(revenue) DESC",
        limit: None,
        args: ArgsShape::SubgroupPerformance,
        transform: RowTransform::None,
    },
    OperationDescriptor {
        name: "regional-performance",
        description: "Core margin by region for both periods with revenue share. Excludes the Corporate region.",
        source: REGIONAL_MARGIN_TABLE,
        select: REGIONAL_PERFORMANCE_SQL,
        config_binds: &[],
        fixed_predicates: &["price_branch_region != 'Corporate'"],
        slots: &[],
        group_by: Some("period_label, price_branch_region"),
        order_by: "period_label, SUM(revenue) DESC",
        limit: None,
        args: ArgsShape::None,
        transform: RowTransform::None,
    },
    OperationDescriptor {
        name: "tfa-analysis",
        description: "TFA (Tool & Fastener Agreement) breakdown: GL category daily costs, placement segments and top large placements with new vs repeat status.",
        source: TFA_DETAIL_TABLE,
        select: TFA_ANALYSIS_SQL,
        config_binds: &[],
        fixed_predicates: &[],
        slots: &[],
        group_by: None,
        order_by: "record_type, period_label, tfa_gp ASC",
        limit: None,
        args: ArgsShape::None,
        transform: RowTransform::None,
    },
    OperationDescriptor {
        name: "price-realization",
        description: "Price realization: GP dollars left on the table against suggested pricing, by period summary, top products and top customers.",
        source: PRICE_REALIZATION_TABLE,
        select: PRICE_REALIZATION_SQL,
        config_binds: &[],
        fixed_predicates: &[],
        slots: &[],
        group_by: None,
        order_by: "record_type, period_label, rank_by_opportunity",
        limit: None,
        args: ArgsShape::None,
        transform: RowTransform::None,
    },
    OperationDescriptor {
        name: "margin-bridge",
        description: "Waterfall decomposing the margin change between periods into channel mix, within-channel rate, TFA impact change and interaction/other.",
        source: MARGIN_BRIDGE_TABLE,
        select: MARGIN_BRIDGE_SQL,
        config_binds: &[],
        fixed_predicates: &[],
        slots: &[],
        group_by: None,
        order_by: "step",
        limit: None,
        args: ArgsShape::None,
        transform: RowTransform::None,
    },
    OperationDescriptor {
        name: "account-history",
        description: "Purchase and margin history for one customer account, matched by partial parent account name.",
        source: MARGIN_BASE_TABLE,
        select: ACCOUNT_HISTORY_SQL,
        config_binds: &[],
        fixed_predicates: &["NOT is_tfa", "NOT is_service"],
        slots: &[ParamSlot::AccountName, ParamSlot::HistoryMonths],
        group_by: Some(
            "period_month, parentname, customer_type, customer_subtype, customer_tier, price_branch_region",
        ),
        order_by: "period_month DESC, SUM(sales_amt) DESC",
        limit: None,
        args: ArgsShape::AccountHistory,
        transform: RowTransform::None,
    },
    OperationDescriptor {
        name: "tfa-conversion-status",
        description: "Large TFA placements from the current period with their revenue status: Growing, Flat / Declining, No Revenue Yet or New Account.",
        source: MARGIN_BASE_TABLE,
        select: TFA_CONVERSION_SQL,
        config_binds: &[ConfigBind::CurrentPeriod, ConfigBind::ComparisonPeriod],
        fixed_predicates: &[],
        slots: &[],
        group_by: None,
        order_by: "p.tfa_net_gp ASC",
        limit: None,
        args: ArgsShape::None,
        transform: RowTransform::ConversionStatus,
    },
    OperationDescriptor {
        name: "top-customers",
        description: "Top customers ranked by core revenue for a period, optionally filtered by region and channel.",
        source: MARGIN_BASE_TABLE,
        select: TOP_CUSTOMERS_SQL,
        config_binds: &[],
        fixed_predicates: CORE,
        slots: &[ParamSlot::Period, ParamSlot::Region, ParamSlot::Channel],
        group_by: Some(
            "parentname, customer_type, customer_subtype, customer_tier, price_branch_region",
        ),
        order_by: "SUM(sales_amt) DESC",
        limit: Some(TOP_CUSTOMERS_LIMIT),
        args: ArgsShape::TopCustomers,
        transform: RowTransform::None,
    },
    OperationDescriptor {
        name: "product-performance",
        description: "Product performance by item group, optionally searched by product name or code.",
        source: MARGIN_BASE_TABLE,
        select: PRODUCT_PERFORMANCE_SQL,
        config_binds: &[],
        fixed_predicates: &[
            "NOT is_tfa",
            "NOT is_service",
            "NOT is_period_crossover",
            "sales_amt > 0",
        ],
        slots: &[ParamSlot::Period, ParamSlot::ProductSearch],
        group_by: Some("item_sn2, item_name, master2, gl_code"),
        order_by: "SUM(sales_amt) DESC",
        limit: Some(PRODUCT_LIMIT),
        args: ArgsShape::ProductPerformance,
        transform: RowTransform::None,
    },
    OperationDescriptor {
        name: "report-config",
        description: "Current report control settings: compared periods, recipient list and whether the daily report is active.",
        source: REPORT_CONTROL_TABLE,
        select: REPORT_CONFIG_SQL,
        config_binds: &[],
        fixed_predicates: &[],
        slots: &[],
        group_by: None,
        order_by: "last_updated_at DESC",
        limit: None,
        args: ArgsShape::None,
        transform: RowTransform::None,
    },
];

#[must_use]
pub fn find_operation(name: &str) -> Option<&'static OperationDescriptor> {
    OPERATIONS.iter().find(|operation| operation.name == name)
}
