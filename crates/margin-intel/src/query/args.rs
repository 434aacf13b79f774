use clap::Args;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MarginError, MarginResult};

/// Flattened parameter set handed to the executor, one optional slot per filter class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationArgs {
    pub period_month: Option<String>,
    pub region: Option<String>,
    pub channel: Option<String>,
    pub product_search: Option<String>,
    pub account_name: Option<String>,
    pub months: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Args)]
pub struct NoArgs {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Args)]
pub struct MarginHistoryArgs {
    /// Number of months of history to return (1-24, default 6).
    #[arg(long, allow_negative_numbers = true)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub months: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Args)]
pub struct SubgroupPerformanceArgs {
    /// Channel to drill into, e.g. CONSTRUCTION, INDUSTRIAL, DEALER or OTHER.
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Args)]
pub struct AccountHistoryArgs {
    /// Customer name or partial name to search, e.g. 'MAYO' or 'HM RICHARDS'.
    #[arg(long)]
    pub account_name: String,

    /// How many months of history to return (1-24, default 6).
    #[arg(long, allow_negative_numbers = true)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub months: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Args)]
pub struct TopCustomersArgs {
    /// Period as YYYY-MM; defaults to the configured current period.
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_month: Option<String>,

    /// Region, e.g. 'Texas', 'South', 'East', 'Central' or 'Coastal'.
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Channel, e.g. 'INDUSTRIAL', 'CONSTRUCTION' or 'DEALER'.
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// Number of customers to return (1-100, default 20).
    #[arg(long, allow_negative_numbers = true)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Args)]
pub struct ProductPerformanceArgs {
    /// Partial product name or item code, e.g. 'JH14148' or 'PT30120'.
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_search: Option<String>,

    /// Period as YYYY-MM; defaults to the configured current period.
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_month: Option<String>,

    /// Number of products to return (1-50, default 20).
    #[arg(long, allow_negative_numbers = true)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

impl From<NoArgs> for OperationArgs {
    fn from(_: NoArgs) -> Self {
        Self::default()
    }
}

impl From<MarginHistoryArgs> for OperationArgs {
    fn from(args: MarginHistoryArgs) -> Self {
        Self {
            months: args.months,
            ..Self::default()
        }
    }
}

impl From<SubgroupPerformanceArgs> for OperationArgs {
    fn from(args: SubgroupPerformanceArgs) -> Self {
        Self {
            channel: args.channel,
            ..Self::default()
        }
    }
}

impl From<AccountHistoryArgs> for OperationArgs {
    fn from(args: AccountHistoryArgs) -> Self {
        Self {
            account_name: Some(args.account_name),
            months: args.months,
            ..Self::default()
        }
    }
}

impl From<TopCustomersArgs> for OperationArgs {
    fn from(args: TopCustomersArgs) -> Self {
        Self {
            period_month: args.period_month,
            region: args.region,
            channel: args.channel,
            limit: args.limit,
            ..Self::default()
        }
    }
}

impl From<ProductPerformanceArgs> for OperationArgs {
    fn from(args: ProductPerformanceArgs) -> Self {
        Self {
            product_search: args.product_search,
            period_month: args.period_month,
            limit: args.limit,
            ..Self::default()
        }
    }
}

/// Which typed argument struct an operation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgsShape {
    None,
    MarginHistory,
    SubgroupPerformance,
    AccountHistory,
    TopCustomers,
    ProductPerformance,
}

impl ArgsShape {
    /// Decodes caller JSON; `null` counts as "no arguments".
    pub fn parse(self, operation: &str, arguments: Value) -> MarginResult<OperationArgs> {
        let arguments = match arguments {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other,
        };
        let invalid = |error: serde_json::Error| MarginError::InvalidArguments {
            operation: operation.to_string(),
            message: error.to_string(),
        };

        Ok(match self {
            Self::None => serde_json::from_value::<NoArgs>(arguments)
                .map_err(invalid)?
                .into(),
            Self::MarginHistory => serde_json::from_value::<MarginHistoryArgs>(arguments)
                .map_err(invalid)?
                .into(),
            Self::SubgroupPerformance => {
                serde_json::from_value::<SubgroupPerformanceArgs>(arguments)
                    .map_err(invalid)?
                    .into()
            }
            Self::AccountHistory => serde_json::from_value::<AccountHistoryArgs>(arguments)
                .map_err(invalid)?
                .into(),
            Self::TopCustomers => serde_json::from_value::<TopCustomersArgs>(arguments)
                .map_err(invalid)?
                .into(),
            Self::ProductPerformance => serde_json::from_value::<ProductPerformanceArgs>(arguments)
                .map_err(invalid)?
                .into(),
        })
    }

    #[must_use]
    pub fn input_schema(self) -> Value {
        let schema = match self {
            Self::None => schemars::schema_for!(NoArgs),
            Self::MarginHistory => schemars::schema_for!(MarginHistoryArgs),
            Self::SubgroupPerformance => schemars::schema_for!(SubgroupPerformanceArgs),
            Self::AccountHistory => schemars::schema_for!(AccountHistoryArgs),
            Self::TopCustomers => schemars::schema_for!(TopCustomersArgs),
            Self::ProductPerformance => schemars::schema_for!(ProductPerformanceArgs),
        };
        serde_json::to_value(schema).unwrap_or(Value::Null)
    }
}
