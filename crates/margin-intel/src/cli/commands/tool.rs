use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::Value;

use super::{command_failure, run_operation};
use crate::config::RuntimePaths;
use crate::error::MarginError;
use crate::query::args::{
    AccountHistoryArgs, MarginHistoryArgs, NoArgs, ProductPerformanceArgs,
    SubgroupPerformanceArgs, TopCustomersArgs,
};

#[derive(Debug, Clone, Args)]
pub struct ToolArgs {
    #[command(subcommand)]
    pub operation: ToolOperation,
}

/// One subcommand per catalog operation; names match the catalog exactly.
#[derive(Debug, Clone, Subcommand)]
pub enum ToolOperation {
    /// Current vs comparison period blended and core margin summary.
    MarginSummary(NoArgs),
    /// Monthly margin trend for the last N months.
    MarginHistory(MarginHistoryArgs),
    /// Core margin by channel for both periods.
    ChannelPerformance(NoArgs),
    /// Margin by customer subgroup, optionally for one channel.
    SubgroupPerformance(SubgroupPerformanceArgs),
    /// Core margin by region, excluding Corporate.
    RegionalPerformance(NoArgs),
    /// TFA cost categories, segments and large placements.
    TfaAnalysis(NoArgs),
    /// Price realization against suggested pricing.
    PriceRealization(NoArgs),
    /// Margin change waterfall between periods.
    MarginBridge(NoArgs),
    /// Monthly history for one account.
    AccountHistory(AccountHistoryArgs),
    /// Revenue status of large TFA placements.
    TfaConversionStatus(NoArgs),
    /// Top customers by core revenue.
    TopCustomers(TopCustomersArgs),
    /// Product performance by item group.
    ProductPerformance(ProductPerformanceArgs),
    /// Active report control settings.
    ReportConfig(NoArgs),
}

impl ToolOperation {
    #[must_use]
    pub const fn operation_name(&self) -> &'static str {
        match self {
            Self::MarginSummary(_) => "margin-summary",
            Self::MarginHistory(_) => "margin-history",
            Self::ChannelPerformance(_) => "channel-performance",
            Self::SubgroupPerformance(_) => "subgroup-performance",
            Self::RegionalPerformance(_) => "regional-performance",
            Self::TfaAnalysis(_) => "tfa-analysis",
            Self::PriceRealization(_) => "price-realization",
            Self::MarginBridge(_) => "margin-bridge",
            Self::AccountHistory(_) => "account-history",
            Self::TfaConversionStatus(_) => "tfa-conversion-status",
            Self::TopCustomers(_) => "top-customers",
            Self::ProductPerformance(_) => "product-performance",
            Self::ReportConfig(_) => "report-config",
        }
    }

    /// The flags re-encoded as the JSON arguments `call` would accept.
    pub fn arguments(&self) -> Result<Value, MarginError> {
        let encoded = match self {
            Self::MarginSummary(args)
            | Self::ChannelPerformance(args)
            | Self::RegionalPerformance(args)
            | Self::TfaAnalysis(args)
            | Self::PriceRealization(args)
            | Self::MarginBridge(args)
            | Self::TfaConversionStatus(args)
            | Self::ReportConfig(args) => serde_json::to_value(args),
            Self::MarginHistory(args) => serde_json::to_value(args),
            Self::SubgroupPerformance(args) => serde_json::to_value(args),
            Self::AccountHistory(args) => serde_json::to_value(args),
            Self::TopCustomers(args) => serde_json::to_value(args),
            Self::ProductPerformance(args) => serde_json::to_value(args),
        };
        encoded.map_err(MarginError::from)
    }
}

pub fn run(args: &ToolArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let name = args.operation.operation_name();
    let arguments = args
        .operation
        .arguments()
        .map_err(|error| command_failure(name, &error))?;
    run_operation(name, arguments, runtime_paths)
}
