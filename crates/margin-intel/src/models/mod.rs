pub mod query_envelope;
pub mod report_config;

pub use query_envelope::{
    QUERY_ENVELOPE_SCHEMA_VERSION, QueryEnvelope, QueryEnvelopeCommandFailure,
    QueryEnvelopeError, QueryEnvelopeMeta, QueryEnvelopeWarning,
};
pub use report_config::ReportPeriodConfig;
