pub mod args;
pub mod catalog;
pub mod conversion;
pub mod dispatch;
pub mod filter;
pub mod sql;

pub use catalog::{OPERATIONS, OperationDescriptor, find_operation};
pub use conversion::ConversionStatus;
pub use dispatch::{Invocation, InvocationContext, OperationOutput, invoke, invoke_on_mart};
pub use filter::{Filter, FilterBuilder, LimitRange};
