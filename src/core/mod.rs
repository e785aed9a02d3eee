pub mod binder;
pub mod classifier;
pub mod executor;
pub mod gateway;
pub mod parser;
pub mod slots;

pub use crate::domain::model::{
    ExecutionRequest, ExecutionResult, InlineOutput, ParamValue, ParsedResult, ScriptParams,
    ScriptTarget,
};
pub use crate::domain::ports::{BridgeSettings, ScriptRunner};
pub use crate::utils::error::{DomainResult, Result};
