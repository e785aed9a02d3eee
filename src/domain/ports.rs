use crate::domain::model::{ExecutionRequest, ExecutionResult, HealthStatus};
use crate::utils::error::ExecutionError;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Runs one script invocation to completion.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(&self, request: ExecutionRequest) -> Result<ExecutionResult, ExecutionError>;

    fn health_status(&self) -> HealthStatus;
}

pub trait BridgeSettings: Send + Sync {
    fn interpreter(&self) -> &str;
    fn execution_flags(&self) -> &[String];
    fn command_flags(&self) -> &[String];
    fn inline_output_suffix(&self) -> &str;
    fn module_path(&self) -> &Path;
    fn execution_timeout(&self) -> Duration;
    fn max_concurrent(&self) -> usize;
    fn max_output_bytes(&self) -> usize;
}
