pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{CliConfig, Operation};

pub use config::BridgeConfig;
pub use core::{
    binder::ArgumentBinder,
    classifier::ErrorClassifier,
    executor::{ExecutorConfig, ProcessExecutor},
    gateway::DhcpGateway,
    parser::ResultParser,
    slots::ConcurrencyGate,
};
pub use utils::error::{BridgeError, DomainError, DomainResult, ErrorKind, ExecutionError, Result};
