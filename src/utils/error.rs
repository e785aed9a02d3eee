use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Closed set of failure kinds the bridge reports to its callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    ValidationError,
    InvalidParameter,
    InvalidRange,
    Conflict,
    DhcpError,
    NotFound,
    PermissionDenied,
    Timeout,
    CapacityExhausted,
    OutputLimitExceeded,
    ParseError,
    UnexpectedError,
}

impl ErrorKind {
    /// Suggested HTTP-style status code for the surrounding API layer.
    pub fn status_hint(&self) -> u16 {
        match self {
            ErrorKind::ValidationError | ErrorKind::InvalidParameter | ErrorKind::InvalidRange => {
                400
            }
            ErrorKind::PermissionDenied => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict | ErrorKind::DhcpError => 409,
            ErrorKind::CapacityExhausted => 429,
            ErrorKind::Timeout => 504,
            ErrorKind::OutputLimitExceeded | ErrorKind::ParseError | ErrorKind::UnexpectedError => {
                500
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::InvalidParameter => "INVALID_PARAMETER",
            ErrorKind::InvalidRange => "INVALID_RANGE",
            ErrorKind::Conflict => "RESERVATION_EXISTS",
            ErrorKind::DhcpError => "DHCP_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::PermissionDenied => "PERMISSION_DENIED",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::CapacityExhausted => "CAPACITY_EXHAUSTED",
            ErrorKind::OutputLimitExceeded => "OUTPUT_LIMIT_EXCEEDED",
            ErrorKind::ParseError => "PARSE_ERROR",
            ErrorKind::UnexpectedError => "SCRIPT_ERROR",
        }
    }

    /// Looks up the `errorType` reported by a script. Unknown names are
    /// treated as `UnexpectedError`.
    pub fn from_error_type(error_type: &str) -> Self {
        match error_type {
            "ValidationError" => ErrorKind::ValidationError,
            "InvalidParameter" => ErrorKind::InvalidParameter,
            "DhcpError" => ErrorKind::DhcpError,
            "NotFound" => ErrorKind::NotFound,
            "PermissionDenied" => ErrorKind::PermissionDenied,
            _ => ErrorKind::UnexpectedError,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Externally visible failure of a DHCP operation.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{message}")]
pub struct DomainError {
    pub kind: ErrorKind,
    pub message: String,
    pub status_hint: u16,
    /// Original script or process text, kept for diagnostics.
    pub raw_details: Option<String>,
}

impl DomainError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_hint: kind.status_hint(),
            raw_details: None,
        }
    }

    pub fn with_raw_details(mut self, raw: impl Into<String>) -> Self {
        self.raw_details = Some(raw.into());
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.kind {
            ErrorKind::CapacityExhausted => "All execution slots are busy; retry after a short backoff",
            ErrorKind::Timeout => "The script did not finish in time; check DHCP server load or raise the timeout",
            ErrorKind::PermissionDenied => "Run the agent under an account in the DHCP Administrators group",
            ErrorKind::NotFound => "Check the scope id and client id",
            ErrorKind::Conflict | ErrorKind::DhcpError => {
                "Inspect the existing reservation before retrying"
            }
            ErrorKind::ValidationError | ErrorKind::InvalidParameter | ErrorKind::InvalidRange => {
                "Correct the request parameters"
            }
            ErrorKind::OutputLimitExceeded | ErrorKind::ParseError => {
                "The script produced unusable output; check the script module version"
            }
            ErrorKind::UnexpectedError => "See raw_details for the script output",
        }
    }
}

pub type DomainResult<T> = std::result::Result<T, DomainError>;

/// Process-level failures raised by the executor before any output is parsed.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Script execution limit reached ({max} concurrent). Please try again later.")]
    CapacityExhausted { max: usize },

    #[error("Script execution timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Script output exceeded {limit} bytes")]
    OutputLimitExceeded { limit: usize },

    #[error("Failed to start interpreter: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("IO error while running script: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Binding(#[from] DomainError),
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

impl BridgeError {
    /// Validation failures surface to callers as `ValidationError` domain errors.
    pub fn into_domain(self) -> DomainError {
        match self {
            BridgeError::Domain(err) => err,
            BridgeError::ValidationError { message } => {
                DomainError::new(ErrorKind::ValidationError, message)
            }
            BridgeError::InvalidConfigValueError { field, reason, .. } => {
                DomainError::new(ErrorKind::ValidationError, format!("{}: {}", field, reason))
            }
            other => DomainError::new(ErrorKind::UnexpectedError, other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
