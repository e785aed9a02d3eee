use crate::domain::model::ExecutionResult;
use crate::utils::error::{DomainError, ErrorKind, ExecutionError};

/// One entry of the raw-text classification table.
#[derive(Debug, Clone, Copy)]
pub struct TextRule {
    pub needles: &'static [&'static str],
    pub kind: ErrorKind,
    pub message: &'static str,
}

impl TextRule {
    pub fn matches(&self, raw: &str) -> bool {
        self.needles.iter().any(|needle| raw.contains(needle))
    }
}

/// Evaluated top to bottom; the first matching rule wins.
pub const TEXT_RULES: &[TextRule] = &[
    TextRule {
        needles: &["already exists"],
        kind: ErrorKind::Conflict,
        message: "Reservation already exists",
    },
    TextRule {
        needles: &["Cannot find", "does not exist"],
        kind: ErrorKind::NotFound,
        message: "Reservation or scope not found",
    },
    TextRule {
        needles: &["Access is denied", "unauthorized"],
        kind: ErrorKind::PermissionDenied,
        message: "Insufficient permissions to perform DHCP operation",
    },
    TextRule {
        needles: &["outside", "range"],
        kind: ErrorKind::InvalidRange,
        message: "IP address is outside scope range",
    },
    TextRule {
        needles: &["Invalid", "ParameterBindingException"],
        kind: ErrorKind::InvalidParameter,
        message: "Invalid parameter format",
    },
];

const UNCLASSIFIED_MESSAGE: &str = "Script execution failed";
const STRUCTURED_DEFAULT_MESSAGE: &str = "DHCP operation failed";

/// Maps script and process failures onto `ErrorKind`.
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// A reported `errorType` takes precedence; without one the raw text is
    /// matched against `TEXT_RULES`.
    pub fn classify(raw_message: &str, error_type: Option<&str>) -> DomainError {
        match error_type {
            Some(error_type) => {
                let kind = ErrorKind::from_error_type(error_type);
                let message = if raw_message.trim().is_empty() {
                    STRUCTURED_DEFAULT_MESSAGE
                } else {
                    raw_message
                };
                DomainError::new(kind, message).with_raw_details(raw_message)
            }
            None => Self::classify_text(raw_message),
        }
    }

    pub fn classify_text(raw_message: &str) -> DomainError {
        let (kind, message) = TEXT_RULES
            .iter()
            .find(|rule| rule.matches(raw_message))
            .map(|rule| (rule.kind, rule.message))
            .unwrap_or((ErrorKind::UnexpectedError, UNCLASSIFIED_MESSAGE));

        DomainError::new(kind, message).with_raw_details(raw_message)
    }

    /// Process-level failures skip text matching entirely.
    pub fn classify_execution(error: ExecutionError) -> DomainError {
        let raw = error.to_string();
        match error {
            ExecutionError::CapacityExhausted { .. } => {
                DomainError::new(ErrorKind::CapacityExhausted, raw.clone()).with_raw_details(raw)
            }
            ExecutionError::Timeout { .. } => {
                DomainError::new(ErrorKind::Timeout, "Script execution timed out").with_raw_details(raw)
            }
            ExecutionError::OutputLimitExceeded { .. } => {
                DomainError::new(ErrorKind::OutputLimitExceeded, "Script output exceeded the capture limit")
                    .with_raw_details(raw)
            }
            ExecutionError::Spawn(_) | ExecutionError::Io(_) => {
                DomainError::new(ErrorKind::UnexpectedError, UNCLASSIFIED_MESSAGE).with_raw_details(raw)
            }
            ExecutionError::Binding(err) => err,
        }
    }

    /// Non-zero exit without a usable failure document.
    pub fn classify_exit(result: &ExecutionResult) -> DomainError {
        let text = result.failure_text();
        if text.is_empty() {
            let raw = match result.exit_code {
                Some(code) => format!("interpreter exited with code {} and no output", code),
                None => "interpreter terminated by signal with no output".to_string(),
            };
            return DomainError::new(ErrorKind::UnexpectedError, UNCLASSIFIED_MESSAGE).with_raw_details(raw);
        }
        Self::classify_text(text)
    }
}
