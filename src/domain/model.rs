use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A single parameter value handed to a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::Integer(n) => write!(f, "{}", n),
            ParamValue::Float(n) => write!(f, "{}", n),
            ParamValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Text(value.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Integer(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// Named script parameters in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptParams {
    entries: Vec<(String, ParamValue)>,
}

impl ScriptParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter, replacing the value in place if the name is already bound.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn with_opt<V: Into<ParamValue>>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.insert(name, value);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What the interpreter is asked to run.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptTarget {
    /// A script file, invoked with discrete argv entries.
    File(PathBuf),
    /// An inline cmdlet whose output is piped through the interpreter's JSON converter.
    Inline(String),
}

impl fmt::Display for ScriptTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptTarget::File(path) => write!(f, "{}", path.display()),
            ScriptTarget::Inline(cmdlet) => f.write_str(cmdlet),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub target: ScriptTarget,
    pub params: ScriptParams,
    pub timeout: Duration,
}

impl ExecutionRequest {
    pub fn new(target: ScriptTarget, params: ScriptParams, timeout: Duration) -> Self {
        Self {
            target,
            params,
            timeout,
        }
    }
}

/// Captured output of one finished interpreter process.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was ended by a signal.
    pub exit_code: Option<i32>,
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Text used for classification when no structured payload is available.
    pub fn failure_text(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        }
    }
}

/// Raw document a script writes to stdout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Decoded script outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResult {
    Success {
        data: Option<serde_json::Value>,
        count: Option<u64>,
        message: Option<String>,
    },
    Failure {
        error_type: Option<String>,
        message: Option<String>,
    },
}

impl ParsedResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ParsedResult::Success { .. })
    }
}

impl From<ScriptEnvelope> for ParsedResult {
    fn from(envelope: ScriptEnvelope) -> Self {
        if envelope.success {
            ParsedResult::Success {
                data: envelope.data,
                count: envelope.count,
                message: envelope.message,
            }
        } else {
            ParsedResult::Failure {
                error_type: envelope.error_type,
                message: envelope.message,
            }
        }
    }
}

/// Output of an inline command.
#[derive(Debug, Clone, PartialEq)]
pub enum InlineOutput {
    Json(serde_json::Value),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReservation {
    pub ip_address: String,
    pub client_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationUpdate {
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ReservationUpdate {
    pub fn is_empty(&self) -> bool {
        self.ip_address.is_none() && self.name.is_none() && self.description.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaseReport {
    pub leases: serde_json::Value,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub active_commands: usize,
    pub max_concurrent: usize,
    pub available: bool,
    pub checked_at: DateTime<Utc>,
}
