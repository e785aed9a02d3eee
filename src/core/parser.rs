use crate::domain::model::{ExecutionResult, InlineOutput, ParsedResult, ScriptEnvelope};
use crate::utils::error::{DomainError, DomainResult, ErrorKind};

const LOGGED_STDOUT_CHARS: usize = 500;

/// Decodes the JSON document a script writes to stdout.
pub struct ResultParser;

impl ResultParser {
    pub fn parse(result: &ExecutionResult) -> DomainResult<ParsedResult> {
        Self::parse_stdout(&result.stdout)
    }

    pub fn parse_stdout(stdout: &str) -> DomainResult<ParsedResult> {
        let document = clean(stdout);
        if document.is_empty() {
            return Err(parse_error(stdout, "script produced no output"));
        }

        match decode_envelope(document) {
            Ok(envelope) => Ok(envelope.into()),
            Err(reason) => {
                tracing::error!(
                    stdout = %excerpt(stdout),
                    parse_error = %reason,
                    "Failed to parse script output"
                );
                Err(parse_error(stdout, &reason))
            }
        }
    }

    /// Inline commands may print plain text. Output that looks like JSON must
    /// still decode; anything else is handed back verbatim.
    pub fn parse_inline(result: &ExecutionResult) -> DomainResult<InlineOutput> {
        let document = clean(&result.stdout);
        if !(document.starts_with('{') || document.starts_with('[')) {
            return Ok(InlineOutput::Text(result.stdout.clone()));
        }

        serde_json::from_str(document).map(InlineOutput::Json).map_err(|e| {
            tracing::error!(
                stdout = %excerpt(&result.stdout),
                parse_error = %e,
                "Failed to parse inline command output"
            );
            parse_error(&result.stdout, &e.to_string())
        })
    }
}

fn decode_envelope(document: &str) -> Result<ScriptEnvelope, String> {
    let value: serde_json::Value = serde_json::from_str(document).map_err(|e| e.to_string())?;
    if !value.is_object() {
        return Err("expected a JSON object".to_string());
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn clean(stdout: &str) -> &str {
    stdout.trim().trim_start_matches('\u{feff}').trim_start()
}

fn excerpt(stdout: &str) -> String {
    stdout.chars().take(LOGGED_STDOUT_CHARS).collect()
}

fn parse_error(stdout: &str, reason: &str) -> DomainError {
    DomainError::new(ErrorKind::ParseError, "Invalid script output format")
        .with_raw_details(format!("{}: {}", reason, excerpt(stdout)))
}
