use crate::domain::model::ScriptParams;
use crate::utils::error::{DomainError, DomainResult, ErrorKind};

/// Characters PowerShell gives meaning to outside a single-quoted string.
const METACHARACTERS: &[char] = &[
    '$', '`', '\'', '"', ';', '|', '&', '(', ')', '{', '}', '<', '>', '@', '#', ',',
];

/// Characters PowerShell accepts as a single quote inside a single-quoted string.
const SINGLE_QUOTES: &[char] = &['\'', '\u{2018}', '\u{2019}', '\u{201A}', '\u{201B}'];

/// Turns named parameters into `-Name value` tokens.
pub struct ArgumentBinder;

impl ArgumentBinder {
    /// Tokens for a string-based command line. Values are escaped so the
    /// interpreter reads each one back as a single literal.
    pub fn bind(params: &ScriptParams) -> DomainResult<Vec<String>> {
        let mut tokens = Vec::with_capacity(params.len() * 2);
        for (name, value) in params.iter() {
            validate_param_name(name)?;
            tokens.push(format!("-{}", name));
            tokens.push(quote_value(&value.to_string()));
        }
        Ok(tokens)
    }

    /// Tokens for direct argv invocation, one `-Name:value` entry per
    /// parameter. The colon binds the value to its name, so a value that
    /// starts with `-` can never be read as another parameter or switch.
    pub fn bind_argv(params: &ScriptParams) -> DomainResult<Vec<String>> {
        let mut tokens = Vec::with_capacity(params.len());
        for (name, value) in params.iter() {
            validate_param_name(name)?;
            tokens.push(format!("-{}:{}", name, value));
        }
        Ok(tokens)
    }

    pub fn command_fragment(params: &ScriptParams) -> DomainResult<String> {
        Ok(Self::bind(params)?.join(" "))
    }
}

pub fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value.starts_with('-')
        || value
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || METACHARACTERS.contains(&c) || SINGLE_QUOTES.contains(&c))
}

/// Wraps `value` in single quotes when needed, doubling every embedded quote.
pub fn quote_value(value: &str) -> String {
    if !needs_quoting(value) {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if SINGLE_QUOTES.contains(&c) {
            quoted.push(c);
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

fn validate_param_name(name: &str) -> DomainResult<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DomainError::new(
            ErrorKind::InvalidParameter,
            format!("Invalid parameter name: {}", name),
        ))
    }
}
