use crate::domain::model::{NewReservation, ReservationUpdate};
use crate::utils::error::{BridgeError, Result};
use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::OnceLock;

pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn mac_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$").expect("MAC pattern is valid")
    })
}

/// Canonical client id form: uppercase, dash separated.
pub fn normalize_client_id(client_id: &str) -> String {
    client_id.trim().to_uppercase().replace(':', "-")
}

pub fn is_valid_client_id(client_id: &str) -> bool {
    mac_pattern().is_match(client_id.trim())
}

pub fn is_valid_ipv4(address: &str) -> bool {
    address.parse::<Ipv4Addr>().is_ok()
}

pub fn is_private_ipv4(address: &str) -> bool {
    address
        .parse::<Ipv4Addr>()
        .map(|ip| ip.is_private())
        .unwrap_or(false)
}

pub fn validate_scope_id(scope_id: &str) -> Result<()> {
    if !is_valid_ipv4(scope_id) {
        return Err(BridgeError::ValidationError {
            message: format!("Invalid scope ID format (must be valid IPv4 address): {}", scope_id),
        });
    }
    Ok(())
}

pub fn validate_client_id(client_id: &str) -> Result<()> {
    if !is_valid_client_id(client_id) {
        return Err(BridgeError::ValidationError {
            message: format!(
                "Invalid MAC address format (use AA-BB-CC-DD-EE-FF or AA:BB:CC:DD:EE:FF): {}",
                client_id
            ),
        });
    }
    Ok(())
}

fn validate_ip_address(address: &str) -> Result<()> {
    if !is_valid_ipv4(address) {
        return Err(BridgeError::ValidationError {
            message: format!("Invalid IPv4 address format: {}", address),
        });
    }
    Ok(())
}

fn validate_max_length(field_name: &str, value: Option<&str>, max: usize) -> Result<()> {
    if let Some(value) = value {
        if value.chars().count() > max {
            return Err(BridgeError::ValidationError {
                message: format!("{} must be at most {} characters", field_name, max),
            });
        }
    }
    Ok(())
}

impl Validate for NewReservation {
    fn validate(&self) -> Result<()> {
        validate_ip_address(&self.ip_address)?;
        validate_client_id(&self.client_id)?;
        validate_max_length("name", self.name.as_deref(), MAX_NAME_LENGTH)?;
        validate_max_length("description", self.description.as_deref(), MAX_DESCRIPTION_LENGTH)?;
        Ok(())
    }
}

impl Validate for ReservationUpdate {
    fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(BridgeError::ValidationError {
                message: "At least one field must be provided for update".to_string(),
            });
        }
        if let Some(ip) = &self.ip_address {
            validate_ip_address(ip)?;
        }
        validate_max_length("name", self.name.as_deref(), MAX_NAME_LENGTH)?;
        validate_max_length("description", self.description.as_deref(), MAX_DESCRIPTION_LENGTH)?;
        Ok(())
    }
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(BridgeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BridgeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    validate_non_empty_string(field_name, path)?;

    if path.contains('\0') {
        return Err(BridgeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}
