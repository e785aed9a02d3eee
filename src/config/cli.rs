use crate::config::BridgeConfig;
use crate::domain::model::{NewReservation, ReservationUpdate};
use crate::utils::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "dhcp-agent")]
#[command(about = "Manage DHCP reservations through the PowerShell reservation module")]
pub struct CliConfig {
    /// TOML configuration file; built-in defaults are used when omitted
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Operation,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Operation {
    /// List all reservations in a scope
    ListReservations { scope_id: String },

    /// Show one reservation by client id (MAC address)
    GetReservation { scope_id: String, client_id: String },

    /// Create a reservation
    AddReservation {
        scope_id: String,
        #[arg(long)]
        ip_address: String,
        #[arg(long)]
        client_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },

    /// Change the address, name or description of a reservation
    UpdateReservation {
        scope_id: String,
        client_id: String,
        #[arg(long)]
        ip_address: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a reservation; succeeds when it is already gone
    RemoveReservation { scope_id: String, client_id: String },

    /// List the leases of a scope
    ListLeases { scope_id: String },

    /// Report execution slot usage
    Health,
}

impl Operation {
    pub fn new_reservation(&self) -> Option<NewReservation> {
        match self {
            Operation::AddReservation {
                ip_address,
                client_id,
                name,
                description,
                ..
            } => Some(NewReservation {
                ip_address: ip_address.clone(),
                client_id: client_id.clone(),
                name: name.clone(),
                description: description.clone(),
            }),
            _ => None,
        }
    }

    pub fn reservation_update(&self) -> Option<ReservationUpdate> {
        match self {
            Operation::UpdateReservation {
                ip_address,
                name,
                description,
                ..
            } => Some(ReservationUpdate {
                ip_address: ip_address.clone(),
                name: name.clone(),
                description: description.clone(),
            }),
            _ => None,
        }
    }
}

impl CliConfig {
    /// File configuration (or defaults) with environment overrides applied.
    pub fn load_bridge_config(&self) -> Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::from_file(path)?,
            None => BridgeConfig::default(),
        };
        config.apply_env_overrides()?;
        if self.json_logs {
            config.logging.format = "json".to_string();
        }
        Ok(config)
    }
}
