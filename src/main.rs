use clap::Parser;
use dhcp_agent::utils::logger;
use dhcp_agent::utils::validation::{validate_client_id, validate_scope_id, Validate};
use dhcp_agent::{CliConfig, DhcpGateway, DomainError, ExecutorConfig, Operation, ProcessExecutor};
use serde::Serialize;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();
    let config = cli.load_bridge_config()?;

    if config.logging.format == "json" {
        logger::init_json_logger(&config.logging.level);
    } else {
        logger::init_cli_logger(cli.verbose, &config.logging.level);
    }

    tracing::info!("Starting dhcp-agent CLI");
    tracing::debug!("Bridge config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let executor = ProcessExecutor::new(ExecutorConfig::from_settings(&config));
    let gateway = DhcpGateway::from_settings(executor, &config);

    if let Err(e) = run(&gateway, &cli.command).await {
        tracing::error!(
            "❌ {} failed: {} (kind: {}, status: {})",
            operation_name(&cli.command),
            e,
            e.kind,
            e.status_hint
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("{}", serde_json::to_string_pretty(&e)?);
        std::process::exit(exit_code(&e));
    }

    Ok(())
}

async fn run(gateway: &DhcpGateway<ProcessExecutor>, operation: &Operation) -> Result<(), DomainError> {
    match operation {
        Operation::ListReservations { scope_id } => {
            validate_scope_id(scope_id).map_err(|e| e.into_domain())?;
            let reservations = gateway.list_reservations(scope_id).await?;
            let count = reservations.len();
            print_json(&serde_json::json!({
                "success": true,
                "data": reservations,
                "count": count,
                "scope": scope_id,
            }))
        }
        Operation::GetReservation { scope_id, client_id } => {
            validate_request(scope_id, Some(client_id))?;
            let reservation = gateway.get_reservation(scope_id, client_id).await?;
            print_json(&serde_json::json!({ "success": true, "data": reservation }))
        }
        Operation::AddReservation { scope_id, .. } => {
            validate_scope_id(scope_id).map_err(|e| e.into_domain())?;
            let Some(reservation) = operation.new_reservation() else {
                return Ok(());
            };
            reservation.validate().map_err(|e| e.into_domain())?;
            let created = gateway.add_reservation(scope_id, &reservation).await?;
            print_json(&serde_json::json!({
                "success": true,
                "data": created,
                "message": "Reservation created successfully",
            }))
        }
        Operation::UpdateReservation { scope_id, client_id, .. } => {
            validate_request(scope_id, Some(client_id))?;
            let Some(update) = operation.reservation_update() else {
                return Ok(());
            };
            update.validate().map_err(|e| e.into_domain())?;
            let updated = gateway.update_reservation(scope_id, client_id, &update).await?;
            print_json(&serde_json::json!({
                "success": true,
                "data": updated,
                "message": "Reservation updated successfully",
            }))
        }
        Operation::RemoveReservation { scope_id, client_id } => {
            validate_request(scope_id, Some(client_id))?;
            let deleted = gateway.remove_reservation(scope_id, client_id).await?;
            print_json(&serde_json::json!({ "success": true, "deleted": deleted }))
        }
        Operation::ListLeases { scope_id } => {
            validate_scope_id(scope_id).map_err(|e| e.into_domain())?;
            let report = gateway.list_leases(scope_id).await?;
            print_json(&serde_json::json!({
                "success": true,
                "data": report.leases,
                "count": report.count,
                "scope": scope_id,
            }))
        }
        Operation::Health => print_json(&gateway.health()),
    }
}

fn validate_request(scope_id: &str, client_id: Option<&String>) -> Result<(), DomainError> {
    validate_scope_id(scope_id).map_err(|e| e.into_domain())?;
    if let Some(client_id) = client_id {
        validate_client_id(client_id).map_err(|e| e.into_domain())?;
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), DomainError> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| {
        DomainError::new(dhcp_agent::ErrorKind::UnexpectedError, "Failed to render output")
            .with_raw_details(e.to_string())
    })?;
    println!("{}", rendered);
    Ok(())
}

fn operation_name(operation: &Operation) -> &'static str {
    match operation {
        Operation::ListReservations { .. } => "list-reservations",
        Operation::GetReservation { .. } => "get-reservation",
        Operation::AddReservation { .. } => "add-reservation",
        Operation::UpdateReservation { .. } => "update-reservation",
        Operation::RemoveReservation { .. } => "remove-reservation",
        Operation::ListLeases { .. } => "list-leases",
        Operation::Health => "health",
    }
}

/// 2 for caller mistakes, 3 when a retry may succeed, 1 otherwise.
fn exit_code(error: &DomainError) -> i32 {
    match error.status_hint {
        429 | 504 => 3,
        400..=499 => 2,
        _ => 1,
    }
}
