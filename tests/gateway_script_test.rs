#![cfg(unix)]

mod common;

use common::{sh_config, ModuleFixture};
use dhcp_agent::domain::model::{NewReservation, ReservationUpdate};
use dhcp_agent::{DhcpGateway, ErrorKind, ProcessExecutor};
use serde_json::json;
use std::time::Duration;

fn gateway(module: &ModuleFixture, timeout: Duration) -> DhcpGateway<ProcessExecutor> {
    DhcpGateway::new(ProcessExecutor::new(sh_config(5)), module.path(), timeout)
}

fn printer() -> NewReservation {
    NewReservation {
        ip_address: "10.0.0.5".to_string(),
        client_id: "AA-BB-CC-DD-EE-FF".to_string(),
        name: None,
        description: None,
    }
}

#[tokio::test]
async fn test_add_reservation_returns_script_payload() {
    let module = ModuleFixture::new();
    module.script(
        "Add-DHCPReservation.ps1",
        r#"printf '{"success":true,"data":{"ScopeId":"%s","IPAddress":"%s","ClientId":"%s"}}' "${1#-ScopeId:}" "${2#-IPAddress:}" "${3#-ClientId:}""#,
    );

    let created = gateway(&module, Duration::from_secs(5))
        .add_reservation("10.0.0.0", &printer())
        .await
        .unwrap();

    assert_eq!(
        created,
        json!({"ScopeId": "10.0.0.0", "IPAddress": "10.0.0.5", "ClientId": "AA-BB-CC-DD-EE-FF"})
    );
}

#[tokio::test]
async fn test_add_reservation_reports_dhcp_error() {
    let module = ModuleFixture::new();
    module.script(
        "Add-DHCPReservation.ps1",
        r#"echo '{"success":false,"errorType":"DhcpError","message":"Failed to add reservation: address in use"}'"#,
    );

    let err = gateway(&module, Duration::from_secs(5))
        .add_reservation("10.0.0.0", &printer())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::DhcpError);
    assert_eq!(err.status_hint, 409);
    assert_eq!(err.message, "Failed to add reservation: address in use");
}

#[tokio::test]
async fn test_remove_reservation_idempotent_and_successful_paths() {
    let missing = ModuleFixture::new();
    missing.script(
        "Remove-DHCPReservation.ps1",
        r#"echo '{"success":false,"errorType":"NotFound","message":"Reservation not found"}'"#,
    );
    let deleted = gateway(&missing, Duration::from_secs(5))
        .remove_reservation("10.0.0.0", "aa:bb:cc:dd:ee:ff")
        .await
        .unwrap();
    assert!(!deleted);

    let present = ModuleFixture::new();
    present.script("Remove-DHCPReservation.ps1", r#"echo '{"success":true}'"#);
    let deleted = gateway(&present, Duration::from_secs(5))
        .remove_reservation("10.0.0.0", "AA-BB-CC-DD-EE-FF")
        .await
        .unwrap();
    assert!(deleted);
}

#[tokio::test]
async fn test_process_failure_text_is_classified() {
    let module = ModuleFixture::new();
    module.script(
        "Get-DHCPReservation.ps1",
        "echo 'Get-DhcpServerv4Reservation : Access is denied.' >&2\nexit 1\n",
    );

    let err = gateway(&module, Duration::from_secs(5))
        .get_reservation("10.0.0.0", "AA-BB-CC-DD-EE-FF")
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::PermissionDenied);
    assert_eq!(err.status_hint, 403);
    assert!(err.raw_details.unwrap().contains("Access is denied"));
}

#[tokio::test]
async fn test_update_and_list_leases() {
    let module = ModuleFixture::new();
    module
        .script(
            "Update-DHCPReservation.ps1",
            r#"printf '{"success":true,"data":{"ClientId":"%s","Description":"%s"}}' "${2#-ClientId:}" "${3#-Description:}""#,
        )
        .script(
            "Get-DHCPLeases.ps1",
            r#"echo '{"success":true,"data":{"leases":[{"IPAddress":"10.0.0.20"},{"IPAddress":"10.0.0.21"}],"count":2}}'"#,
        );
    let gateway = gateway(&module, Duration::from_secs(5));

    let update = ReservationUpdate {
        description: Some("moved to lab 2".to_string()),
        ..ReservationUpdate::default()
    };
    let updated = gateway
        .update_reservation("10.0.0.0", "aa:bb:cc:dd:ee:ff", &update)
        .await
        .unwrap();
    assert_eq!(
        updated,
        json!({"ClientId": "AA-BB-CC-DD-EE-FF", "Description": "moved to lab 2"})
    );

    let leases = gateway.list_leases("10.0.0.0").await.unwrap();
    assert_eq!(leases.count, 2);
    assert_eq!(leases.leases.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_slow_script_surfaces_timeout() {
    let module = ModuleFixture::new();
    module.script("Get-DHCPReservations.ps1", "exec sleep 10\n");
    let gateway = gateway(&module, Duration::from_millis(200));

    let err = gateway.list_reservations("10.0.0.0").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Timeout);
    assert_eq!(gateway.health().active_commands, 0);
}

#[tokio::test]
async fn test_missing_script_is_unexpected_error() {
    let module = ModuleFixture::new();

    let err = gateway(&module, Duration::from_secs(5))
        .list_reservations("10.0.0.0")
        .await
        .unwrap_err();

    // sh reports the missing file on stderr and exits non-zero
    assert_eq!(err.kind, ErrorKind::UnexpectedError);
    assert_eq!(err.status_hint, 500);
    assert!(err.raw_details.is_some());
}
