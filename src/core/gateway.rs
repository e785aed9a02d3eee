use crate::core::classifier::ErrorClassifier;
use crate::core::parser::ResultParser;
use crate::domain::model::{
    ExecutionRequest, ExecutionResult, HealthStatus, InlineOutput, LeaseReport, NewReservation,
    ParsedResult, ReservationUpdate, ScriptParams, ScriptTarget,
};
use crate::domain::ports::{BridgeSettings, ScriptRunner};
use crate::utils::error::{DomainError, DomainResult, ErrorKind};
use crate::utils::validation::normalize_client_id;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const GET_RESERVATIONS_SCRIPT: &str = "Get-DHCPReservations.ps1";
pub const GET_RESERVATION_SCRIPT: &str = "Get-DHCPReservation.ps1";
pub const ADD_RESERVATION_SCRIPT: &str = "Add-DHCPReservation.ps1";
pub const UPDATE_RESERVATION_SCRIPT: &str = "Update-DHCPReservation.ps1";
pub const REMOVE_RESERVATION_SCRIPT: &str = "Remove-DHCPReservation.ps1";
pub const GET_LEASES_SCRIPT: &str = "Get-DHCPLeases.ps1";

/// Payload of a script that reported `success: true`.
#[derive(Debug, Clone, PartialEq)]
struct ScriptSuccess {
    data: Option<Value>,
    count: Option<u64>,
}

/// Named DHCP operations, each backed by one script in the module's `Public` folder.
pub struct DhcpGateway<R: ScriptRunner> {
    runner: R,
    module_path: PathBuf,
    timeout: Duration,
}

impl<R: ScriptRunner> DhcpGateway<R> {
    pub fn new(runner: R, module_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            runner,
            module_path: module_path.into(),
            timeout,
        }
    }

    pub fn from_settings<S: BridgeSettings + ?Sized>(runner: R, settings: &S) -> Self {
        Self::new(runner, settings.module_path(), settings.execution_timeout())
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn script_path(&self, script: &str) -> PathBuf {
        self.module_path.join("Public").join(script)
    }

    pub fn module_path(&self) -> &Path {
        &self.module_path
    }

    pub async fn list_reservations(&self, scope_id: &str) -> DomainResult<Vec<Value>> {
        tracing::info!(scope_id, "Getting DHCP reservations");

        let params = ScriptParams::new().with("ScopeId", scope_id);
        let result = self.invoke(GET_RESERVATIONS_SCRIPT, params).await;
        let reservations = match result {
            Ok(success) => into_list(success.data),
            Err(err) => {
                tracing::error!(scope_id, error = %err, kind = %err.kind, "Failed to get reservations");
                return Err(err);
            }
        };

        tracing::info!(scope_id, count = reservations.len(), "Retrieved DHCP reservations");
        Ok(reservations)
    }

    pub async fn get_reservation(&self, scope_id: &str, client_id: &str) -> DomainResult<Value> {
        let client_id = normalize_client_id(client_id);
        tracing::info!(scope_id, client_id = %client_id, "Getting DHCP reservation");

        let params = ScriptParams::new()
            .with("ScopeId", scope_id)
            .with("ClientId", &client_id);
        let result = self
            .invoke(GET_RESERVATION_SCRIPT, params)
            .await
            .and_then(|success| match success.data {
                Some(data) if !data.is_null() => Ok(data),
                _ => Err(DomainError::new(ErrorKind::NotFound, "Reservation not found")
                    .with_raw_details(format!("scope {} client {}", scope_id, client_id))),
            });

        match result {
            Ok(reservation) => {
                tracing::info!(scope_id, client_id = %client_id, "Retrieved DHCP reservation");
                Ok(reservation)
            }
            Err(err) => {
                tracing::error!(scope_id, client_id = %client_id, error = %err, kind = %err.kind, "Failed to get reservation");
                Err(err)
            }
        }
    }

    pub async fn add_reservation(
        &self,
        scope_id: &str,
        reservation: &NewReservation,
    ) -> DomainResult<Value> {
        let client_id = normalize_client_id(&reservation.client_id);
        tracing::info!(
            scope_id,
            ip_address = %reservation.ip_address,
            client_id = %client_id,
            name = ?reservation.name,
            "Creating DHCP reservation"
        );

        let params = ScriptParams::new()
            .with("ScopeId", scope_id)
            .with("IPAddress", &reservation.ip_address)
            .with("ClientId", &client_id)
            .with_opt("Name", non_empty(&reservation.name))
            .with_opt("Description", non_empty(&reservation.description));

        let result = self
            .invoke(ADD_RESERVATION_SCRIPT, params)
            .await
            .and_then(|success| require_data(success, ADD_RESERVATION_SCRIPT));

        match result {
            Ok(created) => {
                tracing::info!(scope_id, ip_address = %reservation.ip_address, client_id = %client_id, "Created DHCP reservation");
                Ok(created)
            }
            Err(err) => {
                tracing::error!(
                    scope_id,
                    ip_address = %reservation.ip_address,
                    client_id = %client_id,
                    error = %err,
                    kind = %err.kind,
                    "Failed to create reservation"
                );
                Err(err)
            }
        }
    }

    pub async fn update_reservation(
        &self,
        scope_id: &str,
        client_id: &str,
        update: &ReservationUpdate,
    ) -> DomainResult<Value> {
        let client_id = normalize_client_id(client_id);
        tracing::info!(scope_id, client_id = %client_id, update = ?update, "Updating DHCP reservation");

        if update.is_empty() {
            return Err(DomainError::new(
                ErrorKind::ValidationError,
                "At least one field must be provided for update",
            ));
        }

        let params = ScriptParams::new()
            .with("ScopeId", scope_id)
            .with("ClientId", &client_id)
            .with_opt("IPAddress", non_empty(&update.ip_address))
            .with_opt("Name", non_empty(&update.name))
            .with_opt("Description", non_empty(&update.description));

        let result = self
            .invoke(UPDATE_RESERVATION_SCRIPT, params)
            .await
            .and_then(|success| require_data(success, UPDATE_RESERVATION_SCRIPT));

        match result {
            Ok(updated) => {
                tracing::info!(scope_id, client_id = %client_id, "Updated DHCP reservation");
                Ok(updated)
            }
            Err(err) => {
                tracing::error!(scope_id, client_id = %client_id, error = %err, kind = %err.kind, "Failed to update reservation");
                Err(err)
            }
        }
    }

    /// Returns `false` when there was nothing to delete.
    pub async fn remove_reservation(&self, scope_id: &str, client_id: &str) -> DomainResult<bool> {
        let client_id = normalize_client_id(client_id);
        tracing::info!(scope_id, client_id = %client_id, "Removing DHCP reservation");

        let params = ScriptParams::new()
            .with("ScopeId", scope_id)
            .with("ClientId", &client_id);

        match self.invoke(REMOVE_RESERVATION_SCRIPT, params).await {
            Ok(_) => {
                tracing::info!(scope_id, client_id = %client_id, "Removed DHCP reservation");
                Ok(true)
            }
            Err(err) if err.is_not_found() => {
                tracing::info!(scope_id, client_id = %client_id, "Reservation not found (idempotent delete)");
                Ok(false)
            }
            Err(err) => {
                tracing::error!(scope_id, client_id = %client_id, error = %err, kind = %err.kind, "Failed to remove reservation");
                Err(err)
            }
        }
    }

    pub async fn list_leases(&self, scope_id: &str) -> DomainResult<LeaseReport> {
        tracing::info!(scope_id, "Getting DHCP leases");

        let params = ScriptParams::new().with("ScopeId", scope_id);
        let report = match self.invoke(GET_LEASES_SCRIPT, params).await {
            Ok(success) => into_lease_report(success),
            Err(err) => {
                tracing::error!(scope_id, error = %err, kind = %err.kind, "Failed to get leases");
                return Err(err);
            }
        };

        tracing::info!(scope_id, count = report.count, "Retrieved DHCP leases");
        Ok(report)
    }

    /// Runs an inline cmdlet for callers that only need its raw or JSON output.
    pub async fn run_command(&self, cmdlet: &str, params: ScriptParams) -> DomainResult<InlineOutput> {
        let request = ExecutionRequest::new(ScriptTarget::Inline(cmdlet.to_string()), params, self.timeout);
        let result = self
            .runner
            .run(request)
            .await
            .map_err(ErrorClassifier::classify_execution)?;

        if !result.success() {
            let err = ErrorClassifier::classify_exit(&result);
            tracing::error!(cmdlet, error = %err, kind = %err.kind, "Inline command failed");
            return Err(err);
        }

        tracing::debug!(cmdlet, duration_ms = result.duration.as_millis() as u64, "Inline command completed");
        ResultParser::parse_inline(&result)
    }

    pub fn health(&self) -> HealthStatus {
        self.runner.health_status()
    }

    async fn invoke(&self, script: &str, params: ScriptParams) -> DomainResult<ScriptSuccess> {
        let request = ExecutionRequest::new(
            ScriptTarget::File(self.script_path(script)),
            params,
            self.timeout,
        );

        let result = self
            .runner
            .run(request)
            .await
            .map_err(ErrorClassifier::classify_execution)?;

        match decode(&result)? {
            ParsedResult::Success { data, count, .. } => Ok(ScriptSuccess { data, count }),
            ParsedResult::Failure {
                error_type,
                message,
            } => Err(ErrorClassifier::classify(
                message.as_deref().unwrap_or_default(),
                error_type.as_deref(),
            )),
        }
    }
}

/// A failing exit may still carry a failure document on stdout; anything
/// else falls back to classifying the raw process text.
fn decode(result: &ExecutionResult) -> DomainResult<ParsedResult> {
    if result.success() {
        return ResultParser::parse(result);
    }

    match ResultParser::parse(result) {
        Ok(failure @ ParsedResult::Failure { .. }) => Ok(failure),
        _ => Err(ErrorClassifier::classify_exit(result)),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn require_data(success: ScriptSuccess, script: &str) -> DomainResult<Value> {
    match success.data {
        Some(data) if !data.is_null() => Ok(data),
        _ => Err(DomainError::new(
            ErrorKind::ParseError,
            "Script reported success without data",
        )
        .with_raw_details(script.to_string())),
    }
}

/// PowerShell collapses single-element arrays into a bare object.
fn into_list(data: Option<Value>) -> Vec<Value> {
    match data {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(single) => vec![single],
    }
}

fn into_lease_report(success: ScriptSuccess) -> LeaseReport {
    let ScriptSuccess { data, count } = success;
    let (leases, nested_count) = match data {
        Some(Value::Object(mut map)) if map.contains_key("leases") => {
            let nested_count = map.get("count").and_then(Value::as_u64);
            let leases = map.remove("leases").unwrap_or(Value::Null);
            (leases, nested_count)
        }
        other => (other.unwrap_or(Value::Null), None),
    };

    let leases = Value::Array(into_list(Some(leases)));
    let listed = leases.as_array().map(Vec::len).unwrap_or(0) as u64;

    LeaseReport {
        count: nested_count.or(count).unwrap_or(listed),
        leases,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ExecutionError;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    type Scripted = Result<ExecutionResult, ExecutionError>;

    #[derive(Clone, Default)]
    struct MockRunner {
        responses: Arc<Mutex<VecDeque<Scripted>>>,
        requests: Arc<Mutex<Vec<ExecutionRequest>>>,
    }

    impl MockRunner {
        fn new() -> Self {
            Self::default()
        }

        async fn respond(&self, response: Scripted) {
            self.responses.lock().await.push_back(response);
        }

        async fn respond_stdout(&self, stdout: &str) {
            self.respond(Ok(exit(0, stdout, ""))).await;
        }

        async fn requests(&self) -> Vec<ExecutionRequest> {
            self.requests.lock().await.clone()
        }
    }

    #[async_trait]
    impl ScriptRunner for MockRunner {
        async fn run(&self, request: ExecutionRequest) -> Result<ExecutionResult, ExecutionError> {
            self.requests.lock().await.push(request);
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Ok(exit(0, "", "")))
        }

        fn health_status(&self) -> HealthStatus {
            HealthStatus {
                active_commands: 0,
                max_concurrent: 5,
                available: true,
                checked_at: Utc::now(),
            }
        }
    }

    fn exit(code: i32, stdout: &str, stderr: &str) -> ExecutionResult {
        ExecutionResult {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code: Some(code),
            duration: Duration::from_millis(25),
        }
    }

    fn gateway(runner: MockRunner) -> DhcpGateway<MockRunner> {
        DhcpGateway::new(runner, "/opt/dhcp/DHCPReservationManager", Duration::from_secs(30))
    }

    fn reservation() -> NewReservation {
        NewReservation {
            ip_address: "10.0.0.5".to_string(),
            client_id: "aa:bb:cc:dd:ee:ff".to_string(),
            name: Some("front desk printer".to_string()),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_add_reservation_returns_payload_unchanged() {
        let runner = MockRunner::new();
        let payload = json!({"IPAddress": "10.0.0.5", "ClientId": "AA-BB-CC-DD-EE-FF", "Name": "front desk printer"});
        runner
            .respond_stdout(&json!({"success": true, "data": payload.clone()}).to_string())
            .await;

        let created = gateway(runner.clone())
            .add_reservation("10.0.0.0", &reservation())
            .await
            .unwrap();
        assert_eq!(created, payload);

        let requests = runner.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].target,
            ScriptTarget::File(PathBuf::from(
                "/opt/dhcp/DHCPReservationManager/Public/Add-DHCPReservation.ps1"
            ))
        );
        assert_eq!(
            requests[0].params.names(),
            vec!["ScopeId", "IPAddress", "ClientId", "Name"]
        );
        assert_eq!(
            requests[0].params.get("ClientId").map(|v| v.to_string()),
            Some("AA-BB-CC-DD-EE-FF".to_string())
        );
        assert_eq!(requests[0].timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_add_reservation_structured_failure() {
        let runner = MockRunner::new();
        runner
            .respond_stdout(r#"{"success":false,"errorType":"DhcpError","message":"The specified IP address is in use"}"#)
            .await;

        let err = gateway(runner)
            .add_reservation("10.0.0.0", &reservation())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DhcpError);
        assert_eq!(err.status_hint, 409);
        assert_eq!(err.message, "The specified IP address is in use");
    }

    #[tokio::test]
    async fn test_remove_missing_reservation_is_idempotent() {
        let runner = MockRunner::new();
        runner
            .respond_stdout(r#"{"success":false,"errorType":"NotFound","message":"No reservation for AA-BB-CC-DD-EE-FF"}"#)
            .await;
        runner
            .respond(Ok(exit(1, "", "Remove-DhcpServerv4Reservation : Cannot find reservation")))
            .await;

        let gateway = gateway(runner);
        assert!(!gateway.remove_reservation("10.0.0.0", "AA-BB-CC-DD-EE-FF").await.unwrap());
        assert!(!gateway.remove_reservation("10.0.0.0", "AA-BB-CC-DD-EE-FF").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_reservation_other_failures_propagate() {
        let runner = MockRunner::new();
        runner.respond_stdout(r#"{"success":true}"#).await;
        runner
            .respond(Ok(exit(1, "", "Remove-DhcpServerv4Reservation : Access is denied.")))
            .await;
        runner
            .respond(Err(ExecutionError::Timeout {
                timeout: Duration::from_secs(30),
            }))
            .await;

        let gateway = gateway(runner);
        assert!(gateway.remove_reservation("10.0.0.0", "AA-BB-CC-DD-EE-FF").await.unwrap());

        let err = gateway.remove_reservation("10.0.0.0", "AA-BB-CC-DD-EE-FF").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PermissionDenied);

        let err = gateway.remove_reservation("10.0.0.0", "AA-BB-CC-DD-EE-FF").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_list_reservations_shapes() {
        let runner = MockRunner::new();
        runner.respond_stdout(r#"{"success":true,"data":[{"IPAddress":"10.0.0.5"},{"IPAddress":"10.0.0.6"}]}"#).await;
        runner.respond_stdout(r#"{"success":true,"data":{"IPAddress":"10.0.0.5"}}"#).await;
        runner.respond_stdout(r#"{"success":true}"#).await;

        let gateway = gateway(runner);
        assert_eq!(gateway.list_reservations("10.0.0.0").await.unwrap().len(), 2);
        assert_eq!(gateway.list_reservations("10.0.0.0").await.unwrap().len(), 1);
        assert!(gateway.list_reservations("10.0.0.0").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_reservation_without_data_is_not_found() {
        let runner = MockRunner::new();
        runner.respond_stdout(r#"{"success":true,"data":null}"#).await;

        let err = gateway(runner)
            .get_reservation("10.0.0.0", "AA-BB-CC-DD-EE-FF")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_reservation_only_sends_present_fields() {
        let runner = MockRunner::new();
        runner.respond_stdout(r#"{"success":true,"data":{"Name":"renamed"}}"#).await;

        let update = ReservationUpdate {
            name: Some("renamed".to_string()),
            description: Some("  ".to_string()),
            ..ReservationUpdate::default()
        };
        let updated = gateway(runner.clone())
            .update_reservation("10.0.0.0", "aa-bb-cc-dd-ee-ff", &update)
            .await
            .unwrap();
        assert_eq!(updated, json!({"Name": "renamed"}));

        let requests = runner.requests().await;
        assert_eq!(requests[0].params.names(), vec!["ScopeId", "ClientId", "Name"]);
    }

    #[tokio::test]
    async fn test_empty_update_never_reaches_runner() {
        let runner = MockRunner::new();
        let err = gateway(runner.clone())
            .update_reservation("10.0.0.0", "AA-BB-CC-DD-EE-FF", &ReservationUpdate::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::ValidationError);
        assert!(runner.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_leases_count_sources() {
        let runner = MockRunner::new();
        runner
            .respond_stdout(r#"{"success":true,"data":{"leases":[{"IPAddress":"10.0.0.20"}],"count":1}}"#)
            .await;
        runner
            .respond_stdout(r#"{"success":true,"data":[{"IPAddress":"10.0.0.20"},{"IPAddress":"10.0.0.21"}],"count":2}"#)
            .await;
        runner.respond_stdout(r#"{"success":true,"data":[]}"#).await;

        let gateway = gateway(runner);
        let report = gateway.list_leases("10.0.0.0").await.unwrap();
        assert_eq!(report.count, 1);
        assert_eq!(report.leases, json!([{"IPAddress": "10.0.0.20"}]));

        assert_eq!(gateway.list_leases("10.0.0.0").await.unwrap().count, 2);
        assert_eq!(gateway.list_leases("10.0.0.0").await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_malformed_output_is_never_an_empty_success() {
        let runner = MockRunner::new();
        runner.respond_stdout("WARNING: DhcpServer module not loaded").await;

        let err = gateway(runner).list_reservations("10.0.0.0").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ParseError);
    }

    #[tokio::test]
    async fn test_failure_document_on_nonzero_exit_is_used() {
        let runner = MockRunner::new();
        runner
            .respond(Ok(exit(
                1,
                r#"{"success":false,"errorType":"PermissionDenied","message":"Access denied"}"#,
                "",
            )))
            .await;

        let err = gateway(runner).list_leases("10.0.0.0").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PermissionDenied);
        assert_eq!(err.status_hint, 403);
    }

    #[tokio::test]
    async fn test_capacity_exhaustion_is_surfaced() {
        let runner = MockRunner::new();
        runner
            .respond(Err(ExecutionError::CapacityExhausted { max: 5 }))
            .await;

        let err = gateway(runner.clone()).list_reservations("10.0.0.0").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::CapacityExhausted);
        assert_eq!(runner.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_run_command_plain_text() {
        let runner = MockRunner::new();
        runner.respond_stdout("Running\n").await;

        let output = gateway(runner.clone())
            .run_command("Get-Service DHCPServer", ScriptParams::new())
            .await
            .unwrap();
        assert_eq!(output, InlineOutput::Text("Running\n".to_string()));
        assert_eq!(
            runner.requests().await[0].target,
            ScriptTarget::Inline("Get-Service DHCPServer".to_string())
        );
    }
}
