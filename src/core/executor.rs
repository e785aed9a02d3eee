use crate::core::binder::ArgumentBinder;
use crate::core::slots::ConcurrencyGate;
use crate::domain::model::{ExecutionRequest, ExecutionResult, HealthStatus, ScriptTarget};
use crate::domain::ports::{BridgeSettings, ScriptRunner};
use crate::utils::error::ExecutionError;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

pub const DEFAULT_INTERPRETER: &str = "powershell.exe";
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_INLINE_OUTPUT_SUFFIX: &str = "| ConvertTo-Json -Depth 10 -Compress";

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

pub fn default_file_flags() -> Vec<String> {
    [
        "-ExecutionPolicy",
        "Bypass",
        "-NoProfile",
        "-NonInteractive",
        "-OutputFormat",
        "Text",
        "-File",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn default_command_flags() -> Vec<String> {
    ["-ExecutionPolicy", "Bypass", "-NoProfile", "-NonInteractive", "-Command"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub interpreter: String,
    /// Placed before the script path for file targets.
    pub file_flags: Vec<String>,
    /// Placed before the command string for inline targets.
    pub command_flags: Vec<String>,
    /// Appended to every inline command, normally a JSON conversion pipe.
    pub inline_output_suffix: String,
    pub max_concurrent: usize,
    pub max_output_bytes: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            file_flags: default_file_flags(),
            command_flags: default_command_flags(),
            inline_output_suffix: DEFAULT_INLINE_OUTPUT_SUFFIX.to_string(),
            max_concurrent: 5,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl ExecutorConfig {
    pub fn from_settings<S: BridgeSettings + ?Sized>(settings: &S) -> Self {
        Self {
            interpreter: settings.interpreter().to_string(),
            file_flags: settings.execution_flags().to_vec(),
            command_flags: settings.command_flags().to_vec(),
            inline_output_suffix: settings.inline_output_suffix().to_string(),
            max_concurrent: settings.max_concurrent(),
            max_output_bytes: settings.max_output_bytes(),
        }
    }
}

/// Spawns the interpreter for each request, bounded by a fail-fast slot pool.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    config: ExecutorConfig,
    gate: ConcurrencyGate,
}

impl ProcessExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        let gate = ConcurrencyGate::new(config.max_concurrent);
        Self { config, gate }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Interpreter arguments for `request`, excluding the interpreter itself.
    pub fn build_args(&self, request: &ExecutionRequest) -> Result<Vec<String>, ExecutionError> {
        match &request.target {
            ScriptTarget::File(path) => {
                let mut args = self.config.file_flags.clone();
                args.push(path.to_string_lossy().into_owned());
                args.extend(ArgumentBinder::bind_argv(&request.params)?);
                Ok(args)
            }
            ScriptTarget::Inline(cmdlet) => {
                let mut command = cmdlet.trim().to_string();
                let fragment = ArgumentBinder::command_fragment(&request.params)?;
                for part in [fragment.as_str(), self.config.inline_output_suffix.trim()] {
                    if !part.is_empty() {
                        command.push(' ');
                        command.push_str(part);
                    }
                }
                let mut args = self.config.command_flags.clone();
                args.push(command);
                Ok(args)
            }
        }
    }

    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult, ExecutionError> {
        let args = self.build_args(&request)?;

        let _slot = match self.gate.try_acquire() {
            Ok(slot) => slot,
            Err(err) => {
                tracing::warn!(
                    script = %request.target,
                    max_concurrent = self.gate.max(),
                    "Script execution limit reached"
                );
                return Err(err);
            }
        };

        tracing::debug!(
            script = %request.target,
            params = ?request.params.names(),
            active = self.gate.in_flight(),
            "Executing script"
        );

        let started = Instant::now();
        let mut command = Command::new(&self.config.interpreter);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        let mut child = command.spawn().map_err(ExecutionError::Spawn)?;
        let limit = self.config.max_output_bytes;
        let stdout = read_capped(child.stdout.take(), limit);
        let stderr = read_capped(child.stderr.take(), limit);

        let outcome = tokio::time::timeout(request.timeout, async {
            tokio::try_join!(stdout, stderr, async {
                child.wait().await.map_err(ExecutionError::Io)
            })
        })
        .await;

        let (stdout, stderr, status) = match outcome {
            Ok(Ok(captured)) => captured,
            Ok(Err(err)) => {
                let _ = child.kill().await;
                tracing::error!(script = %request.target, error = %err, "Script execution failed");
                return Err(err);
            }
            Err(_) => {
                let _ = child.kill().await;
                tracing::error!(
                    script = %request.target,
                    timeout_ms = request.timeout.as_millis() as u64,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Script execution timed out"
                );
                return Err(ExecutionError::Timeout {
                    timeout: request.timeout,
                });
            }
        };

        let result = ExecutionResult {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code: status.code(),
            duration: started.elapsed(),
        };

        if !result.stderr.trim().is_empty() {
            tracing::warn!(
                script = %request.target,
                stderr = %result.stderr.trim(),
                duration_ms = result.duration.as_millis() as u64,
                "Script wrote to stderr"
            );
        }

        tracing::debug!(
            script = %request.target,
            exit_code = ?result.exit_code,
            duration_ms = result.duration.as_millis() as u64,
            "Script completed"
        );

        Ok(result)
    }

    pub fn health_status(&self) -> HealthStatus {
        HealthStatus {
            active_commands: self.gate.in_flight(),
            max_concurrent: self.gate.max(),
            available: self.gate.has_capacity(),
            checked_at: chrono::Utc::now(),
        }
    }
}

#[async_trait]
impl ScriptRunner for ProcessExecutor {
    async fn run(&self, request: ExecutionRequest) -> Result<ExecutionResult, ExecutionError> {
        self.execute(request).await
    }

    fn health_status(&self) -> HealthStatus {
        ProcessExecutor::health_status(self)
    }
}

/// Reads a pipe to the end, failing once more than `limit` bytes arrive.
async fn read_capped<R: AsyncRead + Unpin>(
    reader: Option<R>,
    limit: usize,
) -> Result<Vec<u8>, ExecutionError> {
    let Some(reader) = reader else {
        return Ok(Vec::new());
    };

    let mut buf = Vec::new();
    reader.take(limit as u64 + 1).read_to_end(&mut buf).await?;
    if buf.len() > limit {
        return Err(ExecutionError::OutputLimitExceeded { limit });
    }
    Ok(buf)
}
