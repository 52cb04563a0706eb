//! Shell Command Tool

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use agent_core::{
    AgentError, Result, Tool, ToolResult, ToolSchema, parse_input, tool::ParameterSchema,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::ToolsConfig;

/// Bytes kept from each of stdout and stderr
const MAX_STREAM_BYTES: usize = 20_000;

/// Run a command through the platform shell
pub struct ShellExecTool {
    config: Arc<ToolsConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShellParams {
    command: String,
    timeout_ms: Option<u64>,
    cwd: Option<String>,
}

impl ShellExecTool {
    pub const fn new(config: Arc<ToolsConfig>) -> Self {
        Self { config }
    }

    fn shell() -> (&'static str, &'static str) {
        if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        }
    }
}

#[async_trait]
impl Tool for ShellExecTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "shell_exec".into(),
            description: "Execute a shell command in the workspace directory. \
                          Returns exitCode, stdout and stderr."
                .into(),
            parameters: vec![
                ParameterSchema::required("command", "string", "The shell command to execute"),
                ParameterSchema::optional(
                    "timeoutMs",
                    "integer",
                    "Timeout in milliseconds (default 30000)",
                ),
                ParameterSchema::optional(
                    "cwd",
                    "string",
                    "Working directory, relative to the workspace",
                ),
            ],
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let params: ShellParams = parse_input(input)?;
        if params.command.trim().is_empty() {
            return Err(AgentError::ToolValidation("command must not be empty".into()));
        }

        let cwd = params.cwd.as_deref().map_or_else(
            || self.config.workspace_root.clone(),
            |dir| self.config.resolve_path(dir),
        );
        let timeout = params
            .timeout_ms
            .map_or(self.config.shell_timeout, Duration::from_millis);

        tracing::info!(command = %params.command, cwd = %cwd.display(), "shell_exec");

        let (shell, flag) = Self::shell();
        let mut child = Command::new(shell)
            .arg(flag)
            .arg(&params.command)
            .current_dir(&cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AgentError::ToolExecution(format!("failed to spawn shell: {e}")))?;

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let collect = async {
            tokio::try_join!(
                read_capped(stdout_pipe, MAX_STREAM_BYTES),
                read_capped(stderr_pipe, MAX_STREAM_BYTES),
                child.wait(),
            )
        };

        // A timed-out child is killed when `child` drops on return
        let (stdout, stderr, status) = tokio::time::timeout(timeout, collect)
            .await
            .map_err(|_| {
                AgentError::ToolExecution(format!(
                    "command timed out after {} ms",
                    timeout.as_millis()
                ))
            })?
            .map_err(|e| AgentError::ToolExecution(format!("reading command output: {e}")))?;

        let exit_code = status.code().unwrap_or(-1);
        let result = ToolResult::structured(json!({
            "exitCode": exit_code,
            "stdout": stdout,
            "stderr": stderr,
        }));

        if status.success() {
            Ok(result)
        } else {
            tracing::debug!(exit_code, "shell_exec exited non-zero");
            Ok(result.with_details(json!({ "error": true, "exitCode": exit_code })))
        }
    }
}

/// Keep the first `max_bytes` of a pipe and drain the rest
///
/// Draining keeps the child from blocking on a full pipe.
async fn read_capped<R>(pipe: Option<R>, max_bytes: usize) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let Some(mut pipe) = pipe else {
        return Ok(String::new());
    };

    let mut kept = Vec::new();
    (&mut pipe).take(max_bytes as u64).read_to_end(&mut kept).await?;
    let dropped = tokio::io::copy(&mut pipe, &mut tokio::io::sink()).await?;

    let text = String::from_utf8_lossy(&kept);
    if dropped == 0 {
        Ok(text.into_owned())
    } else {
        Ok(format!("{text}\n... [truncated, {dropped} more bytes]"))
    }
}
