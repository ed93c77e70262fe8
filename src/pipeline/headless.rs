//! Headless agent executor.
//!
//! `HeadlessAgent` runs the configured agent CLI in non-interactive mode
//! (`-p` with JSON output) inside a workspace directory and parses the
//! result. Every pipeline stage is one such execution.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::config::DEFAULT_STAGE_TIMEOUT_SECS;
use crate::error::{Error, Result};
use crate::{rlog_debug, rlog_trace};

/// The result type from an agent execution.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultType {
    Success { output: String },
    Error { message: String },
}

/// Response from one headless execution.
#[derive(Debug, Clone)]
pub struct ClaudeResponse {
    pub session_id: Option<String>,
    pub result: ResultType,
    pub cost_usd: Option<f64>,
    pub duration_ms: Option<u64>,
    pub num_turns: Option<u32>,
}

impl ClaudeResponse {
    pub fn error(message: String) -> Self {
        Self {
            session_id: None,
            result: ResultType::Error { message },
            cost_usd: None,
            duration_ms: None,
            num_turns: None,
        }
    }

    pub fn success(output: String) -> Self {
        Self {
            session_id: None,
            result: ResultType::Success { output },
            cost_usd: None,
            duration_ms: None,
            num_turns: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, ResultType::Success { .. })
    }

    pub fn output(&self) -> Option<&str> {
        match &self.result {
            ResultType::Success { output } => Some(output),
            ResultType::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.result {
            ResultType::Success { .. } => None,
            ResultType::Error { message } => Some(message),
        }
    }

    /// The stage output, or `AgentExecutionFailed` for an error result.
    pub fn into_output(self) -> Result<String> {
        match self.result {
            ResultType::Success { output } => Ok(output),
            ResultType::Error { message } => Err(Error::AgentExecutionFailed(message)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawClaudeResponse {
    subtype: Option<String>,
    result: Option<String>,
    session_id: Option<String>,
    total_cost_usd: Option<f64>,
    duration_ms: Option<u64>,
    num_turns: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

/// Runs one prompt in one working directory.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute(&self, prompt: &str, cwd: &Path) -> Result<ClaudeResponse>;
}

#[derive(Debug, Clone)]
pub struct HeadlessAgent {
    binary: PathBuf,
    /// Extra arguments from the configured command, placed before `-p`.
    args: Vec<String>,
    output_format: String,
    timeout: Duration,
}

impl HeadlessAgent {
    /// Build from a command line such as `claude --dangerously-skip-permissions`.
    ///
    /// The program is resolved on `PATH`.
    pub fn from_command(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or(Error::ClaudeBinaryNotFound)?;
        let binary = which::which(program).map_err(|_| Error::ClaudeBinaryNotFound)?;
        Ok(Self::with_binary(binary).with_args(parts.map(str::to_string).collect()))
    }

    pub fn with_binary(binary: PathBuf) -> Self {
        Self {
            binary,
            args: Vec::new(),
            output_format: "json".to_string(),
            timeout: Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Parse the JSON document printed by `--output-format json`.
    pub fn parse_json_response(json_str: &str) -> Result<ClaudeResponse> {
        let raw: RawClaudeResponse = serde_json::from_str(json_str)?;

        let result = match raw.subtype.as_deref() {
            Some("success") => ResultType::Success {
                output: raw.result.unwrap_or_default(),
            },
            Some(subtype) if subtype.starts_with("error") => ResultType::Error {
                message: raw.error.or(raw.result).unwrap_or_else(|| subtype.to_string()),
            },
            _ => match (raw.error, raw.result) {
                (Some(error), _) => ResultType::Error { message: error },
                (None, Some(result)) => ResultType::Success { output: result },
                (None, None) => ResultType::Error {
                    message: "Unknown response format".to_string(),
                },
            },
        };

        Ok(ClaudeResponse {
            session_id: raw.session_id,
            result,
            cost_usd: raw.total_cost_usd,
            duration_ms: raw.duration_ms,
            num_turns: raw.num_turns,
        })
    }
}

#[async_trait]
impl AgentExecutor for HeadlessAgent {
    async fn execute(&self, prompt: &str, cwd: &Path) -> Result<ClaudeResponse> {
        rlog_debug!(
            "HeadlessAgent::execute binary={} cwd={} prompt_len={}",
            self.binary.display(),
            cwd.display(),
            prompt.len()
        );

        // kill_on_drop: a reset aborts the runner task, which must take the
        // child process down with it.
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.binary)
                .args(&self.args)
                .arg("-p")
                .arg(prompt)
                .arg("--output-format")
                .arg(&self.output_format)
                .current_dir(cwd)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| Error::Timeout(self.timeout))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        rlog_trace!("HeadlessAgent stdout: {}", stdout);

        if let Ok(response) = Self::parse_json_response(stdout.trim()) {
            return Ok(response);
        }

        if !output.status.success() {
            let message = if stderr.trim().is_empty() {
                format!(
                    "agent exited with code {}",
                    output.status.code().unwrap_or(-1)
                )
            } else {
                stderr.trim().to_string()
            };
            return Ok(ClaudeResponse::error(message));
        }

        Ok(ClaudeResponse::success(stdout.trim().to_string()))
    }
}
