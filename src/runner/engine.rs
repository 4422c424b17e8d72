//! External engine adapter
//!
//! Drives the native sandboxing engine as a child process. The engine owns
//! isolation, privilege dropping and limit enforcement; this adapter only
//! passes the request along and reads back the report.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::report::parse_report;
use super::{ExecutionDelegate, ExecutionRequest, RuntimeOutcome};
use crate::config::EngineConfig;

/// Delegate that spawns the configured engine binary once per run
#[derive(Debug, Clone)]
pub struct EngineProcess {
    config: EngineConfig,
}

impl EngineProcess {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Arguments passed to the engine for a request. The password is not
    /// among them; it goes through stdin.
    pub fn engine_args(&self, request: &ExecutionRequest) -> Vec<String> {
        let mut args = self.config.args.clone();
        args.extend([
            "--command".to_string(),
            request.command_line.clone(),
            "--user".to_string(),
            request.credentials.username.clone(),
        ]);
        if let Some(input) = &request.input_path {
            args.push("--stdin".to_string());
            args.push(input.to_string_lossy().to_string());
        }
        if let Some(output) = &request.output_path {
            args.push("--stdout".to_string());
            args.push(output.to_string_lossy().to_string());
        }
        args.extend([
            "--time".to_string(),
            request.limits.time_ms.to_string(),
            "--memory".to_string(),
            request.limits.memory_kb.to_string(),
        ]);
        args
    }
}

#[async_trait]
impl ExecutionDelegate for EngineProcess {
    async fn execute(&self, request: &ExecutionRequest) -> Result<RuntimeOutcome> {
        let args = self.engine_args(request);
        debug!("Running engine {} with args: {:?}", self.config.program, args);

        let mut child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn engine {}", self.config.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            let password = format!("{}\n", request.credentials.password);
            if let Err(e) = stdin.write_all(password.as_bytes()).await {
                // Engine may exit before reading; its status tells the story
                if e.kind() != ErrorKind::BrokenPipe {
                    return Err(e).context("Failed to pass credentials to engine");
                }
            }
        }

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for engine")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Engine exited with {}: {}", output.status, stderr.trim());
        }

        let report = String::from_utf8_lossy(&output.stdout);
        parse_report(&report).context("Failed to read engine report")
    }
}
