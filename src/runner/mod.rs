//! Runner module - execution delegate seam
//!
//! The judge never spawns submitted programs itself. It hands a rendered
//! command line, credentials, I/O paths and limits to an `ExecutionDelegate`
//! and gets back the raw exit code and resource usage.
//!
//! The runner module does NOT:
//! - Interpret outcomes into verdicts
//! - Know about languages or templates
//! - Enforce limits (the engine does)

pub mod engine;
pub mod report;

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Credentials;
use crate::judger::Submission;

pub use engine::EngineProcess;

/// Resource limits for one run. Zero means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunLimits {
    /// Time limit in milliseconds
    pub time_ms: u32,
    /// Memory limit in KB
    pub memory_kb: u32,
}

impl RunLimits {
    pub fn new(time_ms: u32, memory_kb: u32) -> Self {
        Self { time_ms, memory_kb }
    }

    /// Effective limits for a submission: the problem's time limit scaled by
    /// the language multiplier, the memory limit as declared.
    pub fn for_submission(submission: &Submission) -> Self {
        let time_ms = submission
            .problem
            .time_limit_ms
            .saturating_mul(submission.language.time_multiplier);
        Self::new(time_ms, submission.problem.memory_limit_kb)
    }
}

/// Raw result reported by the execution engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeOutcome {
    pub exit_code: i32,
    /// CPU time used in milliseconds
    pub time_used_ms: u32,
    /// Peak memory used in KB
    pub memory_used_kb: u32,
}

/// Everything the engine needs for one run
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub command_line: String,
    pub credentials: Arc<Credentials>,
    /// File redirected to stdin (None = no redirection)
    pub input_path: Option<PathBuf>,
    /// File receiving stdout (None = no redirection)
    pub output_path: Option<PathBuf>,
    pub limits: RunLimits,
}

/// Sandboxed execution engine
#[async_trait]
pub trait ExecutionDelegate: Send + Sync {
    /// Run the request to completion. Any error means no usable outcome.
    async fn execute(&self, request: &ExecutionRequest) -> Result<RuntimeOutcome>;
}
