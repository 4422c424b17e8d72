//! Execution and verdict control for an online judge.
//!
//! Given a compiled submission and a checkpoint, the [`judger::Judge`] renders
//! the run command, computes limits, hands the run to an external sandboxing
//! engine and classifies the result into a [`Verdict`].

pub mod command;
pub mod config;
pub mod core;
pub mod judger;
pub mod languages;
pub mod runner;

pub use config::{ConfigError, Credentials, EngineConfig, JudgeConfig};
pub use crate::core::{ClassificationPolicy, Verdict};
pub use judger::{checkpoint_output_path, CheckpointResult, Judge, Problem, Submission};
pub use languages::{InvocationStyle, Language, LanguageTable};
pub use runner::{EngineProcess, ExecutionDelegate, ExecutionRequest, RunLimits, RuntimeOutcome};
