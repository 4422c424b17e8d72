use serde::{Deserialize, Serialize};
use std::fmt;

use crate::runner::{RunLimits, RuntimeOutcome};

/// Verdict of a single checkpoint run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "AC")]
    Accepted,
    #[serde(rename = "TLE")]
    TimeLimitExceeded,
    #[serde(rename = "MLE")]
    MemoryLimitExceeded,
    #[serde(rename = "RE")]
    RuntimeError,
    #[serde(rename = "SE")]
    SystemError,
}

impl Verdict {
    /// Short slug used on the wire
    pub fn slug(&self) -> &'static str {
        match self {
            Verdict::Accepted => "AC",
            Verdict::TimeLimitExceeded => "TLE",
            Verdict::MemoryLimitExceeded => "MLE",
            Verdict::RuntimeError => "RE",
            Verdict::SystemError => "SE",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Accepted => "accepted",
            Verdict::TimeLimitExceeded => "time_limit_exceeded",
            Verdict::MemoryLimitExceeded => "memory_limit_exceeded",
            Verdict::RuntimeError => "runtime_error",
            Verdict::SystemError => "system_error",
        };
        write!(f, "{}", s)
    }
}

/// Order in which the exit code and the measured usage are consulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassificationPolicy {
    /// A zero exit code is accepted outright; the engine is trusted to kill
    /// over-limit processes with a non-zero status.
    #[default]
    TrustExitCode,
    /// Limit breaches win over a clean exit. A zero limit never counts as breached.
    LimitsFirst,
}

/// Classify a raw runtime outcome.
///
/// Never yields `SystemError`; that verdict belongs to the caller when no
/// outcome could be obtained at all.
pub fn classify(
    outcome: &RuntimeOutcome,
    limits: &RunLimits,
    policy: ClassificationPolicy,
) -> Verdict {
    match policy {
        ClassificationPolicy::TrustExitCode => {
            if outcome.exit_code == 0 {
                // Output is compared in a later stage
                Verdict::Accepted
            } else if outcome.time_used_ms > limits.time_ms {
                Verdict::TimeLimitExceeded
            } else if outcome.memory_used_kb > limits.memory_kb {
                Verdict::MemoryLimitExceeded
            } else {
                Verdict::RuntimeError
            }
        }
        ClassificationPolicy::LimitsFirst => {
            if limits.time_ms != 0 && outcome.time_used_ms > limits.time_ms {
                Verdict::TimeLimitExceeded
            } else if limits.memory_kb != 0 && outcome.memory_used_kb > limits.memory_kb {
                Verdict::MemoryLimitExceeded
            } else if outcome.exit_code == 0 {
                Verdict::Accepted
            } else {
                Verdict::RuntimeError
            }
        }
    }
}
