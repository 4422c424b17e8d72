//! Engine report parser
//!
//! The engine prints `key:value` lines on stdout once the run finishes.
//! Unknown keys are ignored; `exitcode`, `time` and `memory` are required.

use anyhow::{Context, Result};

use super::RuntimeOutcome;

/// Parse the engine's report into a runtime outcome
pub fn parse_report(content: &str) -> Result<RuntimeOutcome> {
    let mut exit_code: Option<i32> = None;
    let mut time_used_ms: Option<u32> = None;
    let mut memory_used_kb: Option<u32> = None;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "exitcode" => {
                exit_code = Some(
                    value
                        .parse()
                        .with_context(|| format!("Invalid exitcode in engine report: {}", value))?,
                );
            }
            "time" => {
                time_used_ms = Some(
                    value
                        .parse()
                        .with_context(|| format!("Invalid time in engine report: {}", value))?,
                );
            }
            "memory" => {
                memory_used_kb = Some(
                    value
                        .parse()
                        .with_context(|| format!("Invalid memory in engine report: {}", value))?,
                );
            }
            _ => {}
        }
    }

    Ok(RuntimeOutcome {
        exit_code: exit_code.context("Engine report is missing exitcode")?,
        time_used_ms: time_used_ms.context("Engine report is missing time")?,
        memory_used_kb: memory_used_kb.context("Engine report is missing memory")?,
    })
}
