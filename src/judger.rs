//! Judger module - per-checkpoint execution control
//!
//! Resolves limits and the command line for a submission, hands the run to the
//! execution delegate and classifies what comes back. Every call produces
//! exactly one `CheckpointResult`; delegate failures become `SystemError`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::command::build_command_line;
use crate::config::Credentials;
use crate::core::verdict::{classify, ClassificationPolicy, Verdict};
use crate::languages::Language;
use crate::runner::{ExecutionDelegate, ExecutionRequest, RunLimits, RuntimeOutcome};

/// Problem resource limits as declared by the problem setter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub time_limit_ms: u32,
    pub memory_limit_kb: u32,
}

/// A submission accepted for judging
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: i64,
    pub language: Arc<Language>,
    pub problem: Problem,
}

impl Submission {
    pub fn new(id: i64, language: Arc<Language>, problem: Problem) -> Self {
        Self {
            id,
            language,
            problem,
        }
    }
}

/// Result of judging one checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointResult {
    pub verdict: Verdict,
    /// ms
    pub time_used: u32,
    /// KB
    pub memory_used: u32,
}

impl CheckpointResult {
    fn system_error() -> Self {
        Self {
            verdict: Verdict::SystemError,
            time_used: 0,
            memory_used: 0,
        }
    }
}

/// Where the program's output for a checkpoint is written
pub fn checkpoint_output_path(work_dir: impl AsRef<Path>, checkpoint_id: u32) -> PathBuf {
    work_dir.as_ref().join(format!("output#{}", checkpoint_id))
}

/// Execution controller. Holds only immutable configuration and is cheap to
/// clone into concurrent tasks.
#[derive(Clone)]
pub struct Judge {
    delegate: Arc<dyn ExecutionDelegate>,
    credentials: Arc<Credentials>,
    policy: ClassificationPolicy,
}

impl Judge {
    pub fn new(
        delegate: Arc<dyn ExecutionDelegate>,
        credentials: Credentials,
        policy: ClassificationPolicy,
    ) -> Self {
        Self {
            delegate,
            credentials: Arc::new(credentials),
            policy,
        }
    }

    /// Run a submission against one checkpoint and classify the outcome.
    pub async fn evaluate_checkpoint(
        &self,
        submission: &Submission,
        checkpoint_id: u32,
        work_dir: &str,
        base_file_name: &str,
        input_path: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
    ) -> CheckpointResult {
        let command_line = build_command_line(&submission.language, work_dir, base_file_name);
        let limits = RunLimits::for_submission(submission);

        info!(
            "[Submission #{}] Start running checkpoint {} with command {} (TimeLimit={}, MemoryLimit={})",
            submission.id, checkpoint_id, command_line, limits.time_ms, limits.memory_kb
        );

        let request = ExecutionRequest {
            command_line,
            credentials: Arc::clone(&self.credentials),
            input_path: Some(input_path.as_ref().to_path_buf()),
            output_path: Some(output_path.as_ref().to_path_buf()),
            limits,
        };

        match self.delegate_run(&request).await {
            Ok(outcome) => {
                let verdict = classify(&outcome, &limits, self.policy);
                info!(
                    "[Submission #{}] Checkpoint {} finished: verdict={}, exit_code={}, time_used={}ms, memory_used={}KB",
                    submission.id,
                    checkpoint_id,
                    verdict.slug(),
                    outcome.exit_code,
                    outcome.time_used_ms,
                    outcome.memory_used_kb
                );
                CheckpointResult {
                    verdict,
                    time_used: outcome.time_used_ms,
                    memory_used: outcome.memory_used_kb,
                }
            }
            Err(e) => {
                error!(
                    submission_id = submission.id,
                    checkpoint_id,
                    command = %request.command_line,
                    time_limit_ms = limits.time_ms,
                    memory_limit_kb = limits.memory_kb,
                    "Execution delegate failed: {:#}",
                    e
                );
                CheckpointResult::system_error()
            }
        }
    }

    /// Run an arbitrary command line with the configured credentials.
    ///
    /// Used by collaborators that need a raw run (e.g. a compile stage).
    /// Returns `None` if the delegate fails.
    pub async fn run_command(
        &self,
        command_line: &str,
        input_path: Option<&Path>,
        output_path: Option<&Path>,
        limits: RunLimits,
    ) -> Option<RuntimeOutcome> {
        let request = ExecutionRequest {
            command_line: command_line.to_string(),
            credentials: Arc::clone(&self.credentials),
            input_path: input_path.map(Path::to_path_buf),
            output_path: output_path.map(Path::to_path_buf),
            limits,
        };

        match self.delegate_run(&request).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(
                    command = %command_line,
                    time_limit_ms = limits.time_ms,
                    memory_limit_kb = limits.memory_kb,
                    "Execution delegate failed: {:#}",
                    e
                );
                None
            }
        }
    }

    /// Call the delegate on its own task so a panic inside it is contained
    /// and reported like any other failure. The task is aborted if this
    /// future is dropped before it completes.
    async fn delegate_run(&self, request: &ExecutionRequest) -> anyhow::Result<RuntimeOutcome> {
        let delegate = Arc::clone(&self.delegate);
        let request = request.clone();

        let mut task = AbortOnDrop(tokio::spawn(async move { delegate.execute(&request).await }));
        match (&mut task.0).await {
            Ok(result) => result,
            Err(join_err) => Err(anyhow::anyhow!("Execution delegate aborted: {}", join_err)),
        }
    }
}

/// Owns a spawned task and aborts it when dropped
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::InvocationStyle;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// What the scripted delegate should do on `execute`
    enum Script {
        Return(RuntimeOutcome),
        Fail(&'static str),
        Panic,
    }

    /// Delegate returning a scripted outcome and recording requests
    struct ScriptedDelegate {
        script: Script,
        seen: Mutex<Vec<ExecutionRequest>>,
    }

    impl ScriptedDelegate {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ExecutionDelegate for ScriptedDelegate {
        async fn execute(&self, request: &ExecutionRequest) -> anyhow::Result<RuntimeOutcome> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.script {
                Script::Return(outcome) => Ok(*outcome),
                Script::Fail(msg) => Err(anyhow::anyhow!(*msg)),
                Script::Panic => panic!("engine crashed"),
            }
        }
    }

    fn outcome(exit_code: i32, time_used_ms: u32, memory_used_kb: u32) -> RuntimeOutcome {
        RuntimeOutcome {
            exit_code,
            time_used_ms,
            memory_used_kb,
        }
    }

    fn java_submission() -> Submission {
        let language = Language {
            name: "java".to_string(),
            run_command: "java -cp {filename}".to_string(),
            invocation_style: InvocationStyle::ClassName,
            time_multiplier: 2,
        };
        Submission::new(
            1001,
            Arc::new(language),
            Problem {
                time_limit_ms: 1000,
                memory_limit_kb: 262144,
            },
        )
    }

    fn c_submission() -> Submission {
        let language = Language {
            name: "c".to_string(),
            run_command: "{filename}".to_string(),
            invocation_style: InvocationStyle::Path,
            time_multiplier: 1,
        };
        Submission::new(
            1002,
            Arc::new(language),
            Problem {
                time_limit_ms: 1000,
                memory_limit_kb: 262144,
            },
        )
    }

    fn judge(delegate: Arc<ScriptedDelegate>) -> Judge {
        Judge::new(
            delegate,
            Credentials::new("judger", "secret"),
            ClassificationPolicy::default(),
        )
    }

    async fn evaluate(judge: &Judge, submission: &Submission) -> CheckpointResult {
        judge
            .evaluate_checkpoint(
                submission,
                1,
                "/tmp/job1",
                "Main",
                "/data/1.in",
                checkpoint_output_path("/tmp/job1", 1),
            )
            .await
    }

    #[tokio::test]
    async fn test_request_passed_to_delegate() {
        let delegate = ScriptedDelegate::new(Script::Return(outcome(0, 120, 4096)));
        let judge = judge(Arc::clone(&delegate));

        let result = evaluate(&judge, &java_submission()).await;
        assert_eq!(
            result,
            CheckpointResult {
                verdict: Verdict::Accepted,
                time_used: 120,
                memory_used: 4096,
            }
        );

        let seen = delegate.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let request = &seen[0];
        assert_eq!(request.command_line, "java -cp /tmp/job1 Main");
        assert_eq!(request.limits, RunLimits::new(2000, 262144));
        assert_eq!(request.credentials.username, "judger");
        assert_eq!(request.input_path, Some(PathBuf::from("/data/1.in")));
        assert_eq!(request.output_path, Some(PathBuf::from("/tmp/job1/output#1")));
    }

    #[tokio::test]
    async fn test_memory_limit_exceeded_scenario() {
        let delegate = ScriptedDelegate::new(Script::Return(outcome(1, 500, 300000)));
        let result = evaluate(&judge(delegate), &c_submission()).await;

        assert_eq!(result.verdict, Verdict::MemoryLimitExceeded);
        assert_eq!(result.time_used, 500);
        assert_eq!(result.memory_used, 300000);
    }

    #[tokio::test]
    async fn test_multiplied_time_limit_is_used_for_classification() {
        // 1500ms is over the problem limit but under the doubled Java limit
        let delegate = ScriptedDelegate::new(Script::Return(outcome(1, 1500, 100)));
        let judge = judge(delegate);

        assert_eq!(
            evaluate(&judge, &java_submission()).await.verdict,
            Verdict::RuntimeError
        );
        assert_eq!(
            evaluate(&judge, &c_submission()).await.verdict,
            Verdict::TimeLimitExceeded
        );
    }

    #[tokio::test]
    async fn test_delegate_failure_is_system_error() {
        let delegate = ScriptedDelegate::new(Script::Fail("credential rejected"));
        let result = evaluate(&judge(delegate), &c_submission()).await;

        assert_eq!(
            result,
            CheckpointResult {
                verdict: Verdict::SystemError,
                time_used: 0,
                memory_used: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_delegate_panic_is_system_error() {
        let delegate = ScriptedDelegate::new(Script::Panic);
        let result = evaluate(&judge(delegate), &java_submission()).await;

        assert_eq!(result.verdict, Verdict::SystemError);
        assert_eq!((result.time_used, result.memory_used), (0, 0));
    }

    /// Sleeps, then records that it ran to completion
    struct SlowDelegate {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ExecutionDelegate for SlowDelegate {
        async fn execute(&self, _request: &ExecutionRequest) -> anyhow::Result<RuntimeOutcome> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(outcome(0, 200, 10))
        }
    }

    #[tokio::test]
    async fn test_cancelled_evaluation_stops_delegate() {
        let finished = Arc::new(AtomicBool::new(false));
        let judge = Judge::new(
            Arc::new(SlowDelegate {
                finished: Arc::clone(&finished),
            }),
            Credentials::new("judger", "secret"),
            ClassificationPolicy::default(),
        );
        let submission = c_submission();

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), evaluate(&judge, &submission)).await;
        assert!(timed_out.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_limits_first_policy() {
        let delegate = ScriptedDelegate::new(Script::Return(outcome(0, 2500, 100)));
        let judge = Judge::new(
            delegate,
            Credentials::new("judger", "secret"),
            ClassificationPolicy::LimitsFirst,
        );

        assert_eq!(
            evaluate(&judge, &java_submission()).await.verdict,
            Verdict::TimeLimitExceeded
        );
    }

    #[tokio::test]
    async fn test_concurrent_checkpoints() {
        let delegate = ScriptedDelegate::new(Script::Return(outcome(0, 10, 10)));
        let judge = judge(Arc::clone(&delegate));
        let submission = Arc::new(c_submission());

        let mut tasks = tokio::task::JoinSet::new();
        for checkpoint_id in 0..8u32 {
            let judge = judge.clone();
            let submission = Arc::clone(&submission);
            tasks.spawn(async move {
                judge
                    .evaluate_checkpoint(
                        &submission,
                        checkpoint_id,
                        "/tmp/job1",
                        "main",
                        format!("/data/{}.in", checkpoint_id),
                        checkpoint_output_path("/tmp/job1", checkpoint_id),
                    )
                    .await
            });
        }

        let mut count = 0;
        while let Some(result) = tasks.join_next().await {
            assert_eq!(result.unwrap().verdict, Verdict::Accepted);
            count += 1;
        }
        assert_eq!(count, 8);
        assert_eq!(delegate.seen.lock().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_run_command() {
        let delegate = ScriptedDelegate::new(Script::Return(outcome(0, 3000, 50000)));
        let judge = judge(Arc::clone(&delegate));

        let result = judge
            .run_command("g++ -o /tmp/job1/main /tmp/job1/main.cpp", None, None, RunLimits::new(0, 0))
            .await;
        assert_eq!(result, Some(outcome(0, 3000, 50000)));
        assert_eq!(delegate.seen.lock().unwrap()[0].input_path, None);

        let failing = judge_failing();
        assert_eq!(failing.run_command("true", None, None, RunLimits::default()).await, None);
    }

    fn judge_failing() -> Judge {
        judge(ScriptedDelegate::new(Script::Fail("engine crash")))
    }

    #[test]
    fn test_checkpoint_output_path() {
        assert_eq!(
            checkpoint_output_path("/tmp/job1", 3),
            PathBuf::from("/tmp/job1/output#3")
        );
    }

    #[test]
    fn test_checkpoint_result_serialization() {
        let result = CheckpointResult {
            verdict: Verdict::TimeLimitExceeded,
            time_used: 2001,
            memory_used: 1024,
        };
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"verdict":"TLE","time_used":2001,"memory_used":1024}"#
        );
    }
}
