use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::info;

use judge_runner::{
    checkpoint_output_path, EngineProcess, Judge, JudgeConfig, LanguageTable, Problem,
    Submission, Verdict,
};

/// Job read from a file or stdin
#[derive(Debug, Serialize, Deserialize)]
pub struct RunJob {
    pub submission_id: i64,
    pub language: String,
    pub time_limit: u32, // ms
    pub memory_limit: u32, // KB
    pub work_directory: String,
    pub base_file_name: String,
    pub checkpoints: Vec<CheckpointInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckpointInfo {
    pub id: u32,
    pub input_path: PathBuf,
    /// Defaults to `<work_directory>/output#<id>`
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

/// Report written to stdout
#[derive(Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub submission_id: i64,
    pub results: Vec<CheckpointReport>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckpointReport {
    pub checkpoint_id: u32,
    pub verdict: Verdict,
    pub time_used: u32,
    pub memory_used: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("judge_runner=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let config = JudgeConfig::from_env()?;

    let languages = match &config.languages_path {
        Some(path) => {
            let table = LanguageTable::load(path)?;
            info!("Loaded language configurations from {:?}", path);
            table
        }
        None => {
            info!("Using bundled language configurations");
            LanguageTable::builtin()?
        }
    };

    info!("Registered {} language identifiers", languages.len());

    let job = read_job(std::env::args().nth(1))?;
    info!(
        "Received run job: submission_id={}, language={}, checkpoints={}",
        job.submission_id,
        job.language,
        job.checkpoints.len()
    );

    // Unknown languages are rejected here, before any checkpoint runs
    let language = languages.get(&job.language)?;
    let submission = Arc::new(Submission::new(
        job.submission_id,
        language,
        Problem {
            time_limit_ms: job.time_limit,
            memory_limit_kb: job.memory_limit,
        },
    ));

    let engine = EngineProcess::new(config.engine.clone());
    let judge = Judge::new(
        Arc::new(engine),
        config.credentials.clone(),
        config.classification,
    );

    let report = run_job(&judge, submission, &job).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn read_job(path: Option<String>) -> Result<RunJob> {
    let content = match path {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read job file {}", path))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read job from stdin")?;
            buf
        }
    };
    serde_json::from_str(&content).context("Failed to parse job")
}

/// Judge every checkpoint of a job concurrently
async fn run_job(judge: &Judge, submission: Arc<Submission>, job: &RunJob) -> Result<RunReport> {
    let mut tasks = JoinSet::new();

    for checkpoint in &job.checkpoints {
        let judge = judge.clone();
        let submission = Arc::clone(&submission);
        let work_directory = job.work_directory.clone();
        let base_file_name = job.base_file_name.clone();
        let checkpoint_id = checkpoint.id;
        let input_path = checkpoint.input_path.clone();
        let output_path = checkpoint
            .output_path
            .clone()
            .unwrap_or_else(|| checkpoint_output_path(&work_directory, checkpoint_id));

        tasks.spawn(async move {
            let result = judge
                .evaluate_checkpoint(
                    &submission,
                    checkpoint_id,
                    &work_directory,
                    &base_file_name,
                    input_path,
                    output_path,
                )
                .await;
            CheckpointReport {
                checkpoint_id,
                verdict: result.verdict,
                time_used: result.time_used,
                memory_used: result.memory_used,
            }
        });
    }

    let mut results = Vec::with_capacity(job.checkpoints.len());
    while let Some(report) = tasks.join_next().await {
        results.push(report.context("Checkpoint task aborted")?);
    }
    results.sort_by_key(|r| r.checkpoint_id);

    let accepted = results
        .iter()
        .filter(|r| r.verdict == Verdict::Accepted)
        .count();
    info!(
        "Job summary: submission_id={}, accepted={}/{}",
        job.submission_id,
        accepted,
        results.len()
    );

    Ok(RunReport {
        submission_id: job.submission_id,
        results,
    })
}
