//! Runner configuration
//!
//! Everything here is fixed at process start and passed into the judge
//! explicitly; nothing is mutated afterwards.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::verdict::ClassificationPolicy;

/// Configuration errors. These must surface before judging starts and are
/// never reported as a verdict.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported language: {0}")]
    UnknownLanguage(String),

    #[error("run command for {language} has no {{filename}} placeholder")]
    MissingPlaceholder { language: String },

    #[error("time multiplier for {language} must be at least 1")]
    InvalidMultiplier { language: String },

    #[error("language name or alias registered twice: {name}")]
    DuplicateLanguage { name: String },

    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),

    #[error("failed to read {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid language table")]
    Parse(#[from] toml::de::Error),
}

/// OS account the submitted program is executed as
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// External execution engine binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Program to spawn
    pub program: String,
    /// Leading arguments placed before the per-run arguments
    pub args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "judger-core".to_string(),
            args: Vec::new(),
        }
    }
}

/// Runner configuration
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    pub credentials: Credentials,
    pub engine: EngineConfig,
    /// Language table path (None = bundled table)
    pub languages_path: Option<PathBuf>,
    pub classification: ClassificationPolicy,
}

impl JudgeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let username = lookup("JUDGE_SYSTEM_USERNAME")
            .ok_or(ConfigError::MissingEnv("JUDGE_SYSTEM_USERNAME"))?;
        let password = lookup("JUDGE_SYSTEM_PASSWORD")
            .ok_or(ConfigError::MissingEnv("JUDGE_SYSTEM_PASSWORD"))?;

        let mut engine = EngineConfig::default();
        if let Some(program) = lookup("JUDGE_ENGINE") {
            engine.program = program;
        }
        if let Some(args) = lookup("JUDGE_ENGINE_ARGS") {
            engine.args = args.split_whitespace().map(|s| s.to_string()).collect();
        }

        let classification = match lookup("JUDGE_LIMITS_FIRST").as_deref() {
            Some("true") | Some("1") => ClassificationPolicy::LimitsFirst,
            _ => ClassificationPolicy::TrustExitCode,
        };

        Ok(Self {
            credentials: Credentials::new(username, password),
            engine,
            languages_path: lookup("LANGUAGES_CONFIG").map(PathBuf::from),
            classification,
        })
    }
}
