//! Language policy table
//!
//! Maps a language identifier to how its compiled artifact is run and how its
//! time limit is scaled. Loaded once at startup and shared read-only afterwards.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::command::FILENAME_PLACEHOLDER;
use crate::config::ConfigError;

/// How the runtime expects to be pointed at the compiled artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStyle {
    /// Executable is invoked by its file path
    #[default]
    Path,
    /// Runtime takes a classpath and a class name (e.g. `java -cp dir Main`)
    ClassName,
}

/// Run policy for a supported programming language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    /// Canonical language name (lowercase)
    pub name: String,
    /// Run command template containing `{filename}`
    pub run_command: String,
    pub invocation_style: InvocationStyle,
    /// actual_time = problem_time * time_multiplier
    pub time_multiplier: u32,
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
struct RawLanguageConfig {
    run_command: String,
    #[serde(default)]
    invocation_style: InvocationStyle,
    #[serde(default = "default_time_multiplier")]
    time_multiplier: u32,
    #[serde(default)]
    aliases: Vec<String>,
}

fn default_time_multiplier() -> u32 {
    1
}

/// Immutable lookup table of language policies
#[derive(Debug, Clone, Default)]
pub struct LanguageTable {
    languages: HashMap<String, Arc<Language>>,
}

impl LanguageTable {
    /// Parse the table bundled with the crate
    pub fn builtin() -> Result<Self, ConfigError> {
        let content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));
        Self::from_toml_str(content)
    }

    /// Load the table from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        // BTreeMap keeps alias collision errors deterministic
        let raw_configs: BTreeMap<String, RawLanguageConfig> = toml::from_str(content)?;
        let mut languages: HashMap<String, Arc<Language>> = HashMap::new();

        for (name, raw) in raw_configs {
            let name = name.to_lowercase();

            if !raw.run_command.contains(FILENAME_PLACEHOLDER) {
                return Err(ConfigError::MissingPlaceholder { language: name });
            }
            if raw.time_multiplier == 0 {
                return Err(ConfigError::InvalidMultiplier { language: name });
            }

            let language = Arc::new(Language {
                name: name.clone(),
                run_command: raw.run_command,
                invocation_style: raw.invocation_style,
                time_multiplier: raw.time_multiplier,
            });

            let keys = std::iter::once(name.clone())
                .chain(raw.aliases.iter().map(|alias| alias.to_lowercase()));
            for key in keys {
                if let Some(existing) = languages.get(&key) {
                    // Alias repeating the language's own name
                    if Arc::ptr_eq(existing, &language) {
                        continue;
                    }
                    return Err(ConfigError::DuplicateLanguage { name: key });
                }
                languages.insert(key, Arc::clone(&language));
            }
        }

        Ok(Self { languages })
    }

    /// Get language policy by identifier (case-insensitive)
    pub fn get(&self, language: &str) -> Result<Arc<Language>, ConfigError> {
        self.languages
            .get(&language.to_lowercase())
            .cloned()
            .ok_or_else(|| ConfigError::UnknownLanguage(language.to_string()))
    }

    /// All registered identifiers, aliases included
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.languages.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}
