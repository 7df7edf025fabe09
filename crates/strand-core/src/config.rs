use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StrandError};

/// Top-level Strand configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Defaults applied to every graph run started from the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Options used when a graph definition does not carry its own.
    #[serde(flatten)]
    pub options: GraphOptions,
    /// Deadline for a whole run, in seconds. None = no deadline.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Run-time bounds of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphOptions {
    /// Hard cap on total node executions in one run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

impl GraphOptions {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Reject options that could never allow a run to execute.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(StrandError::InvalidOptions(
                "max_iterations must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// tracing-subscriber configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// EnvFilter directive used when RUST_LOG is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_max_iterations() -> usize { 10 }
fn default_log_filter() -> String { "strand=info,warn".to_string() }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        load_toml(path)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Read a TOML file, expand `${ENV_VAR}` references, and deserialize it.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|_| StrandError::ConfigNotFound(path.display().to_string()))?;
    parse_toml(&content)
}

/// Deserialize TOML text after env var expansion.
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T> {
    let expanded = expand_env_vars(content);

    toml::from_str(&expanded).map_err(|e| StrandError::Config(e.to_string()))
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if !closed {
                // No closing brace: keep the rest of the input as written
                result.push_str("${");
                result.push_str(&var_name);
                break;
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                // Unset variables stay verbatim
                Err(_) => result.push_str(&format!("${{{}}}", var_name)),
            }
        } else {
            result.push(c);
        }
    }
    result
}
