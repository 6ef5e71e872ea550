//! Tool configuration loaded from YAML or JSON.
//!
//! Credential values may be given as `${ENV_VAR}` placeholders; they are
//! substituted from the environment before parsing so the file on disk
//! never has to hold a real token.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{MigrationError, Result};
use crate::retry::RetryPolicy;
use crate::types::{Mappings, PipelineScope};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationSettings {
    pub azure_devops: AzureDevOpsSettings,
    pub github: GitHubSettings,
    #[serde(default)]
    pub rates: RateSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub pipelines: PipelineSettings,
    #[serde(default)]
    pub git: GitSettings,
    #[serde(default)]
    pub output: OutputSettings,
    /// Source work item type -> target label.
    #[serde(default)]
    pub work_item_mapping: HashMap<String, String>,
    /// Source state -> target label.
    #[serde(default)]
    pub state_mapping: HashMap<String, String>,
    /// Source priority (stringified) -> target label.
    #[serde(default)]
    pub priority_mapping: HashMap<String, String>,
    /// Globally suppress issue migration regardless of per-unit flags.
    #[serde(default)]
    pub skip_issues: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureDevOpsSettings {
    pub organization: String,
    pub personal_access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSettings {
    pub token: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default = "default_true")]
    pub create_private_repos: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateSettings {
    #[serde(default = "default_rate")]
    pub max_calls_per_second: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: f64,
    #[serde(default = "default_backoff")]
    pub backoff_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default)]
    pub scope: PipelineScope,
    #[serde(default = "default_true")]
    pub exclude_disabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitSettings {
    #[serde(default = "default_git_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub verify_remote: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_output_dir")]
    pub output_directory: String,
}

fn default_true() -> bool {
    true
}
fn default_rate() -> f64 {
    10.0
}
fn default_attempts() -> u32 {
    3
}
fn default_initial_delay() -> f64 {
    1.0
}
fn default_backoff() -> f64 {
    2.0
}
fn default_git_timeout() -> u64 {
    600
}
fn default_output_dir() -> String {
    "migration-reports".to_string()
}

impl Default for RateSettings {
    fn default() -> Self {
        Self {
            max_calls_per_second: default_rate(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_attempts(),
            initial_delay_secs: default_initial_delay(),
            backoff_multiplier: default_backoff(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            scope: PipelineScope::default(),
            exclude_disabled: true,
        }
    }
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_git_timeout(),
            verify_remote: false,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            output_directory: default_output_dir(),
        }
    }
}

impl MigrationSettings {
    /// Load settings from a YAML or JSON file, substituting `${ENV_VAR}`
    /// placeholders first.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let substituted = substitute_env(&raw)?;

        let settings: Self = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&substituted)?
        } else {
            serde_yaml::from_str(&substituted)?
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.azure_devops.organization.trim().is_empty() {
            return Err(MigrationError::InvalidConfig(
                "azure_devops.organization must not be empty".into(),
            ));
        }
        if self.azure_devops.personal_access_token.trim().is_empty() {
            return Err(MigrationError::InvalidConfig(
                "azure_devops.personal_access_token must not be empty".into(),
            ));
        }
        if self.github.token.trim().is_empty() {
            return Err(MigrationError::InvalidConfig(
                "github.token must not be empty".into(),
            ));
        }
        if self.rates.max_calls_per_second <= 0.0 {
            return Err(MigrationError::InvalidConfig(
                "rates.max_calls_per_second must be positive".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(MigrationError::InvalidConfig(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_secs_f64(self.retry.initial_delay_secs),
            self.retry.backoff_multiplier,
        )
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git.timeout_secs)
    }

    pub fn mappings(&self) -> Mappings {
        Mappings {
            work_item_types: self.work_item_mapping.clone(),
            states: self.state_mapping.clone(),
            priorities: self.priority_mapping.clone(),
        }
    }
}

/// Replace `${NAME}` placeholders with environment values. Unresolved
/// placeholders are an error listing every missing variable.
fn substitute_env(raw: &str) -> Result<String> {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid pattern"));

    let mut missing = BTreeSet::new();
    let substituted = re.replace_all(raw, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match std::env::var(name) {
            Ok(value) => value,
            Err(_) => {
                missing.insert(name.to_string());
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(substituted.into_owned())
    } else {
        let names: Vec<String> = missing.into_iter().collect();
        Err(MigrationError::ValidationError(format!(
            "unresolved environment variables in config: {}",
            names.join(", ")
        )))
    }
}
