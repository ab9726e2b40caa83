use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::autofill::orchestrator::{Autofill, DEFAULT_THRESHOLD};
use crate::browser::session::DEFAULT_SCRIPT;
use crate::matching::engine::{MAX_ATTEMPTS, MatchingEngine, RetryPolicy};
use crate::profile::profile_model::{Credential, ProviderKind};
use crate::provider::{CompletionOptions, ProviderSettings, build_provider};
use crate::trace::logger::TraceLogger;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "form-autofill",
    version,
    about = "Fill web forms from a stored profile using a language model"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: form-autofill.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Path to the credential/profile store file
    #[arg(long, global = true)]
    pub store: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open a page and fill its form fields from the active profile
    Fill {
        /// URL of the page containing the form
        #[arg(long)]
        url: String,

        /// Minimum confidence (exclusive) required to fill a field, 0 to 1
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,

        /// Match against a scanned copy of the page without writing to it
        #[arg(long)]
        dry_run: bool,
    },

    /// Match a single field description against the active profile
    Match {
        /// Field name attribute
        #[arg(long)]
        name: String,

        /// Input type attribute
        #[arg(long = "type", default_value = "text")]
        input_type: String,

        /// Visible label text
        #[arg(long)]
        label: Option<String>,

        /// Placeholder text
        #[arg(long)]
        placeholder: Option<String>,
    },

    /// Manage stored profiles
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },

    /// Manage the provider API key
    Key {
        #[command(subcommand)]
        action: KeyCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// List stored profiles
    List,

    /// Show one profile (default: the active one)
    Show { id: Option<String> },

    /// Add a profile from KEY=VALUE pairs
    Add {
        #[arg(long)]
        name: String,

        entries: Vec<String>,
    },

    /// Set KEY=VALUE pairs on an existing profile
    Update {
        id: String,

        /// Rename the profile
        #[arg(long)]
        name: Option<String>,

        /// Keys to remove
        #[arg(long = "remove-key")]
        remove_keys: Vec<String>,

        entries: Vec<String>,
    },

    /// Delete a profile
    Remove { id: String },

    /// Select the profile used for autofill
    Use { id: String },
}

#[derive(Subcommand, Debug)]
pub enum KeyCommand {
    /// Store an API key for a provider (openai, anthropic, ollama, mock)
    Set {
        #[arg(long)]
        provider: ProviderKind,

        #[arg(long, default_value = "")]
        key: String,
    },

    /// Show the configured provider and a masked key
    Show,

    /// Remove the stored key
    Clear,
}

/// Threshold flag: a finite number in `[0, 1]`.
pub fn parse_threshold(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", raw))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("threshold must be between 0 and 1, got '{}'", raw));
    }
    Ok(value)
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `form-autofill.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub autofill: AutofillConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutofillConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    pub trace_path: Option<String>,
}

impl Default for AutofillConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            trace_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub model: Option<String>,
    pub endpoint: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: None,
            endpoint: None,
            timeout_secs: 30,
            temperature: 0.3,
            max_tokens: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_script")]
    pub script: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            script: default_script(),
        }
    }
}

// Serde default helpers
fn default_threshold() -> f64 { DEFAULT_THRESHOLD }
fn default_max_attempts() -> u32 { MAX_ATTEMPTS }
fn default_base_delay_ms() -> u64 { 1000 }
fn default_timeout_secs() -> u64 { 30 }
fn default_temperature() -> f32 { 0.3 }
fn default_max_tokens() -> u32 { 256 }
fn default_store_path() -> String { "form-autofill-store.json".to_string() }
fn default_script() -> String { DEFAULT_SCRIPT.to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("form-autofill.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            warn!(path = config_path, error = %e, "malformed config file, using defaults");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Builders (merge CLI args with config file)
// ============================================================================

pub fn completion_options(config: &ProviderConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        timeout: Duration::from_secs(config.timeout_secs),
    }
}

pub fn retry_policy(config: &RetryConfig) -> RetryPolicy {
    RetryPolicy::new(config.max_attempts, Duration::from_millis(config.base_delay_ms))
}

/// Matching engine for the stored credential's provider.
pub fn build_engine(credential: &Credential, config: &AppConfig) -> MatchingEngine {
    let settings = ProviderSettings {
        model: config.provider.model.clone(),
        endpoint: config.provider.endpoint.clone(),
    };
    MatchingEngine::new(build_provider(credential, &settings))
        .with_options(completion_options(&config.provider))
        .with_retry(retry_policy(&config.retry))
}

/// Orchestrator with the threshold resolved CLI > config > default.
pub fn build_autofill(config: &AutofillConfig, threshold: Option<f64>) -> Autofill {
    let autofill = Autofill::new(threshold.unwrap_or(config.threshold));
    match &config.trace_path {
        Some(path) => autofill.with_tracer(TraceLogger::new(path)),
        None => autofill,
    }
}

/// Store path resolved CLI > config > default.
pub fn resolve_store_path<'a>(cli_store: Option<&'a str>, config: &'a AppConfig) -> &'a str {
    cli_store.unwrap_or(&config.store.path)
}
