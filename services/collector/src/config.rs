//! Collector configuration.
//!
//! Loaded from a YAML file. `${VAR}` and `${VAR:-default}` references are
//! expanded from the environment before parsing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;
use wmo_common::ReportDefinitions;

/// Default state file name inside the work directory.
pub const DEFAULT_STATE_FILE: &str = "collector_finfo.dat";

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Directory the bulletin files are dropped into.
    pub source_dir: PathBuf,
    /// Glob matched against file names in `source_dir`.
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
    /// Snapshots (under `tmp/`), the retry queue and test output.
    pub work_dir: PathBuf,
    /// Operator dumps of problematic input (under `bulletins/`).
    pub log_dir: PathBuf,
    #[serde(default)]
    pub state_file: Option<PathBuf>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_resend_interval")]
    pub resend_interval_secs: u64,
    /// Report types to collect, as `TYPE[:decoder]`.
    #[serde(default)]
    pub raports: Vec<String>,
    /// Keep snapshots after collecting them.
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub ignore_files_before_startup: bool,
    /// Observation service URLs; the first one is authoritative.
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_file_pattern() -> String {
    "*".to_string()
}

fn default_poll_interval() -> u64 {
    3
}

fn default_resend_interval() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    30
}

impl CollectorConfig {
    /// Load and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let config: Self = serde_yaml::from_str(&expanded)?;
        Ok(config)
    }

    /// Check the configuration before any work starts.
    ///
    /// Endpoints are only required when reports are actually sent.
    pub fn validate(&self, test_mode: bool) -> Result<()> {
        anyhow::ensure!(
            self.source_dir.is_dir(),
            "Source directory does not exist: {}",
            self.source_dir.display()
        );
        anyhow::ensure!(
            self.poll_interval_secs > 0,
            "poll_interval_secs must be greater than 0"
        );
        anyhow::ensure!(
            self.resend_interval_secs > 0,
            "resend_interval_secs must be greater than 0"
        );
        anyhow::ensure!(
            self.request_timeout_secs > 0,
            "request_timeout_secs must be greater than 0"
        );
        glob::Pattern::new(&self.file_pattern)
            .with_context(|| format!("Invalid file_pattern: {}", self.file_pattern))?;

        if !test_mode {
            anyhow::ensure!(
                !self.endpoints.is_empty(),
                "At least one endpoint must be configured"
            );
        }
        for url in &self.endpoints {
            let parsed = reqwest::Url::parse(url)
                .with_context(|| format!("Invalid endpoint URL: {}", url))?;
            anyhow::ensure!(
                matches!(parsed.scheme(), "http" | "https"),
                "Endpoint must be http or https: {}",
                url
            );
        }

        Ok(())
    }

    /// Create the work and log directories.
    pub async fn prepare_directories(&self) -> Result<()> {
        for dir in [
            self.work_dir.clone(),
            self.tmp_dir(),
            self.log_dir.clone(),
            self.bulletin_log_dir(),
        ] {
            tokio::fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.work_dir.join("tmp")
    }

    pub fn bulletin_log_dir(&self) -> PathBuf {
        self.log_dir.join("bulletins")
    }

    pub fn state_path(&self) -> PathBuf {
        match &self.state_file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.work_dir.join(path),
            None => self.work_dir.join(DEFAULT_STATE_FILE),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn resend_interval(&self) -> Duration {
        Duration::from_secs(self.resend_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn report_definitions(&self) -> ReportDefinitions {
        let defs = ReportDefinitions::from_entries(&self.raports);
        for def in defs.iter() {
            info!(report_type = %def.report_type, decoder = %def.decoder, "Collecting report type");
        }
        defs
    }
}

// ============================================================================
// Environment variable expansion
// ============================================================================

/// Expand `${VAR}` and `${VAR:-default}` references.
pub fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            let mut depth = 1;

            while depth > 0 {
                match chars.next() {
                    Some('{') => {
                        depth += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        depth -= 1;
                        if depth > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr))
    }
}
