//! devtap configuration.
//!
//! Defaults come from a TOML file:
//! - Linux/macOS: `~/.config/devtap/devtap.toml`
//! - Windows: `%APPDATA%/devtap/devtap.toml`
//!
//! Command-line flags override the file.

use std::path::{Path, PathBuf};

use devtap_console_log::{CaptureConfig, OutputMode, PipelineConfig, parse_file_target};
use devtap_protocol::constants::{DEFAULT_CDP_ENDPOINT, parse_level_mask};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// File-backed configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Remote-debugging endpoint (`host:port`).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Page filter matched against target URL and title.
    #[serde(default)]
    pub tab: Option<String>,

    /// Log-file target (`file:<path>` or a path).
    #[serde(default)]
    pub output: Option<String>,

    #[serde(default)]
    pub mode: OutputMode,

    #[serde(default = "default_true")]
    pub timestamps: bool,

    #[serde(default = "default_true")]
    pub stack_traces: bool,

    #[serde(default = "default_true")]
    pub colors: bool,

    /// Comma separated console levels.
    #[serde(default = "default_levels")]
    pub levels: String,
}

fn default_endpoint() -> String {
    DEFAULT_CDP_ENDPOINT.into()
}

fn default_true() -> bool {
    true
}

fn default_levels() -> String {
    "all".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            tab: None,
            output: None,
            mode: OutputMode::default(),
            timestamps: default_true(),
            stack_traces: default_true(),
            colors: default_true(),
            levels: default_levels(),
        }
    }
}

impl Config {
    /// Loads `path`, or the default location when `None`.
    ///
    /// A missing file yields the defaults; nothing is written back.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path(),
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid configuration {}: {e}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Overrides file values with the flags given on the command line.
    pub fn merge_cli(mut self, cli: &Cli) -> Self {
        if let Some(endpoint) = &cli.endpoint {
            self.endpoint = endpoint.clone();
        }
        if cli.tab.is_some() {
            self.tab = cli.tab.clone();
        }
        if cli.output.is_some() {
            self.output = cli.output.clone();
        }
        if let Some(mode) = cli.mode {
            self.mode = mode;
        }
        if let Some(levels) = &cli.levels {
            self.levels = levels.clone();
        }
        self.timestamps &= !cli.no_timestamps;
        self.stack_traces &= !cli.no_stack;
        self.colors &= !cli.no_color;
        self
    }

    /// Builds the library configurations.
    pub fn into_settings(self, ws_url: Option<String>, command: Vec<String>) -> anyhow::Result<Settings> {
        let level_mask = parse_level_mask(&self.levels);
        if level_mask == 0 {
            anyhow::bail!("no known console level in '{}'", self.levels);
        }

        let file = self.output.as_deref().and_then(|target| {
            let file = parse_file_target(target);
            if file.is_none() {
                tracing::debug!(output = target, "not a file target, terminal only");
            }
            file
        });

        Ok(Settings {
            capture: CaptureConfig {
                endpoint: self.endpoint,
                ws_url,
                target_filter: self.tab.filter(|t| !t.trim().is_empty()),
            },
            pipeline: PipelineConfig {
                mode: self.mode,
                timestamps: self.timestamps,
                stack_traces: self.stack_traces,
                colors: self.colors,
                file,
                level_mask,
            },
            command,
        })
    }
}

/// Everything `run` needs.
#[derive(Debug, Clone)]
pub struct Settings {
    pub capture: CaptureConfig,
    pub pipeline: PipelineConfig,
    /// Companion command; empty when none.
    pub command: Vec<String>,
}

/// Returns the platform-specific configuration file path.
fn config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("devtap").join("devtap.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("devtap")
            .join("devtap.toml")
    }
}
