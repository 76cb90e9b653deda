//! Configuration management for QueryBridge
//!
//! Configuration is loaded from `~/.querybridge/config.json`, then environment
//! variables of the form `QUERYBRIDGE_<SECTION>_<KEY>` are applied on top.

mod types;
pub mod validate;

pub use types::*;

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::agent::Route;
use crate::error::{BridgeError, Result};

impl Config {
    /// Returns the configuration directory path (~/.querybridge)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".querybridge")
    }

    /// Returns the path to the config file (~/.querybridge/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        // Agents
        if let Ok(val) = std::env::var("QUERYBRIDGE_AGENTS_MODEL") {
            self.agents.model = val;
        }
        override_parsed("QUERYBRIDGE_AGENTS_MAX_TOKENS", &mut self.agents.max_tokens);
        override_parsed("QUERYBRIDGE_AGENTS_TEMPERATURE", &mut self.agents.temperature);
        override_parsed("QUERYBRIDGE_AGENTS_STEP_LIMIT", &mut self.agents.step_limit);

        // Window
        override_parsed("QUERYBRIDGE_WINDOW_CHAT_BUDGET", &mut self.window.chat_budget);
        override_parsed("QUERYBRIDGE_WINDOW_AGENT_BUDGET", &mut self.window.agent_budget);

        // Router
        override_parsed("QUERYBRIDGE_ROUTER_LOOKBACK", &mut self.router.lookback);
        if let Ok(val) = std::env::var("QUERYBRIDGE_ROUTER_FALLBACK") {
            match val.parse::<Route>() {
                Ok(route) => self.router.fallback = route,
                Err(_) => warn!(value = %val, "Ignoring invalid QUERYBRIDGE_ROUTER_FALLBACK"),
            }
        }

        // Provider
        if let Ok(val) = std::env::var("QUERYBRIDGE_PROVIDER_API_KEY") {
            self.provider.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("QUERYBRIDGE_PROVIDER_API_BASE") {
            self.provider.api_base = Some(val);
        }

        // Storage
        if let Ok(val) = std::env::var("QUERYBRIDGE_STORAGE_THREADS_DIR") {
            self.storage.threads_dir = Some(val);
        }
        if let Ok(val) = std::env::var("QUERYBRIDGE_STORAGE_HISTORY_FILE") {
            self.storage.history_file = Some(val);
        }

        // Logging
        if let Ok(val) = std::env::var("QUERYBRIDGE_LOGGING_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Directory for thread files.
    pub fn threads_dir(&self) -> PathBuf {
        self.storage
            .threads_dir
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| Self::dir().join("threads"))
    }

    /// History log file.
    pub fn history_file(&self) -> PathBuf {
        self.storage
            .history_file
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| Self::dir().join("history.json"))
    }

    /// Reject settings the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Config` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let problems = validate::semantic_errors(self);
        match problems.into_iter().next() {
            Some(first) => Err(BridgeError::Config(first)),
            None => Ok(()),
        }
    }
}

fn override_parsed<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(val) = std::env::var(var) {
        match val.parse() {
            Ok(v) => *target = v,
            Err(_) => warn!(var, value = %val, "Ignoring unparseable environment override"),
        }
    }
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
