//! Configuration types for QueryBridge
//!
//! Every section is `#[serde(default)]`, so a partial (or missing) config
//! file yields the documented defaults.

use serde::{Deserialize, Serialize};

use crate::agent::Route;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model and state-machine settings
    pub agents: AgentDefaults,
    /// Context-window budgets per stage
    pub window: WindowConfig,
    /// Intent router settings
    pub router: RouterConfig,
    /// Chat completions endpoint
    pub provider: ProviderConfig,
    /// Thread and history storage locations
    pub storage: StorageConfig,
    /// Logging output
    pub logging: LoggingConfig,
    /// Starter questions offered before the user types their own
    pub presets: Vec<String>,
}

// ============================================================================
// Agents
// ============================================================================

/// Model and state-machine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentDefaults {
    /// Model identifier sent to the provider
    pub model: String,
    /// Maximum tokens for each completion
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Total state-machine steps allowed per user turn
    pub step_limit: u32,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: "deepseek-chat".to_string(),
            max_tokens: 4096,
            temperature: 0.6,
            step_limit: 50,
        }
    }
}

// ============================================================================
// Window
// ============================================================================

/// Token budgets applied to each model invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Budget for the conversational responder
    pub chat_budget: usize,
    /// Budget for the data-query agent
    pub agent_budget: usize,
    /// Count system turns against `chat_budget`
    pub chat_counts_system: bool,
    /// Count system turns against `agent_budget`
    pub agent_counts_system: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            chat_budget: 6000,
            agent_budget: 5000,
            chat_counts_system: false,
            agent_counts_system: true,
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Intent router settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Number of recent human/assistant turns shown to the router
    pub lookback: usize,
    /// Route taken when the classification cannot be parsed
    pub fallback: Route,
    /// Retry once with a reinforced instruction before falling back
    pub retry_on_parse_failure: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            lookback: 3,
            fallback: Route::Chat,
            retry_on_parse_failure: true,
        }
    }
}

// ============================================================================
// Provider
// ============================================================================

/// OpenAI-compatible endpoint settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key for authentication
    pub api_key: Option<String>,
    /// Base URL, e.g. `https://api.deepseek.com/v1`
    pub api_base: Option<String>,
}

// ============================================================================
// Storage
// ============================================================================

/// Storage locations. Relative paths and `~` are expanded at use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one JSON file per thread (default `~/.querybridge/threads`)
    pub threads_dir: Option<String>,
    /// History log file (default `~/.querybridge/history.json`)
    pub history_file: Option<String>,
}

// ============================================================================
// Logging
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Component,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Optional log file; stderr when unset
    pub file: Option<String>,
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Component,
            file: None,
            level: "info".to_string(),
        }
    }
}
