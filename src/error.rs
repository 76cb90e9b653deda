//! Error types for QueryBridge
//!
//! This module defines all error types used throughout the orchestration engine.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.

use std::fmt;
use thiserror::Error;

// ============================================================================
// Provider Error Classification
// ============================================================================

/// Structured provider error classification.
///
/// Provides fine-grained categorization of LLM provider HTTP errors so callers
/// can log and report them without string matching.
#[derive(Debug)]
pub enum ProviderError {
    /// 401: Invalid API key or authentication failure
    Auth(String),
    /// 429: Rate limit or quota exceeded
    RateLimit(String),
    /// 402: Payment required or billing issue
    Billing(String),
    /// 500/502/503/504: Server-side errors
    ServerError(String),
    /// 400: Bad request, invalid JSON, malformed parameters
    InvalidRequest(String),
    /// 404: Model not found or endpoint not available
    ModelNotFound(String),
    /// Connection or read timeout
    Timeout(String),
    /// Catch-all for unrecognized errors
    Unknown(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Auth(msg) => write!(f, "Authentication error: {}", msg),
            ProviderError::RateLimit(msg) => write!(f, "Rate limit error: {}", msg),
            ProviderError::Billing(msg) => write!(f, "Billing error: {}", msg),
            ProviderError::ServerError(msg) => write!(f, "Server error: {}", msg),
            ProviderError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ProviderError::ModelNotFound(msg) => write!(f, "Model not found: {}", msg),
            ProviderError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            ProviderError::Unknown(msg) => write!(f, "Unknown provider error: {}", msg),
        }
    }
}

impl ProviderError {
    /// Returns `true` if this error is transient.
    ///
    /// The engine never retries on its own; this is surfaced in logs so
    /// operators can tell a flaky upstream from a misconfiguration.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimit(_) | ProviderError::ServerError(_) | ProviderError::Timeout(_)
        )
    }

    /// Returns the HTTP status code associated with this error, if applicable.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::Auth(_) => Some(401),
            ProviderError::RateLimit(_) => Some(429),
            ProviderError::Billing(_) => Some(402),
            ProviderError::ServerError(_) => Some(500),
            ProviderError::InvalidRequest(_) => Some(400),
            ProviderError::ModelNotFound(_) => Some(404),
            ProviderError::Timeout(_) => None,
            ProviderError::Unknown(_) => None,
        }
    }
}

impl From<ProviderError> for BridgeError {
    fn from(err: ProviderError) -> Self {
        BridgeError::ProviderTyped(err)
    }
}

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for QueryBridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Configuration-related errors (invalid config, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider errors (API failures, malformed stream frames, etc.)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Structured provider error with HTTP classification.
    #[error("Provider error: {0}")]
    ProviderTyped(ProviderError),

    /// Tool executor failures that abort the turn.
    #[error("Tool error: {0}")]
    Tool(String),

    /// Thread state errors (invalid state, persistence failures, etc.)
    #[error("Session error: {0}")]
    Session(String),

    /// History sink errors
    #[error("History error: {0}")]
    History(String),

    /// The state machine ran past its step ceiling for one user turn.
    #[error("Iteration limit exhausted after {steps} steps (limit {limit})")]
    IterationExhausted { steps: u32, limit: u32 },

    /// The caller went away while the turn was running.
    #[error("Turn cancelled: caller disconnected")]
    Cancelled,

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Resource not found (threads, history records, tools, etc.)
    #[error("Not found: {0}")]
    NotFound(String),
}

/// How a failed turn is reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Step ceiling exceeded; reported with a dedicated error frame.
    IterationExhausted,
    /// Caller disconnected; nothing is reported.
    Cancelled,
    /// Model or tool failure; reported with an apology delta.
    Upstream,
}

impl BridgeError {
    /// Classify this error for frame emission.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::IterationExhausted { .. } => ErrorKind::IterationExhausted,
            BridgeError::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::Upstream,
        }
    }
}

/// A specialized `Result` type for QueryBridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
