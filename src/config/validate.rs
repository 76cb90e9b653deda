//! Configuration validation with unknown field detection.

use serde_json::{Map, Value};
use std::collections::HashSet;

use super::Config;

/// Known top-level config field names.
const KNOWN_TOP_LEVEL: &[&str] = &[
    "agents", "window", "router", "provider", "storage", "logging", "presets",
];

/// Known fields for each section.
const KNOWN_SECTIONS: &[(&str, &[&str])] = &[
    ("agents", &["model", "max_tokens", "temperature", "step_limit"]),
    (
        "window",
        &[
            "chat_budget",
            "agent_budget",
            "chat_counts_system",
            "agent_counts_system",
        ],
    ),
    ("router", &["lookback", "fallback", "retry_on_parse_failure"]),
    ("provider", &["api_key", "api_base"]),
    ("storage", &["threads_dir", "history_file"]),
    ("logging", &["format", "file", "level"]),
];

/// A validation diagnostic.
#[derive(Debug)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub path: String,
    pub message: String,
}

#[derive(Debug, PartialEq)]
pub enum DiagnosticLevel {
    Ok,
    Warn,
    Error,
}

impl Diagnostic {
    fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            path: path.into(),
            message: message.into(),
        }
    }

    fn ok(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Ok,
            path: String::new(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.level {
            DiagnosticLevel::Ok => "[OK]",
            DiagnosticLevel::Warn => "[WARN]",
            DiagnosticLevel::Error => "[ERROR]",
        };
        if self.path.is_empty() {
            write!(f, "{} {}", prefix, self.message)
        } else {
            write!(f, "{} {}: {}", prefix, self.path, self.message)
        }
    }
}

/// Simple Levenshtein distance for "did you mean?" suggestions.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.iter().enumerate() {
        let mut row = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            row[j + 1] = (prev[j + 1] + 1).min(row[j] + 1).min(prev[j] + cost);
        }
        prev = row;
    }
    prev[b.len()]
}

/// Suggest the closest known field name (if distance <= 3).
pub fn suggest_field(unknown: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .map(|k| (k, levenshtein(unknown, k)))
        .filter(|(_, d)| *d <= 3)
        .min_by_key(|(_, d)| *d)
        .map(|(k, _)| format!("did you mean '{}'?", k))
}

fn check_keys(
    obj: &Map<String, Value>,
    known: &[&str],
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    let known_set: HashSet<&str> = known.iter().copied().collect();
    let mut has_unknown = false;
    for key in obj.keys() {
        if known_set.contains(key.as_str()) {
            continue;
        }
        has_unknown = true;
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        let msg = match suggest_field(key, known) {
            Some(suggestion) => format!("Unknown field '{}', {}", key, suggestion),
            None => format!("Unknown field '{}'", key),
        };
        diagnostics.push(Diagnostic::error(path, msg));
    }
    has_unknown
}

/// Validate a raw JSON config value against known field names.
pub fn validate_config(raw: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let Some(obj) = raw.as_object() else {
        diagnostics.push(Diagnostic::error("", "Config must be a JSON object"));
        return diagnostics;
    };
    diagnostics.push(Diagnostic::ok("Valid JSON"));

    let mut has_unknown = check_keys(obj, KNOWN_TOP_LEVEL, "", &mut diagnostics);
    for (section, fields) in KNOWN_SECTIONS {
        if let Some(inner) = obj.get(*section).and_then(|v| v.as_object()) {
            has_unknown |= check_keys(inner, fields, section, &mut diagnostics);
        }
    }

    if !has_unknown {
        diagnostics.push(Diagnostic::ok("All fields recognized"));
    }

    if obj
        .get("provider")
        .and_then(|p| p.get("api_key"))
        .and_then(|k| k.as_str())
        .is_some_and(|k| !k.is_empty())
    {
        diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Warn,
            path: "provider.api_key".to_string(),
            message: "Stored in plain text, prefer QUERYBRIDGE_PROVIDER_API_KEY".to_string(),
        });
    }

    diagnostics
}

/// Settings the engine cannot run with.
pub fn semantic_errors(config: &Config) -> Vec<String> {
    let mut errors = Vec::new();
    if config.window.chat_budget == 0 {
        errors.push("window.chat_budget must be greater than zero".to_string());
    }
    if config.window.agent_budget == 0 {
        errors.push("window.agent_budget must be greater than zero".to_string());
    }
    if config.agents.step_limit == 0 {
        errors.push("agents.step_limit must be greater than zero".to_string());
    }
    if config.router.lookback == 0 {
        errors.push("router.lookback must be greater than zero".to_string());
    }
    if !(0.0..=2.0).contains(&config.agents.temperature) {
        errors.push(format!(
            "agents.temperature must be within [0, 2], got {}",
            config.agents.temperature
        ));
    }
    errors
}
