//! Runtime preferences
//!
//! User-adjustable behaviour that stays inside the compile-time limits.
//! Defaults come from `CAL_*` environment variables; a TOML file can
//! override them through [`RuntimeConfig::from_toml_str`].

use serde::{Deserialize, Serialize};
use std::env;

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserPreferences {
    /// Keep skipped-region records on the parse output (debugging only)
    pub record_skipped_regions: bool,

    /// Emit a debug event for every recovery the parser performs
    pub log_recovery_details: bool,
}

impl Default for ParserPreferences {
    fn default() -> Self {
        Self {
            record_skipped_regions: env_flag(env_vars::PARSER_RECORD_SKIPPED_REGIONS, true),
            log_recovery_details: env_flag(env_vars::PARSER_LOG_RECOVERY_DETAILS, false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProcessorPreferences {
    /// Extensions recognised as C/AL object exports (lowercase, no dot)
    pub allowed_extensions: Vec<String>,

    /// Decode non-UTF-8 exports byte-per-char instead of rejecting them
    pub lossy_decoding: bool,
}

impl Default for FileProcessorPreferences {
    fn default() -> Self {
        let allowed_extensions = env::var(env_vars::FILE_EXTENSIONS)
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
                    .filter(|ext| !ext.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|exts| !exts.is_empty())
            .unwrap_or_else(|| vec!["txt".to_string(), "cal".to_string()]);

        Self {
            allowed_extensions,
            lossy_decoding: env_flag(env_vars::FILE_LOSSY_DECODING, true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingPreferences {
    /// Whether to use structured JSON logging
    pub use_structured_logging: bool,

    /// Whether to enable console output
    pub enable_console_logging: bool,

    /// Preferred minimum log level
    pub min_log_level: LogLevel,

    /// Whether to include file context in log messages
    pub include_file_context: bool,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            use_structured_logging: env_flag(env_vars::LOGGING_USE_STRUCTURED, false),
            enable_console_logging: env_flag(env_vars::LOGGING_ENABLE_CONSOLE, true),
            min_log_level: env::var(env_vars::LOGGING_MIN_LEVEL)
                .ok()
                .and_then(|v| parse_log_level(&v))
                .unwrap_or(LogLevel::Warning),
            include_file_context: env_flag(env_vars::LOGGING_INCLUDE_FILE_CONTEXT, true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    /// Convert to events::LogLevel
    pub fn to_events_log_level(&self) -> crate::logging::events::LogLevel {
        match self {
            LogLevel::Error => crate::logging::events::LogLevel::Error,
            LogLevel::Warning => crate::logging::events::LogLevel::Warning,
            LogLevel::Info => crate::logging::events::LogLevel::Info,
            LogLevel::Debug => crate::logging::events::LogLevel::Debug,
        }
    }
}

/// Parse log level from string (used for environment variables)
pub fn parse_log_level(level: &str) -> Option<LogLevel> {
    match level.to_lowercase().as_str() {
        "error" | "0" => Some(LogLevel::Error),
        "warning" | "warn" | "1" => Some(LogLevel::Warning),
        "info" | "2" => Some(LogLevel::Info),
        "debug" | "3" => Some(LogLevel::Debug),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub parser: ParserPreferences,
    pub file_processor: FileProcessorPreferences,
    pub logging: LoggingPreferences,
}

impl RuntimeConfig {
    /// Load preferences from TOML text; missing tables fall back to defaults
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load preferences from a TOML file
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        Self::from_toml_str(&text).map_err(|e| format!("Invalid TOML in {}: {}", path.display(), e))
    }
}

/// Environment variable names for configuration
pub mod env_vars {
    // Parser
    pub const PARSER_RECORD_SKIPPED_REGIONS: &str = "CAL_PARSER_RECORD_SKIPPED_REGIONS";
    pub const PARSER_LOG_RECOVERY_DETAILS: &str = "CAL_PARSER_LOG_RECOVERY_DETAILS";

    // File processor
    pub const FILE_EXTENSIONS: &str = "CAL_FILE_EXTENSIONS";
    pub const FILE_LOSSY_DECODING: &str = "CAL_FILE_LOSSY_DECODING";

    // Logging
    pub const LOGGING_USE_STRUCTURED: &str = "CAL_LOGGING_USE_STRUCTURED";
    pub const LOGGING_ENABLE_CONSOLE: &str = "CAL_LOGGING_ENABLE_CONSOLE";
    pub const LOGGING_MIN_LEVEL: &str = "CAL_LOGGING_MIN_LEVEL";
    pub const LOGGING_INCLUDE_FILE_CONTEXT: &str = "CAL_LOGGING_INCLUDE_FILE_CONTEXT";
}
