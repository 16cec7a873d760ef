use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Logging settings. JSON output in production, pretty console otherwise.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub json: bool,
    pub directory: PathBuf,
}

impl LogConfig {
    /// `LOG_LEVEL` overrides the default of `info` in production and
    /// `debug` elsewhere.
    pub fn from_env(environment: &str) -> Self {
        let is_production = environment == "production";
        let default_level = if is_production {
            LogLevel::Info
        } else {
            LogLevel::Debug
        };

        Self {
            level: std::env::var("LOG_LEVEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default_level),
            json: is_production,
            directory: PathBuf::from("logs"),
        }
    }

    pub fn filter_directive(&self) -> String {
        format!(
            "foundation_backend={},tower_http=debug,axum=debug",
            self.level
        )
    }
}
