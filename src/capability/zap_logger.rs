use async_trait::async_trait;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::lifecycle::{Entry, EntryContext};
use crate::types::Result;

pub const ZAP_LOGGER_ENTRY_TYPE: &str = "ZapLoggerEntry";
pub const DEFAULT_ZAP_LOGGER_NAME: &str = "zapLoggerDefault";
const DEFAULT_ZAP_LOGGER_DESCRIPTION: &str = "Internal zap logger entry.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Named structured logger. Records are emitted through `tracing` and carry the
/// logger name plus the static fields configured for it.
#[derive(Debug)]
pub struct ZapLoggerEntry {
    name: String,
    description: String,
    level: LogLevel,
    fields: BTreeMap<String, String>,
}

impl ZapLoggerEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: DEFAULT_ZAP_LOGGER_DESCRIPTION.to_string(),
            level: LogLevel::default(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        if !description.is_empty() {
            self.description = description;
        }
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level
    }

    fn rendered_fields(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if !self.enabled(level) {
            return;
        }
        let fields = self.rendered_fields();
        match level {
            LogLevel::Debug => tracing::debug!(logger = %self.name, %fields, "{}", message),
            LogLevel::Info => tracing::info!(logger = %self.name, %fields, "{}", message),
            LogLevel::Warn => tracing::warn!(logger = %self.name, %fields, "{}", message),
            LogLevel::Error => tracing::error!(logger = %self.name, %fields, "{}", message),
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

#[async_trait]
impl Entry for ZapLoggerEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn entry_type(&self) -> &str {
        ZAP_LOGGER_ENTRY_TYPE
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "entryName": self.name,
            "entryType": ZAP_LOGGER_ENTRY_TYPE,
            "entryDescription": self.description,
            "level": self.level.to_string(),
            "fields": self.fields,
        }))
    }

    async fn bootstrap(&self, _ctx: &EntryContext) {
        self.debug("Zap logger ready");
    }

    async fn interrupt(&self, _ctx: &EntryContext) {}

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
