//! Capabilities: externally owned services (loggers) that entries reference by name.
//!
//! Loggers declared at the top level of the boot document are registered by
//! [`register_internal_entries_from_config`]; references that name nothing, or a
//! logger that was never declared, resolve to the process-wide defaults held by
//! [`AppContext`].

pub mod event_logger;
pub mod zap_logger;

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::load_boot_config;
use crate::lifecycle::{AppContext, Entry, EntryMap};
use crate::types::{AppError, Result};

pub use event_logger::{Event, EventHelper, EventLoggerEntry, EventOption};
pub use zap_logger::{LogLevel, ZapLoggerEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    ZapLogger,
    EventLogger,
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZapLogger => write!(f, "zapLogger"),
            Self::EventLogger => write!(f, "eventLogger"),
        }
    }
}

/// `{ ref: string }` as written in the boot document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CapabilityRef {
    #[serde(rename = "ref")]
    pub reference: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ZapLoggerConfig {
    pub name: String,
    pub description: String,
    pub level: String,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventLoggerConfig {
    pub name: String,
    pub description: String,
    #[serde(rename = "maxHistory")]
    pub max_history: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InternalBootConfig {
    #[serde(rename = "zapLogger")]
    pub zap_logger: Vec<ZapLoggerConfig>,
    #[serde(rename = "eventLogger")]
    pub event_logger: Vec<EventLoggerConfig>,
}

/// Register the loggers declared in the boot document.
pub fn register_internal_entries_from_config(
    ctx: &AppContext,
    config_path: &Path,
) -> Result<EntryMap> {
    let mut res = EntryMap::new();
    let config: InternalBootConfig = load_boot_config(config_path)?;

    for section in config.zap_logger {
        if section.name.is_empty() {
            tracing::warn!("Skipping zap logger without a name");
            continue;
        }
        let level: LogLevel = section
            .level
            .parse()
            .map_err(|e: String| AppError::Config(format!("zapLogger {}: {}", section.name, e)))?;
        let mut logger = ZapLoggerEntry::new(section.name)
            .with_description(section.description)
            .with_level(level);
        for (key, value) in section.fields {
            logger = logger.with_field(key, value);
        }
        let logger = Arc::new(logger);
        ctx.add_zap_logger(logger.clone());
        res.insert(logger.name().to_string(), logger);
    }

    for section in config.event_logger {
        if section.name.is_empty() {
            tracing::warn!("Skipping event logger without a name");
            continue;
        }
        let mut logger =
            EventLoggerEntry::new(section.name).with_description(section.description);
        if let Some(max_history) = section.max_history {
            logger = logger.with_max_history(max_history);
        }
        let logger = Arc::new(logger);
        ctx.add_event_logger(logger.clone());
        res.insert(logger.name().to_string(), logger);
    }

    Ok(res)
}

/// Append the capability bridge to the context's registration functions.
pub fn install(ctx: &AppContext) {
    ctx.register_entry_reg_fn(register_internal_entries_from_config);
}
