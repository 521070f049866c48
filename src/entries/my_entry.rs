use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::path::Path;
use std::sync::Arc;

use crate::capability::event_logger::{with_entry_name, with_entry_type, with_trace_id};
use crate::capability::{CapabilityRef, EventLoggerEntry, ZapLoggerEntry};
use crate::config::load_boot_config;
use crate::lifecycle::{AppContext, Entry, EntryContext, EntryMap};
use crate::types::Result;

pub const MY_ENTRY_TYPE: &str = "myEntry";
pub const DEFAULT_ENTRY_NAME: &str = "default";
/// Substituted when an option explicitly set the name to an empty string.
pub const FALLBACK_ENTRY_NAME: &str = "my-default";
pub const DEFAULT_DESCRIPTION: &str =
    "Please contact maintainers to add description of this entry.";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BootConfig {
    #[serde(rename = "myEntry")]
    pub my_entry: MyEntryConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MyEntryConfig {
    /// Quoted `"yes"`/`"on"`/`"true"` also enable the section (see `load_boot_config`).
    pub enabled: bool,
    pub name: String,
    pub description: String,
    pub key: String,
    pub logger: LoggerRefs,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggerRefs {
    #[serde(rename = "zapLogger")]
    pub zap_logger: CapabilityRef,
    #[serde(rename = "eventLogger")]
    pub event_logger: CapabilityRef,
}

pub type MyEntryOption = Box<dyn FnOnce(&mut MyEntry) + Send>;

pub fn with_name(name: impl Into<String>) -> MyEntryOption {
    let name = name.into();
    Box::new(move |entry| entry.entry_name = name)
}

pub fn with_description(description: impl Into<String>) -> MyEntryOption {
    let description = description.into();
    Box::new(move |entry| entry.entry_description = description)
}

pub fn with_key(key: impl Into<String>) -> MyEntryOption {
    let key = key.into();
    Box::new(move |entry| entry.key = key)
}

/// `None` keeps whatever logger the entry already holds.
pub fn with_zap_logger_entry(logger: Option<Arc<ZapLoggerEntry>>) -> MyEntryOption {
    Box::new(move |entry| {
        if let Some(logger) = logger {
            entry.zap_logger_entry = logger;
        }
    })
}

/// `None` keeps whatever logger the entry already holds.
pub fn with_event_logger_entry(logger: Option<Arc<EventLoggerEntry>>) -> MyEntryOption {
    Box::new(move |entry| {
        if let Some(logger) = logger {
            entry.event_logger_entry = logger;
        }
    })
}

#[derive(Debug)]
pub struct MyEntry {
    entry_name: String,
    entry_type: &'static str,
    entry_description: String,
    key: String,
    zap_logger_entry: Arc<ZapLoggerEntry>,
    event_logger_entry: Arc<EventLoggerEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MyEntrySnapshot<'a> {
    entry_name: &'a str,
    entry_type: &'a str,
    entry_description: &'a str,
    event_logger_entry: &'a str,
    zap_logger_entry: &'a str,
    key: &'a str,
}

impl MyEntry {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn zap_logger_entry(&self) -> &Arc<ZapLoggerEntry> {
        &self.zap_logger_entry
    }

    pub fn event_logger_entry(&self) -> &Arc<EventLoggerEntry> {
        &self.event_logger_entry
    }

    fn snapshot(&self) -> MyEntrySnapshot<'_> {
        MyEntrySnapshot {
            entry_name: &self.entry_name,
            entry_type: self.entry_type,
            entry_description: &self.entry_description,
            event_logger_entry: self.event_logger_entry.name(),
            zap_logger_entry: self.zap_logger_entry.name(),
            key: &self.key,
        }
    }
}

impl std::fmt::Display for MyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(&self.snapshot()).map_err(|_| std::fmt::Error)?;
        f.write_str(&json)
    }
}

/// Build a [`MyEntry`] from built-in defaults and `options` (applied in order,
/// last write wins), then register it in `ctx` under its final name.
pub fn register_my_entry(ctx: &AppContext, options: Vec<MyEntryOption>) -> Arc<MyEntry> {
    let mut entry = MyEntry {
        entry_name: DEFAULT_ENTRY_NAME.to_string(),
        entry_type: MY_ENTRY_TYPE,
        entry_description: DEFAULT_DESCRIPTION.to_string(),
        key: String::new(),
        zap_logger_entry: ctx.zap_logger_default(),
        event_logger_entry: ctx.event_logger_default(),
    };

    for option in options {
        option(&mut entry);
    }

    if entry.entry_name.is_empty() {
        entry.entry_name = FALLBACK_ENTRY_NAME.to_string();
    }
    if entry.entry_description.is_empty() {
        entry.entry_description = DEFAULT_DESCRIPTION.to_string();
    }

    let entry = Arc::new(entry);
    ctx.add_entry(entry.clone());
    entry
}

/// Registration function for the `myEntry` section of a boot document.
/// A disabled (or absent) section contributes nothing.
pub fn register_my_entries_from_config(ctx: &AppContext, config_path: &Path) -> Result<EntryMap> {
    let mut res = EntryMap::new();

    let config: BootConfig = load_boot_config(config_path)?;
    let section = config.my_entry;

    if !section.enabled {
        tracing::debug!(path = %config_path.display(), "myEntry disabled, skipping");
        return Ok(res);
    }

    let zap_logger_entry = ctx.zap_logger_or_default(&section.logger.zap_logger.reference);
    let event_logger_entry = ctx.event_logger_or_default(&section.logger.event_logger.reference);

    let entry = register_my_entry(
        ctx,
        vec![
            with_name(section.name),
            with_description(section.description),
            with_key(section.key),
            with_zap_logger_entry(Some(zap_logger_entry)),
            with_event_logger_entry(Some(event_logger_entry)),
        ],
    );
    res.insert(entry.name().to_string(), entry);

    Ok(res)
}

#[async_trait]
impl Entry for MyEntry {
    fn name(&self) -> &str {
        &self.entry_name
    }

    fn entry_type(&self) -> &str {
        self.entry_type
    }

    fn description(&self) -> &str {
        &self.entry_description
    }

    fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.snapshot())?)
    }

    async fn bootstrap(&self, ctx: &EntryContext) {
        let helper = self.event_logger_entry.event_helper();

        let mut options = vec![
            with_entry_name(self.entry_name.as_str()),
            with_entry_type(self.entry_type),
        ];
        if let Some(trace_id) = &ctx.trace_id {
            options.push(with_trace_id(trace_id.as_str()));
        }

        let mut event = helper.start("bootstrap", options);
        event.add_pair("key", self.key.as_str());
        helper.finish(event);
    }

    async fn interrupt(&self, _ctx: &EntryContext) {}

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
