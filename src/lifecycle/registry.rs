use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::Entry;
use crate::capability::event_logger::DEFAULT_EVENT_LOGGER_NAME;
use crate::capability::zap_logger::DEFAULT_ZAP_LOGGER_NAME;
use crate::capability::{CapabilityKind, EventLoggerEntry, ZapLoggerEntry};
use crate::types::{AppError, Result};

pub type EntryMap = HashMap<String, Arc<dyn Entry>>;

/// Extension point: decodes one boot document into zero or more entries.
pub type EntryRegFn = fn(&AppContext, &Path) -> Result<EntryMap>;

static GLOBAL_APP_CTX: OnceLock<Arc<AppContext>> = OnceLock::new();

// Registry writes are plain upserts, so a poisoned lock still holds a usable map.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Name-indexed table of entries and the capabilities they reference.
pub struct AppContext {
    entries: RwLock<HashMap<String, Arc<dyn Entry>>>,
    zap_loggers: RwLock<HashMap<String, Arc<ZapLoggerEntry>>>,
    event_loggers: RwLock<HashMap<String, Arc<EventLoggerEntry>>>,
    zap_logger_default: Arc<ZapLoggerEntry>,
    event_logger_default: Arc<EventLoggerEntry>,
    reg_fns: RwLock<Vec<EntryRegFn>>,
}

impl AppContext {
    pub fn new() -> Self {
        let zap_logger_default = Arc::new(ZapLoggerEntry::new(DEFAULT_ZAP_LOGGER_NAME));
        let event_logger_default = Arc::new(EventLoggerEntry::new(DEFAULT_EVENT_LOGGER_NAME));

        let zap_loggers = HashMap::from([(
            DEFAULT_ZAP_LOGGER_NAME.to_string(),
            zap_logger_default.clone(),
        )]);
        let event_loggers = HashMap::from([(
            DEFAULT_EVENT_LOGGER_NAME.to_string(),
            event_logger_default.clone(),
        )]);

        Self {
            entries: RwLock::new(HashMap::new()),
            zap_loggers: RwLock::new(zap_loggers),
            event_loggers: RwLock::new(event_loggers),
            zap_logger_default,
            event_logger_default,
            reg_fns: RwLock::new(Vec::new()),
        }
    }

    /// The process-wide context, created on first use.
    pub fn global() -> Arc<AppContext> {
        GLOBAL_APP_CTX
            .get_or_init(|| Arc::new(AppContext::new()))
            .clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Entries
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace the entry stored under its name.
    pub fn add_entry(&self, entry: Arc<dyn Entry>) {
        let name = entry.name().to_string();
        tracing::info!(name = %name, entry_type = entry.entry_type(), "Registering entry");

        if let Some(previous) = write(&self.entries).insert(name.clone(), entry) {
            tracing::warn!(
                name = %name,
                replaced_type = previous.entry_type(),
                "Entry name already registered, replacing"
            );
        }
    }

    pub fn get_entry(&self, name: &str) -> Option<Arc<dyn Entry>> {
        read(&self.entries).get(name).cloned()
    }

    /// Look up an entry and downcast it to its concrete kind.
    pub fn get_entry_as<T: Entry>(&self, name: &str) -> Result<Arc<T>> {
        let entry = self
            .get_entry(name)
            .ok_or_else(|| AppError::EntryNotFound(name.to_string()))?;
        let actual = entry.entry_type().to_string();

        entry
            .as_any()
            .downcast::<T>()
            .map_err(|_| AppError::EntryTypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
                actual,
            })
    }

    pub fn remove_entry(&self, name: &str) -> Option<Arc<dyn Entry>> {
        write(&self.entries).remove(name)
    }

    /// All entries, sorted by name.
    pub fn list_entries(&self) -> Vec<Arc<dyn Entry>> {
        let mut entries: Vec<_> = read(&self.entries).values().cloned().collect();
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        entries
    }

    pub fn count(&self) -> usize {
        read(&self.entries).len()
    }

    /// Serialized view of every entry, keyed by name.
    pub fn snapshot(&self) -> Result<serde_json::Value> {
        let mut map = serde_json::Map::new();
        for entry in self.list_entries() {
            map.insert(entry.name().to_string(), entry.to_value()?);
        }
        Ok(serde_json::Value::Object(map))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Capabilities
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a declared zap logger as a capability and as an entry, so it
    /// shows up in lookups and snapshots. The built-in default is capability-only.
    pub fn add_zap_logger(&self, logger: Arc<ZapLoggerEntry>) {
        tracing::info!(name = logger.name(), "Registering zap logger");
        write(&self.zap_loggers).insert(logger.name().to_string(), logger.clone());
        self.add_entry(logger);
    }

    /// Same split as [`add_zap_logger`](Self::add_zap_logger).
    pub fn add_event_logger(&self, logger: Arc<EventLoggerEntry>) {
        tracing::info!(name = logger.name(), "Registering event logger");
        write(&self.event_loggers).insert(logger.name().to_string(), logger.clone());
        self.add_entry(logger);
    }

    pub fn get_zap_logger(&self, name: &str) -> Option<Arc<ZapLoggerEntry>> {
        read(&self.zap_loggers).get(name).cloned()
    }

    pub fn get_event_logger(&self, name: &str) -> Option<Arc<EventLoggerEntry>> {
        read(&self.event_loggers).get(name).cloned()
    }

    pub fn zap_logger_default(&self) -> Arc<ZapLoggerEntry> {
        self.zap_logger_default.clone()
    }

    pub fn event_logger_default(&self) -> Arc<EventLoggerEntry> {
        self.event_logger_default.clone()
    }

    /// Resolve a zap logger reference. Empty or unknown names fall back to the default.
    pub fn zap_logger_or_default(&self, reference: &str) -> Arc<ZapLoggerEntry> {
        if reference.is_empty() {
            return self.zap_logger_default();
        }
        self.get_zap_logger(reference).unwrap_or_else(|| {
            tracing::debug!(reference, "Zap logger not found, using default");
            self.zap_logger_default()
        })
    }

    /// Resolve an event logger reference. Empty or unknown names fall back to the default.
    pub fn event_logger_or_default(&self, reference: &str) -> Arc<EventLoggerEntry> {
        if reference.is_empty() {
            return self.event_logger_default();
        }
        self.get_event_logger(reference).unwrap_or_else(|| {
            tracing::debug!(reference, "Event logger not found, using default");
            self.event_logger_default()
        })
    }

    pub fn get_default_of_kind(&self, kind: CapabilityKind) -> Arc<dyn Entry> {
        match kind {
            CapabilityKind::ZapLogger => self.zap_logger_default() as Arc<dyn Entry>,
            CapabilityKind::EventLogger => self.event_logger_default() as Arc<dyn Entry>,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration functions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn register_entry_reg_fn(&self, reg_fn: EntryRegFn) {
        write(&self.reg_fns).push(reg_fn);
    }

    /// Registration functions in the order they were appended.
    pub fn entry_reg_fns(&self) -> Vec<EntryRegFn> {
        read(&self.reg_fns).clone()
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}
