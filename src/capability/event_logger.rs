use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::any::Any;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use crate::lifecycle::{Entry, EntryContext};
use crate::types::Result;

pub const EVENT_LOGGER_ENTRY_TYPE: &str = "EventLoggerEntry";
pub const DEFAULT_EVENT_LOGGER_NAME: &str = "eventLoggerDefault";
pub const DEFAULT_MAX_HISTORY: usize = 64;
const DEFAULT_EVENT_LOGGER_DESCRIPTION: &str = "Internal event logger entry.";

/// A scoped unit of work: opened by [`EventHelper::start`], closed by
/// [`EventHelper::finish`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace_id: Option<String>,
    start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_ms: Option<i64>,
    pairs: BTreeMap<String, String>,
}

impl Event {
    fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            entry_name: None,
            entry_type: None,
            trace_id: None,
            start_time: Utc::now(),
            end_time: None,
            elapsed_ms: None,
            pairs: BTreeMap::new(),
        }
    }

    pub fn add_pair(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.insert(key.into(), value.into());
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn entry_name(&self) -> Option<&str> {
        self.entry_name.as_deref()
    }

    pub fn entry_type(&self) -> Option<&str> {
        self.entry_type.as_deref()
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    pub fn pair(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }
}

pub type EventOption = Box<dyn FnOnce(&mut Event) + Send>;

pub fn with_entry_name(name: impl Into<String>) -> EventOption {
    let name = name.into();
    Box::new(move |event| event.entry_name = Some(name))
}

pub fn with_entry_type(entry_type: impl Into<String>) -> EventOption {
    let entry_type = entry_type.into();
    Box::new(move |event| event.entry_type = Some(entry_type))
}

pub fn with_trace_id(trace_id: impl Into<String>) -> EventOption {
    let trace_id = trace_id.into();
    Box::new(move |event| event.trace_id = Some(trace_id))
}

#[derive(Debug)]
pub struct EventHelper {
    logger_name: String,
    max_history: usize,
    history: Mutex<VecDeque<Event>>,
}

impl EventHelper {
    fn new(logger_name: String, max_history: usize) -> Self {
        Self {
            logger_name,
            max_history,
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn start(&self, operation: &str, options: Vec<EventOption>) -> Event {
        let mut event = Event::new(operation);
        for option in options {
            option(&mut event);
        }
        event
    }

    pub fn finish(&self, mut event: Event) {
        let end = Utc::now();
        event.elapsed_ms = Some((end - event.start_time).num_milliseconds());
        event.end_time = Some(end);

        let pairs = event
            .pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",");
        tracing::info!(
            logger = %self.logger_name,
            operation = %event.operation,
            entry_name = event.entry_name.as_deref().unwrap_or(""),
            entry_type = event.entry_type.as_deref().unwrap_or(""),
            trace_id = event.trace_id.as_deref().unwrap_or(""),
            elapsed_ms = event.elapsed_ms.unwrap_or_default(),
            %pairs,
            "Event finished"
        );

        if self.max_history == 0 {
            return;
        }
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.push_back(event);
        while history.len() > self.max_history {
            history.pop_front();
        }
    }

    /// Finished events, oldest first.
    pub fn recent_events(&self) -> Vec<Event> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

#[derive(Debug)]
pub struct EventLoggerEntry {
    name: String,
    description: String,
    helper: EventHelper,
}

impl EventLoggerEntry {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            helper: EventHelper::new(name.clone(), DEFAULT_MAX_HISTORY),
            name,
            description: DEFAULT_EVENT_LOGGER_DESCRIPTION.to_string(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        if !description.is_empty() {
            self.description = description;
        }
        self
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.helper.max_history = max_history;
        self
    }

    pub fn event_helper(&self) -> &EventHelper {
        &self.helper
    }
}

#[async_trait]
impl Entry for EventLoggerEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn entry_type(&self) -> &str {
        EVENT_LOGGER_ENTRY_TYPE
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "entryName": self.name,
            "entryType": EVENT_LOGGER_ENTRY_TYPE,
            "entryDescription": self.description,
            "maxHistory": self.helper.max_history,
        }))
    }

    async fn bootstrap(&self, _ctx: &EntryContext) {}

    async fn interrupt(&self, _ctx: &EntryContext) {}

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_applies_options_in_order() {
        let logger = EventLoggerEntry::new("events");
        let event = logger.event_helper().start(
            "bootstrap",
            vec![
                with_entry_name("a"),
                with_entry_type("myEntry"),
                with_entry_name("b"),
            ],
        );
        assert_eq!(event.operation(), "bootstrap");
        assert_eq!(event.entry_name(), Some("b"));
        assert_eq!(event.entry_type(), Some("myEntry"));
        assert!(event.trace_id().is_none());
        assert!(!event.is_finished());
    }

    #[test]
    fn test_finish_records_history() {
        let logger = EventLoggerEntry::new("events");
        let helper = logger.event_helper();
        let mut event = helper.start("bootstrap", vec![with_trace_id("t-1")]);
        event.add_pair("key", "abc123");
        helper.finish(event);

        let recent = helper.recent_events();
        assert_eq!(recent.len(), 1);
        assert!(recent[0].is_finished());
        assert_eq!(recent[0].pair("key"), Some("abc123"));
        assert_eq!(recent[0].trace_id(), Some("t-1"));
    }

    #[test]
    fn test_history_is_bounded() {
        let logger = EventLoggerEntry::new("events").with_max_history(2);
        let helper = logger.event_helper();
        for op in ["one", "two", "three"] {
            let event = helper.start(op, Vec::new());
            helper.finish(event);
        }
        let ops: Vec<String> = helper
            .recent_events()
            .iter()
            .map(|e| e.operation().to_string())
            .collect();
        assert_eq!(ops, vec!["two", "three"]);
    }

    #[test]
    fn test_zero_history_keeps_nothing() {
        let logger = EventLoggerEntry::new("events").with_max_history(0);
        let helper = logger.event_helper();
        helper.finish(helper.start("op", Vec::new()));
        assert!(helper.recent_events().is_empty());
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let logger = EventLoggerEntry::new("events");
        let helper = logger.event_helper();
        let event = helper.start("bootstrap", vec![with_entry_name("my-entry")]);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["entryName"], "my-entry");
        assert!(value.get("endTime").is_none());
    }
}
