use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

use crate::types::Result;

/// Correlation data threaded through lifecycle calls. Not inspected for cancellation.
#[derive(Debug, Clone, Default)]
pub struct EntryContext {
    pub trace_id: Option<String>,
}

impl EntryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Registered,
    Bootstrapped,
    Interrupted,
}

impl std::fmt::Display for EntryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Registered => write!(f, "registered"),
            Self::Bootstrapped => write!(f, "bootstrapped"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// A named, typed unit registered in an [`AppContext`](super::AppContext) and
/// driven through bootstrap and interrupt by the orchestrator.
#[async_trait]
pub trait Entry: std::fmt::Debug + Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Stable tag for the kind of entry. Fixed by the constructor.
    fn entry_type(&self) -> &str;

    fn description(&self) -> &str;

    /// Shallow snapshot for display. Referenced capabilities appear by name only.
    fn to_value(&self) -> Result<serde_json::Value>;

    /// Snapshots cannot be read back into an entry. This performs no mutation and
    /// always succeeds.
    fn from_value(&self, _value: &serde_json::Value) -> Result<()> {
        Ok(())
    }

    async fn bootstrap(&self, ctx: &EntryContext);

    async fn interrupt(&self, ctx: &EntryContext);

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}
