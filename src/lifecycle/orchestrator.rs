use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use super::{AppContext, Entry, EntryContext, EntryMap, EntryState};
use crate::types::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootPhase {
    Idle,
    Registering,
    Bootstrapping,
    Running,
    Interrupting,
    Stopped,
}

struct Tracked {
    entry: Arc<dyn Entry>,
    state: EntryState,
}

#[derive(Default)]
struct Inner {
    tracked: HashMap<String, Tracked>,
    registration_order: Vec<String>,
    bootstrap_order: Vec<String>,
}

impl Inner {
    fn track(&mut self, entry: Arc<dyn Entry>) {
        let name = entry.name().to_string();
        let previous = self.tracked.insert(
            name.clone(),
            Tracked {
                entry,
                state: EntryState::Registered,
            },
        );
        if previous.is_some() {
            self.registration_order.retain(|n| n != &name);
            self.bootstrap_order.retain(|n| n != &name);
        }
        self.registration_order.push(name);
    }
}

/// Drives entries from registration through bootstrap to interrupt.
///
/// Each entry moves `Registered → Bootstrapped → Interrupted` at most once.
/// Repeated bootstrap or interrupt calls are skipped.
pub struct BootCoordinator {
    ctx: Arc<AppContext>,
    inner: Mutex<Inner>,
    phase_tx: watch::Sender<BootPhase>,
    phase_rx: watch::Receiver<BootPhase>,
}

impl BootCoordinator {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let (phase_tx, phase_rx) = watch::channel(BootPhase::Idle);
        Self {
            ctx,
            inner: Mutex::new(Inner::default()),
            phase_tx,
            phase_rx,
        }
    }

    pub fn phase_receiver(&self) -> watch::Receiver<BootPhase> {
        self.phase_rx.clone()
    }

    /// Run every registration function against `config_path`, in the order they
    /// were appended. The first failure aborts the pass.
    pub async fn register_all(&self, config_path: &Path) -> Result<EntryMap> {
        let _ = self.phase_tx.send(BootPhase::Registering);
        tracing::info!(path = %config_path.display(), "Registering entries from config");

        let mut all = EntryMap::new();
        for reg_fn in self.ctx.entry_reg_fns() {
            let entries = reg_fn(self.ctx.as_ref(), config_path)?;
            for (name, entry) in entries {
                if let Some(previous) = all.insert(name.clone(), entry) {
                    tracing::warn!(
                        name = %name,
                        replaced_type = previous.entry_type(),
                        "Entry name returned by more than one registration, replacing"
                    );
                }
            }
        }

        let mut inner = self.inner.lock().await;
        for entry in all.values() {
            inner.track(entry.clone());
        }
        tracing::info!(count = all.len(), "Entries registered");

        Ok(all)
    }

    /// Track an entry constructed in code rather than from config.
    pub async fn track(&self, entry: Arc<dyn Entry>) {
        self.inner.lock().await.track(entry);
    }

    pub async fn state(&self, name: &str) -> Option<EntryState> {
        self.inner.lock().await.tracked.get(name).map(|t| t.state)
    }

    pub async fn bootstrap(&self, name: &str, ectx: &EntryContext) -> Result<()> {
        let entry = {
            let mut inner = self.inner.lock().await;
            if !inner.tracked.contains_key(name) {
                let entry = self
                    .ctx
                    .get_entry(name)
                    .ok_or_else(|| AppError::EntryNotFound(name.to_string()))?;
                inner.track(entry);
            }

            let Some(tracked) = inner.tracked.get_mut(name) else {
                return Err(AppError::EntryNotFound(name.to_string()));
            };
            if tracked.state != EntryState::Registered {
                tracing::warn!(name, state = %tracked.state, "Entry already bootstrapped, skipping");
                return Ok(());
            }
            tracked.state = EntryState::Bootstrapped;
            let entry = tracked.entry.clone();
            inner.bootstrap_order.push(name.to_string());
            entry
        };

        tracing::info!(name, entry_type = entry.entry_type(), "Bootstrapping entry");
        entry.bootstrap(ectx).await;
        Ok(())
    }

    /// Bootstrap every tracked entry still in `Registered`, in registration order.
    pub async fn bootstrap_all(&self, ectx: &EntryContext) -> Result<Vec<String>> {
        let _ = self.phase_tx.send(BootPhase::Bootstrapping);

        let pending: Vec<String> = {
            let inner = self.inner.lock().await;
            inner
                .registration_order
                .iter()
                .filter(|n| {
                    inner
                        .tracked
                        .get(n.as_str())
                        .is_some_and(|t| t.state == EntryState::Registered)
                })
                .cloned()
                .collect()
        };

        for name in &pending {
            self.bootstrap(name, ectx).await?;
        }

        let _ = self.phase_tx.send(BootPhase::Running);
        tracing::info!(count = pending.len(), "Bootstrap complete");
        Ok(pending)
    }

    /// Interrupt one entry. Entries that were never bootstrapped, or were already
    /// interrupted, are left alone.
    pub async fn interrupt(&self, name: &str, ectx: &EntryContext) -> Result<()> {
        let entry = {
            let mut inner = self.inner.lock().await;
            let Some(tracked) = inner.tracked.get_mut(name) else {
                return Err(AppError::EntryNotFound(name.to_string()));
            };
            if tracked.state != EntryState::Bootstrapped {
                tracing::debug!(name, state = %tracked.state, "Entry not running, skipping interrupt");
                return Ok(());
            }
            tracked.state = EntryState::Interrupted;
            tracked.entry.clone()
        };

        tracing::info!(name, "Interrupting entry");
        entry.interrupt(ectx).await;
        Ok(())
    }

    /// Interrupt every bootstrapped entry, most recently bootstrapped first.
    pub async fn interrupt_all(&self, ectx: &EntryContext) -> Vec<String> {
        let _ = self.phase_tx.send(BootPhase::Interrupting);
        tracing::info!("Interrupting entries");

        let order: Vec<String> = self.inner.lock().await.bootstrap_order.clone();
        let mut interrupted = Vec::new();

        for name in order.iter().rev() {
            if self.state(name).await != Some(EntryState::Bootstrapped) {
                continue;
            }
            match self.interrupt(name, ectx).await {
                Ok(()) => interrupted.push(name.clone()),
                Err(e) => tracing::warn!(name = %name, "Interrupt failed: {}", e),
            }
        }

        let _ = self.phase_tx.send(BootPhase::Stopped);
        tracing::info!(count = interrupted.len(), "All entries interrupted");
        interrupted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::my_entry::{register_my_entry, with_key, with_name, MyEntry};
    use crate::test_utils::TestContext;
    use async_trait::async_trait;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Counting {
        name: String,
        bootstraps: AtomicUsize,
        interrupts: AtomicUsize,
        log: Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl Counting {
        fn new(name: &str, log: Arc<std::sync::Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                bootstraps: AtomicUsize::new(0),
                interrupts: AtomicUsize::new(0),
                log,
            })
        }
    }

    #[async_trait]
    impl Entry for Counting {
        fn name(&self) -> &str {
            &self.name
        }

        fn entry_type(&self) -> &str {
            "counting"
        }

        fn description(&self) -> &str {
            "counts lifecycle calls"
        }

        fn to_value(&self) -> Result<serde_json::Value> {
            Ok(serde_json::json!({ "entryName": self.name }))
        }

        async fn bootstrap(&self, _ctx: &EntryContext) {
            self.bootstraps.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(format!("bootstrap:{}", self.name));
        }

        async fn interrupt(&self, _ctx: &EntryContext) {
            self.interrupts.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(format!("interrupt:{}", self.name));
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    #[tokio::test]
    async fn test_register_all_runs_config_bridges() {
        let tc = TestContext::new(
            r#"
eventLogger:
  - name: app-event
myEntry:
  enabled: true
  name: my-entry
  key: abc
  logger:
    eventLogger:
      ref: app-event
"#,
        );
        let coordinator = BootCoordinator::new(tc.ctx.clone());

        let all = coordinator.register_all(tc.boot_file.path()).await.unwrap();
        assert!(all.contains_key("app-event"));
        assert!(all.contains_key("my-entry"));
        assert_eq!(
            coordinator.state("my-entry").await,
            Some(EntryState::Registered)
        );

        let entry = tc.ctx.get_entry_as::<MyEntry>("my-entry").unwrap();
        assert_eq!(entry.event_logger_entry().name(), "app-event");
    }

    #[tokio::test]
    async fn test_register_all_tracks_what_the_registry_holds() {
        let tc = TestContext::new(
            r#"
zapLogger:
  - name: app-zap
eventLogger:
  - name: shared
myEntry:
  enabled: true
  name: shared
"#,
        );
        let coordinator = BootCoordinator::new(tc.ctx.clone());

        let all = coordinator.register_all(tc.boot_file.path()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(tc.ctx.get_entry("app-zap").is_some());
        assert_eq!(
            coordinator.state("app-zap").await,
            Some(EntryState::Registered)
        );

        // The component bridge runs last, so it owns the shared name in both places.
        let tracked = all.get("shared").unwrap();
        assert!(tc.ctx.get_entry_as::<MyEntry>("shared").is_ok());
        assert!(Arc::ptr_eq(tracked, &tc.ctx.get_entry("shared").unwrap()));
        // The capability table still resolves the logger by that name.
        assert_eq!(tc.ctx.event_logger_or_default("shared").name(), "shared");
        assert_eq!(tc.ctx.count(), 2);
    }

    #[tokio::test]
    async fn test_register_all_propagates_decode_failure() {
        let tc = TestContext::new("myEntry:\n  enabled: [oops]\n");
        let coordinator = BootCoordinator::new(tc.ctx.clone());

        let err = coordinator.register_all(tc.boot_file.path()).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert_eq!(tc.ctx.count(), 0);
    }

    #[tokio::test]
    async fn test_bootstrap_runs_once() {
        let ctx = Arc::new(AppContext::new());
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let entry = Counting::new("c", log);
        ctx.add_entry(entry.clone());

        let coordinator = BootCoordinator::new(ctx);
        let ectx = EntryContext::new();
        coordinator.bootstrap("c", &ectx).await.unwrap();
        coordinator.bootstrap("c", &ectx).await.unwrap();

        assert_eq!(entry.bootstraps.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.state("c").await, Some(EntryState::Bootstrapped));
    }

    #[tokio::test]
    async fn test_bootstrap_unknown_name_is_error() {
        let coordinator = BootCoordinator::new(Arc::new(AppContext::new()));
        let err = coordinator
            .bootstrap("ghost", &EntryContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EntryNotFound(_)));
    }

    #[tokio::test]
    async fn test_interrupt_reverse_bootstrap_order() {
        let ctx = Arc::new(AppContext::new());
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let coordinator = BootCoordinator::new(ctx);
        let first = Counting::new("first", log.clone());
        let second = Counting::new("second", log.clone());
        coordinator.track(first.clone()).await;
        coordinator.track(second.clone()).await;

        let ectx = EntryContext::new();
        let booted = coordinator.bootstrap_all(&ectx).await.unwrap();
        assert_eq!(booted, vec!["first", "second"]);
        assert_eq!(*coordinator.phase_receiver().borrow(), BootPhase::Running);

        let interrupted = coordinator.interrupt_all(&ectx).await;
        assert_eq!(interrupted, vec!["second", "first"]);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "bootstrap:first",
                "bootstrap:second",
                "interrupt:second",
                "interrupt:first"
            ]
        );
        assert_eq!(coordinator.state("first").await, Some(EntryState::Interrupted));
        assert_eq!(*coordinator.phase_receiver().borrow(), BootPhase::Stopped);

        // Second pass has nothing left to interrupt.
        assert!(coordinator.interrupt_all(&ectx).await.is_empty());
        assert_eq!(first.interrupts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_interrupt_before_bootstrap_is_noop() {
        let coordinator = BootCoordinator::new(Arc::new(AppContext::new()));
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let entry = Counting::new("idle", log);
        coordinator.track(entry.clone()).await;

        coordinator.interrupt("idle", &EntryContext::new()).await.unwrap();
        assert_eq!(entry.interrupts.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.state("idle").await, Some(EntryState::Registered));
    }

    #[tokio::test]
    async fn test_bootstrap_code_built_entry_records_event() {
        let ctx = Arc::new(AppContext::new());
        let entry = register_my_entry(&ctx, vec![with_name("coded"), with_key("k")]);
        let coordinator = BootCoordinator::new(ctx.clone());

        coordinator
            .bootstrap("coded", &EntryContext::new().with_trace_id("trace-7"))
            .await
            .unwrap();

        let events = entry.event_logger_entry().event_helper().recent_events();
        let last = events.last().unwrap();
        assert_eq!(last.operation(), "bootstrap");
        assert_eq!(last.entry_name(), Some("coded"));
        assert_eq!(last.trace_id(), Some("trace-7"));
    }
}
