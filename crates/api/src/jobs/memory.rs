//! Stub bus honouring idempotency keys, for tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use common::protocol::DispatchAccepted;

use super::{
    event::DispatchedEvent, manifest::Manifest, DispatchError, FunctionRegistry, JobBus,
    RegistrationOutcome,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubMode {
    Accept,
    Reject(u16),
    Unreachable,
}

#[derive(Debug, Default)]
struct StubState {
    /// Idempotency key → id assigned on first acceptance.
    keys: HashMap<String, String>,
    accepted: Vec<DispatchedEvent>,
    registered: HashSet<String>,
    next_id: u64,
}

/// In-process bus: dedups by idempotency key, then runs every function
/// triggered by each new event before acknowledging.
pub struct StubBus {
    mode: StubMode,
    registry: Option<Arc<FunctionRegistry>>,
    state: Mutex<StubState>,
}

impl StubBus {
    pub fn new(mode: StubMode) -> Self {
        Self {
            mode,
            registry: None,
            state: Mutex::new(StubState::default()),
        }
    }

    pub fn accepting() -> Self {
        Self::new(StubMode::Accept)
    }

    pub fn with_registry(mut self, registry: Arc<FunctionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Events accepted for execution (duplicates excluded).
    pub fn accepted(&self) -> Vec<DispatchedEvent> {
        self.state.lock().unwrap().accepted.clone()
    }

    pub fn registered_urls(&self) -> HashSet<String> {
        self.state.lock().unwrap().registered.clone()
    }

    fn fail(&self) -> Option<DispatchError> {
        match self.mode {
            StubMode::Accept => None,
            StubMode::Reject(status) => Some(DispatchError::Rejected {
                status,
                body: "rejected by stub bus".into(),
            }),
            StubMode::Unreachable => Some(DispatchError::Unreachable("connection refused".into())),
        }
    }
}

#[async_trait]
impl JobBus for StubBus {
    async fn submit_batch(
        &self,
        events: &[DispatchedEvent],
    ) -> Result<DispatchAccepted, DispatchError> {
        if let Some(err) = self.fail() {
            return Err(err);
        }

        let mut ids = Vec::with_capacity(events.len());
        let mut fresh = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            for event in events {
                if let Some(existing) = event.id.as_ref().and_then(|k| state.keys.get(k)) {
                    ids.push(existing.clone());
                    continue;
                }
                state.next_id += 1;
                let id = format!("stub-{}", state.next_id);
                if let Some(key) = &event.id {
                    state.keys.insert(key.clone(), id.clone());
                }
                state.accepted.push(event.clone());
                ids.push(id);
                fresh.push(event.clone());
            }
        }

        if let Some(registry) = &self.registry {
            for event in &fresh {
                for function in registry.triggered_by(&event.name) {
                    // Execution failures are the bus's to retry, not the submitter's.
                    let _ = registry.deliver(function.id(), event).await;
                }
            }
        }

        Ok(DispatchAccepted { ids })
    }

    async fn register(&self, manifest: &Manifest) -> Result<RegistrationOutcome, DispatchError> {
        if let Some(err) = self.fail() {
            return Err(err);
        }
        let modified = self.state.lock().unwrap().registered.insert(manifest.url.clone());
        Ok(RegistrationOutcome { modified })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{JobError, JobFunction};
    use crate::store::{memory::InMemoryStore, Store};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl JobFunction for Counting {
        fn id(&self) -> &'static str {
            "count"
        }
        fn name(&self) -> &'static str {
            "Count"
        }
        fn trigger(&self) -> &'static str {
            "chat/message.sent"
        }
        async fn run(&self, _: &DispatchedEvent, _: &dyn Store) -> Result<Value, JobError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        }
    }

    fn counting_bus() -> (StubBus, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let registry = FunctionRegistry::new("app", Arc::new(InMemoryStore::new()))
            .register(Counting(runs.clone()));
        (StubBus::accepting().with_registry(Arc::new(registry)), runs)
    }

    fn message_event(key: Option<&str>) -> DispatchedEvent {
        let e = DispatchedEvent::new("chat/message.sent", json!({"message_id": "m"})).unwrap();
        match key {
            Some(k) => e.with_idempotency_key(k),
            None => e,
        }
    }

    #[tokio::test]
    async fn same_key_executes_once() {
        let (bus, runs) = counting_bus();
        let first = bus.submit(&message_event(Some("k1"))).await.unwrap();
        let second = bus.submit(&message_event(Some("k1"))).await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(first.ids, second.ids);
        assert_eq!(bus.accepted().len(), 1);
    }

    #[tokio::test]
    async fn distinct_keys_execute_separately() {
        let (bus, runs) = counting_bus();
        bus.submit(&message_event(Some("k1"))).await.unwrap();
        bus.submit(&message_event(Some("k2"))).await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unkeyed_events_are_never_deduplicated() {
        let (bus, runs) = counting_bus();
        bus.submit(&message_event(None)).await.unwrap();
        bus.submit(&message_event(None)).await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failing_modes_surface_errors() {
        let err = StubBus::new(StubMode::Reject(400))
            .submit(&message_event(None))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Rejected { status: 400, .. }));

        let err = StubBus::new(StubMode::Unreachable)
            .submit(&message_event(None))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Unreachable(_)));
    }
}
