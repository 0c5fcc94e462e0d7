//! Listener registry for contract events delivered through the SSE stream.
use std::{
    collections::HashMap,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use futures::{Stream, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::{
    events::{ContractEvent, DeployInfo, EventKind, RawEvent, TypedEvent, WithDeployInfo},
    sse::event::{DeployProcessed, ExecutionOutcome, SseEvent},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no listener was ever registered for event `{0}`")]
    UnknownEvent(EventKind),
    #[error("no execution result parser is configured")]
    MissingParser,
}

/// Why [`EventDispatcher::setup_event_stream`] stopped.
#[derive(Debug, Error)]
pub enum EventStreamError<E> {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("event stream failed: {0}")]
    Stream(#[source] E),
}

/// Extracts contract events from a successful execution result.
pub trait ExecutionResultParser: Send + Sync {
    /// `result` is the body of a `Success` execution result. Entries that could not be parsed
    /// are returned as errors and skipped by the dispatcher.
    fn parse(&self, result: &Value) -> Vec<Result<RawEvent, String>>;
}

pub type Listener = Arc<dyn Fn(&WithDeployInfo<ContractEvent>) + Send + Sync>;

/// Handle returned on registration, used to remove the listener again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Registry = HashMap<EventKind, Vec<(ListenerId, Listener)>>;

#[derive(Default)]
pub struct EventDispatcher {
    parser: Option<Box<dyn ExecutionResultParser>>,
    listeners: RwLock<Registry>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parser(parser: impl ExecutionResultParser + 'static) -> Self {
        Self {
            parser: Some(Box::new(parser)),
            ..Self::default()
        }
    }

    pub fn has_parser(&self) -> bool {
        self.parser.is_some()
    }

    pub fn on(
        &self,
        kind: EventKind,
        listener: impl Fn(&WithDeployInfo<ContractEvent>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.add_event_listener(kind, Arc::new(listener))
    }

    /// Registers `listener` for `kind`. The same listener may be registered more than once.
    pub fn add_event_listener(&self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write()
            .entry(kind)
            .or_default()
            .push((id, listener));
        trace!(%kind, ?id, "listener registered");
        id
    }

    /// Registers a listener for the payload type `E`.
    pub fn on_event<E, F>(&self, listener: F) -> ListenerId
    where
        E: TypedEvent + 'static,
        F: Fn(&E, &WithDeployInfo<ContractEvent>) + Send + Sync + 'static,
    {
        self.on(E::KIND, move |event| {
            if let Some(payload) = E::from_event(&event.event.event) {
                listener(payload, event);
            }
        })
    }

    pub fn off(&self, kind: EventKind, id: ListenerId) -> Result<(), DispatchError> {
        self.remove_event_listener(kind, id)
    }

    /// Removes a listener. Unknown ids are ignored; a kind nothing was ever registered for is
    /// an error.
    pub fn remove_event_listener(
        &self,
        kind: EventKind,
        id: ListenerId,
    ) -> Result<(), DispatchError> {
        let mut registry = self.write();
        let listeners = registry
            .get_mut(&kind)
            .ok_or(DispatchError::UnknownEvent(kind))?;
        listeners.retain(|(listener_id, _)| *listener_id != id);
        Ok(())
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.read().get(&kind).map_or(0, Vec::len)
    }

    /// Invokes the listeners registered for the event's kind, in registration order.
    pub fn emit(&self, event: &WithDeployInfo<ContractEvent>) {
        let kind = event.event.kind();
        let snapshot: Vec<Listener> = self
            .read()
            .get(&kind)
            .map(|listeners| listeners.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        trace!(%kind, listeners = snapshot.len(), "emitting event");
        for listener in snapshot {
            listener(event);
        }
    }

    /// Typed events contained in an execution result.
    pub fn parse_execution_result(&self, result: &Value) -> Vec<ContractEvent> {
        let Some(parser) = self.parser.as_ref() else {
            return Vec::new();
        };

        parser
            .parse(result)
            .into_iter()
            .filter_map(|parsed| match parsed {
                Ok(raw) => Some(raw),
                Err(err) => {
                    debug!("Skipping unparsable event: {err}");
                    None
                }
            })
            .filter_map(|raw| match ContractEvent::from_raw(&raw) {
                Ok(event) => Some(event),
                Err(err) => {
                    warn!("Dropping event `{}`: {err}", raw.name);
                    None
                }
            })
            .collect()
    }

    /// Decodes a successful deploy and notifies listeners. Failed deploys are skipped without
    /// consulting the parser.
    pub fn handle_deploy_processed(&self, deploy: &DeployProcessed) -> Result<(), DispatchError> {
        let ExecutionOutcome::Success(result) = &deploy.execution_result else {
            debug!(deploy_hash = %deploy.deploy_hash, "Ignoring failed deploy");
            return Ok(());
        };
        if self.parser.is_none() {
            return Err(DispatchError::MissingParser);
        }

        let deploy_info = DeployInfo {
            deploy_hash: deploy.deploy_hash.clone(),
            timestamp: deploy.timestamp.clone(),
        };
        for event in self.parse_execution_result(result) {
            self.emit(&WithDeployInfo {
                event,
                deploy_info: deploy_info.clone(),
            });
        }
        Ok(())
    }

    /// Feeds `stream` through the dispatcher until it ends or yields an error.
    ///
    /// Fails with [`DispatchError::MissingParser`] before polling the stream if no parser is
    /// configured.
    pub async fn setup_event_stream<S, E>(&self, stream: S) -> Result<(), EventStreamError<E>>
    where
        S: Stream<Item = Result<SseEvent, E>>,
    {
        if self.parser.is_none() {
            return Err(DispatchError::MissingParser.into());
        }
        let mut stream = std::pin::pin!(stream);
        while let Some(item) = stream.next().await {
            match item.map_err(EventStreamError::Stream)? {
                SseEvent::DeployProcessed(deploy) => self.handle_deploy_processed(&deploy)?,
                other => trace!("Ignoring {} event", other.name()),
            }
        }
        debug!("Event stream ended");
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Registry> {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Registry> {
        self.listeners.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Listener registration for types that dispatch through an owned [`EventDispatcher`].
pub trait Cep18Events {
    fn event_dispatcher(&self) -> &EventDispatcher;

    fn on(
        &self,
        kind: EventKind,
        listener: impl Fn(&WithDeployInfo<ContractEvent>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.event_dispatcher().on(kind, listener)
    }

    fn add_event_listener(&self, kind: EventKind, listener: Listener) -> ListenerId {
        self.event_dispatcher().add_event_listener(kind, listener)
    }

    fn on_event<E, F>(&self, listener: F) -> ListenerId
    where
        E: TypedEvent + 'static,
        F: Fn(&E, &WithDeployInfo<ContractEvent>) + Send + Sync + 'static,
    {
        self.event_dispatcher().on_event(listener)
    }

    fn off(&self, kind: EventKind, id: ListenerId) -> Result<(), DispatchError> {
        self.event_dispatcher().off(kind, id)
    }

    fn remove_event_listener(&self, kind: EventKind, id: ListenerId) -> Result<(), DispatchError> {
        self.event_dispatcher().remove_event_listener(kind, id)
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("has_parser", &self.has_parser())
            .field("kinds", &self.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use casper_types::{CLValue, Key, U256, account::AccountHash};

    use super::*;
    use crate::events::{Cep18Event, Mint};

    fn mint_event() -> WithDeployInfo<ContractEvent> {
        WithDeployInfo {
            event: ContractEvent {
                contract_hash: format!("hash-{}", "00".repeat(32)),
                contract_package_hash: format!("hash-{}", "11".repeat(32)),
                event: Cep18Event::Mint(Mint {
                    recipient: Key::Account(AccountHash::new([1u8; 32])),
                    amount: U256::from(5u8),
                }),
            },
            deploy_info: DeployInfo {
                deploy_hash: "aa".to_string(),
                timestamp: "2024-01-01T00:00:00.000Z".to_string(),
            },
        }
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let dispatcher = EventDispatcher::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let calls = Arc::clone(&calls);
            dispatcher.on(EventKind::Mint, move |_| calls.lock().unwrap().push(tag));
        }
        dispatcher.emit(&mint_event());
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_duplicate_registration_fires_twice() {
        let dispatcher = EventDispatcher::new();
        let calls = Arc::new(AtomicU64::new(0));
        let listener: Listener = {
            let calls = Arc::clone(&calls);
            Arc::new(move |_: &WithDeployInfo<ContractEvent>| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };
        let first = dispatcher.add_event_listener(EventKind::Mint, Arc::clone(&listener));
        dispatcher.add_event_listener(EventKind::Mint, listener);
        dispatcher.emit(&mint_event());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        dispatcher.off(EventKind::Mint, first).unwrap();
        dispatcher.emit(&mint_event());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_off_unknown_kind_and_id() {
        let dispatcher = EventDispatcher::new();
        let id = dispatcher.on(EventKind::Burn, |_| {});
        assert_eq!(
            dispatcher.off(EventKind::Transfer, id),
            Err(DispatchError::UnknownEvent(EventKind::Transfer))
        );
        dispatcher.off(EventKind::Burn, id).unwrap();
        // Already removed.
        assert_eq!(dispatcher.off(EventKind::Burn, id), Ok(()));
        assert_eq!(dispatcher.listener_count(EventKind::Burn), 0);
    }

    #[test]
    fn test_registration_during_dispatch_applies_next_pass() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let calls = Arc::new(AtomicU64::new(0));
        {
            let inner = Arc::downgrade(&dispatcher);
            let calls = Arc::clone(&calls);
            dispatcher.on(EventKind::Mint, move |_| {
                if let Some(dispatcher) = inner.upgrade() {
                    let calls = Arc::clone(&calls);
                    dispatcher.on(EventKind::Mint, move |_| {
                        calls.fetch_add(1, Ordering::SeqCst);
                    });
                }
            });
        }
        dispatcher.emit(&mint_event());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        dispatcher.emit(&mint_event());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_removal_during_dispatch_applies_next_pass() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let second_calls = Arc::new(AtomicU64::new(0));
        let second_id = Arc::new(Mutex::new(None));
        {
            let inner = Arc::downgrade(&dispatcher);
            let second_id = Arc::clone(&second_id);
            dispatcher.on(EventKind::Mint, move |_| {
                let id = second_id.lock().unwrap().take();
                if let (Some(dispatcher), Some(id)) = (inner.upgrade(), id) {
                    dispatcher.off(EventKind::Mint, id).unwrap();
                }
            });
        }
        {
            let calls = Arc::clone(&second_calls);
            let id = dispatcher.on(EventKind::Mint, move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
            *second_id.lock().unwrap() = Some(id);
        }

        dispatcher.emit(&mint_event());
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.listener_count(EventKind::Mint), 1);
        dispatcher.emit(&mint_event());
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    struct FixedParser(Vec<Result<RawEvent, String>>);

    impl ExecutionResultParser for FixedParser {
        fn parse(&self, _result: &Value) -> Vec<Result<RawEvent, String>> {
            self.0.clone()
        }
    }

    #[test]
    fn test_parse_execution_result_drops_bad_entries() {
        let good = RawEvent {
            name: "Mint".to_string(),
            contract_hash: [2u8; 32],
            contract_package_hash: [3u8; 32],
            fields: [
                (
                    "recipient".to_string(),
                    CLValue::from_t(Key::Account(AccountHash::new([1u8; 32]))).unwrap(),
                ),
                ("amount".to_string(), CLValue::from_t(U256::one()).unwrap()),
            ]
            .into(),
        };
        let unknown = RawEvent {
            name: "ChangeSecurity".to_string(),
            ..good.clone()
        };
        let dispatcher = EventDispatcher::with_parser(FixedParser(vec![
            Err("bad schema".to_string()),
            Ok(unknown),
            Ok(good),
        ]));

        let events = dispatcher.parse_execution_result(&Value::Null);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::Mint);
        assert_eq!(events[0].contract_hash, format!("hash-{}", "02".repeat(32)));
    }

    #[test]
    fn test_no_parser_yields_nothing() {
        assert!(
            EventDispatcher::new()
                .parse_execution_result(&Value::Null)
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_stream_without_parser_is_not_polled() {
        let polled = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&polled);
        let stream = futures::stream::iter([SseEvent::Shutdown]).map(move |event| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::io::Error>(event)
        });

        let result = EventDispatcher::new().setup_event_stream(stream).await;
        assert!(matches!(
            result,
            Err(EventStreamError::Dispatch(DispatchError::MissingParser))
        ));
        assert_eq!(polled.load(Ordering::SeqCst), 0);
    }
}
