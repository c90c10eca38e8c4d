use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::debug;

use crate::error::Result;
use crate::protocol::{Envelope, WILDCARD};

pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<String, Vec<(u64, Handler)>>,
}

/// Handler table keyed by message type.
///
/// Handlers are cloned out of the table before they run, so a handler may
/// register or unsubscribe others without deadlocking.
#[derive(Clone, Default)]
pub struct Dispatcher {
    registry: Arc<Mutex<Registry>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, event_type: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let mut registry = self.lock();
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .handlers
            .entry(event_type.to_string())
            .or_default()
            .push((id, Arc::new(handler)));

        Subscription {
            registry: Arc::downgrade(&self.registry),
            event_type: event_type.to_string(),
            id,
        }
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.lock()
            .handlers
            .get(event_type)
            .map_or(0, |handlers| handlers.len())
    }

    /// Parses and dispatches one text frame, returning the dispatched type.
    /// Malformed frames reach no handler.
    pub fn dispatch_text(&self, text: &str) -> Result<String> {
        let envelope = Envelope::parse(text)?;
        let message_type = envelope.message_type.clone();
        self.dispatch(envelope);
        Ok(message_type)
    }

    /// Wildcard handlers get the full message first, then type handlers get
    /// the payload without `type`.
    pub fn dispatch(&self, envelope: Envelope) {
        debug!(message_type = %envelope.message_type, "dispatching frame");
        for handler in self.handlers_for(WILDCARD) {
            handler(&envelope.message);
        }
        for handler in self.handlers_for(&envelope.message_type) {
            handler(&envelope.payload);
        }
    }

    /// Delivers a locally raised event to its type handlers only.
    pub fn notify(&self, event_type: &str, payload: &Value) {
        for handler in self.handlers_for(event_type) {
            handler(payload);
        }
    }

    fn handlers_for(&self, event_type: &str) -> Vec<Handler> {
        self.lock()
            .handlers
            .get(event_type)
            .map(|handlers| handlers.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes exactly the handler it was returned for.
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    event_type: String,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handlers) = registry.handlers.get_mut(&self.event_type) {
            handlers.retain(|(id, _)| *id != self.id);
            if handlers.is_empty() {
                registry.handlers.remove(&self.event_type);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorder(dispatcher: &Dispatcher, event_type: &str) -> (Arc<Mutex<Vec<Value>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = dispatcher.on(event_type, move |value| {
            sink.lock().unwrap().push(value.clone());
        });
        (seen, subscription)
    }

    #[test]
    fn wildcard_sees_full_message_and_type_handler_sees_payload() {
        let dispatcher = Dispatcher::new();
        let (all, _all_sub) = recorder(&dispatcher, WILDCARD);
        let (updates, _update_sub) = recorder(&dispatcher, "simulation_update");

        let dispatched = dispatcher.dispatch_text(r#"{"type":"simulation_update","rakes":[1]}"#);

        assert_eq!(dispatched.unwrap(), "simulation_update");
        assert_eq!(
            *all.lock().unwrap(),
            vec![json!({"type": "simulation_update", "rakes": [1]})]
        );
        assert_eq!(*updates.lock().unwrap(), vec![json!({"rakes": [1]})]);
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let dispatcher = Dispatcher::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for label in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            dispatcher.on("pong", move |_| order.lock().unwrap().push(label));
        }

        dispatcher.dispatch_text(r#"{"type":"pong"}"#).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unsubscribe_removes_only_that_handler() {
        let dispatcher = Dispatcher::new();
        let (kept, _kept_sub) = recorder(&dispatcher, "pong");
        let (dropped, dropped_sub) = recorder(&dispatcher, "pong");

        dropped_sub.unsubscribe();
        dispatcher.dispatch_text(r#"{"type":"pong"}"#).unwrap();

        assert_eq!(kept.lock().unwrap().len(), 1);
        assert!(dropped.lock().unwrap().is_empty());
        assert_eq!(dispatcher.handler_count("pong"), 1);
    }

    #[test]
    fn malformed_frames_are_dropped() {
        let dispatcher = Dispatcher::new();
        let (all, _sub) = recorder(&dispatcher, WILDCARD);

        assert!(dispatcher.dispatch_text("{oops").is_err());
        assert!(dispatcher.dispatch_text(r#"{"no_type":true}"#).is_err());
        assert!(all.lock().unwrap().is_empty());
    }

    #[test]
    fn notify_skips_wildcard_handlers() {
        let dispatcher = Dispatcher::new();
        let (all, _all_sub) = recorder(&dispatcher, WILDCARD);
        let (errors, _err_sub) = recorder(&dispatcher, "error");

        dispatcher.notify("error", &json!({"message": "boom"}));

        assert!(all.lock().unwrap().is_empty());
        assert_eq!(*errors.lock().unwrap(), vec![json!({"message": "boom"})]);
    }

    #[test]
    fn handler_may_unsubscribe_during_dispatch() {
        let dispatcher = Dispatcher::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(Mutex::new(0));

        let inner_slot = Arc::clone(&slot);
        let inner_calls = Arc::clone(&calls);
        let subscription = dispatcher.on("pong", move |_| {
            *inner_calls.lock().unwrap() += 1;
            if let Some(sub) = inner_slot.lock().unwrap().take() {
                sub.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(subscription);

        dispatcher.dispatch_text(r#"{"type":"pong"}"#).unwrap();
        dispatcher.dispatch_text(r#"{"type":"pong"}"#).unwrap();
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
