//! Global listener table.
//!
//! Listeners are named callbacks apps expose to each other. Keys are
//! `<app>/<name>`; callers address them by the full key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::warn;

use apphost_core::AppFault;

use crate::isolation::contain;

/// A listener callback. Arguments and result are JSON values.
pub type Listener = Arc<dyn Fn(&Value) -> Result<Value, AppFault> + Send + Sync>;

/// Outcome of invoking a listener.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenerCall {
    /// The listener ran and returned a value.
    Completed(Value),
    /// No listener is registered under the key.
    NotFound,
    /// The listener returned an error or panicked.
    Faulted(AppFault),
}

impl ListenerCall {
    /// Whether the listener ran to completion.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// The returned value, if the listener completed.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Default)]
pub(crate) struct ListenerTable {
    listeners: Mutex<HashMap<String, Listener>>,
}

impl ListenerTable {
    /// Insert unless the key is taken.
    pub(crate) fn insert(&self, key: String, listener: Listener) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        if listeners.contains_key(&key) {
            return false;
        }
        listeners.insert(key, listener);
        true
    }

    pub(crate) fn remove(&self, key: &str) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Invoke the listener outside the table lock, so it may itself use the
    /// table.
    pub(crate) fn call(&self, key: &str, args: &Value) -> ListenerCall {
        let Some(listener) = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
        else {
            return ListenerCall::NotFound;
        };

        match contain(|| listener(args)) {
            Ok(value) => ListenerCall::Completed(value),
            Err(fault) => {
                warn!(listener = key, error = %fault, "Listener faulted");
                ListenerCall::Faulted(fault)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn echo() -> Listener {
        Arc::new(|args: &Value| Ok(args.clone()))
    }

    #[test]
    fn insert_refuses_taken_keys() {
        let table = ListenerTable::default();
        assert!(table.insert("a/ping".into(), echo()));
        assert!(!table.insert("a/ping".into(), echo()));
        assert!(table.remove("a/ping"));
        assert!(!table.remove("a/ping"));
    }

    #[test]
    fn missing_listener_is_not_found() {
        let table = ListenerTable::default();
        let call = table.call("missing", &Value::Null);
        assert_eq!(call, ListenerCall::NotFound);
        assert!(!call.is_ok());
    }

    #[test]
    fn completed_call_returns_value() {
        let table = ListenerTable::default();
        table.insert("a/echo".into(), echo());
        let call = table.call("a/echo", &json!([1, 2]));
        assert!(call.is_ok());
        assert_eq!(call.value(), Some(&json!([1, 2])));
    }

    #[test]
    fn panicking_listener_leaves_table_usable() {
        let table = ListenerTable::default();
        table.insert(
            "a/boom".into(),
            Arc::new(|_: &Value| -> Result<Value, AppFault> { panic!("kaboom") }),
        );

        let call = table.call("a/boom", &Value::Null);
        assert_eq!(call, ListenerCall::Faulted(AppFault::new("kaboom")));
        assert!(table.contains("a/boom"));
        assert!(table.insert("a/echo".into(), echo()));
    }

    #[test]
    fn listener_may_reenter_the_table() {
        let table = Arc::new(ListenerTable::default());
        let inner = Arc::clone(&table);
        table.insert(
            "a/outer".into(),
            Arc::new(move |_: &Value| Ok(Value::Bool(inner.contains("a/outer")))),
        );
        assert_eq!(table.call("a/outer", &Value::Null).value(), Some(&json!(true)));
    }
}
